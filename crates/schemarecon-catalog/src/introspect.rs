//! Live schema introspection
//!
//! Walks every base table of one schema namespace through a
//! [`CatalogAdapter`] and assembles a native-vocabulary [`Snapshot`].

use crate::adapter::{CatalogAdapter, FetchError, TableIdentifier};
use schemarecon_core::{Snapshot, TableShape, Vocabulary};

/// Which tables to introspect
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TableSelection {
    /// Every base table in the namespace
    #[default]
    All,

    /// Only the named tables, in the given order
    Only(Vec<String>),
}

impl TableSelection {
    /// `All` for an empty list
    pub fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            Self::All
        } else {
            Self::Only(names)
        }
    }
}

/// Builds snapshots from a live catalog
pub struct Introspector<'a> {
    adapter: &'a dyn CatalogAdapter,
    schema: String,
}

impl<'a> Introspector<'a> {
    pub fn new(adapter: &'a dyn CatalogAdapter, schema: impl Into<String>) -> Self {
        Self {
            adapter,
            schema: schema.into(),
        }
    }

    /// Introspect the selected tables
    ///
    /// Connectivity failures abort with an error. Any other failure reading
    /// a single table replaces that table's shape with a failure marker and
    /// the run continues.
    pub async fn introspect(&self, selection: &TableSelection) -> Result<Snapshot, FetchError> {
        self.adapter.test_connection().await?;

        let names = match selection {
            TableSelection::All => self.adapter.list_tables(&self.schema).await?,
            TableSelection::Only(names) => names.clone(),
        };

        tracing::info!(
            adapter = self.adapter.name(),
            schema = %self.schema,
            tables = names.len(),
            "introspecting catalog"
        );

        let mut snapshot = Snapshot::new(Vocabulary::Native);

        for name in names {
            let id = TableIdentifier::new(&self.schema, &name);
            let shape = match self.adapter.fetch_table(&id).await {
                Ok(shape) => {
                    tracing::debug!(table = %id, columns = shape.columns.len(), "introspected table");
                    shape
                }
                Err(e) if e.is_connectivity() => return Err(e),
                Err(e) => {
                    tracing::warn!(table = %id, error = %e, "table introspection failed");
                    TableShape::failed(format!("Failed to introspect table: {}", e))
                }
            };
            snapshot = snapshot.with_table(name, shape);
        }

        Ok(snapshot)
    }
}

/// Introspect a catalog namespace in one call
pub async fn introspect(
    adapter: &dyn CatalogAdapter,
    schema: &str,
    selection: &TableSelection,
) -> Result<Snapshot, FetchError> {
    Introspector::new(adapter, schema).introspect(selection).await
}
