//! In-memory catalog adapter for testing
//!
//! Serves canned [`TableShape`]s keyed by `schema.table`, with optional
//! per-table errors, a simulated connection failure and simulated latency.
//!
//! ```rust,ignore
//! let catalog = MockCatalogBuilder::new()
//!     .with_table("public", "media", TableShape::new().with_column(...))
//!     .with_error("public", "secrets", FetchError::PermissionDenied("secrets".into()))
//!     .build();
//! ```

use crate::adapter::{CatalogAdapter, FetchError, TableIdentifier};
use schemarecon_core::TableShape;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock catalog adapter
#[derive(Clone)]
pub struct MockCatalog {
    tables: Arc<RwLock<BTreeMap<String, TableShape>>>,
    errors: Arc<RwLock<HashMap<String, FetchError>>>,
    fail_connection: bool,
    latency_ms: u64,
    database: Option<String>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(BTreeMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            fail_connection: false,
            latency_ms: 0,
            database: None,
        }
    }

    pub async fn add_table(&self, table: TableIdentifier, shape: TableShape) {
        self.tables.write().await.insert(table.fqn(), shape);
    }

    /// Register a table whose reads fail with `error`
    ///
    /// The table still shows up in `list_tables`.
    pub async fn add_error_for_table(&self, table: TableIdentifier, error: FetchError) {
        self.errors.write().await.insert(table.fqn(), error);
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    async fn check_connection(&self) -> Result<(), FetchError> {
        self.simulate_latency().await;

        if self.fail_connection {
            Err(FetchError::Connection("Simulated connection failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CatalogAdapter for MockCatalog {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn test_connection(&self) -> Result<(), FetchError> {
        self.check_connection().await
    }

    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, FetchError> {
        self.check_connection().await?;

        let prefix = format!("{}.", schema);
        let tables = self.tables.read().await;
        let errors = self.errors.read().await;

        let mut names: Vec<String> = tables
            .keys()
            .chain(errors.keys())
            .filter_map(|fqn| fqn.strip_prefix(&prefix))
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();

        Ok(names)
    }

    async fn fetch_table(&self, table: &TableIdentifier) -> Result<TableShape, FetchError> {
        self.check_connection().await?;

        if let Some(error) = self.errors.read().await.get(&table.fqn()) {
            return Err(error.clone());
        }

        self.tables
            .read()
            .await
            .get(&table.fqn())
            .cloned()
            .ok_or_else(|| FetchError::TableNotFound(table.fqn()))
    }
}

/// Builder for [`MockCatalog`]
#[derive(Default)]
pub struct MockCatalogBuilder {
    tables: BTreeMap<String, TableShape>,
    errors: HashMap<String, FetchError>,
    fail_connection: bool,
    latency_ms: u64,
    database: Option<String>,
}

impl MockCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, table: &str, shape: TableShape) -> Self {
        self.tables.insert(TableIdentifier::new(schema, table).fqn(), shape);
        self
    }

    pub fn with_error(mut self, schema: &str, table: &str, error: FetchError) -> Self {
        self.errors.insert(TableIdentifier::new(schema, table).fqn(), error);
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn build(self) -> MockCatalog {
        MockCatalog {
            tables: Arc::new(RwLock::new(self.tables)),
            errors: Arc::new(RwLock::new(self.errors)),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            database: self.database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemarecon_core::ColumnShape;

    fn media() -> TableShape {
        TableShape::new()
            .with_column(ColumnShape::new("id", "integer", false))
            .with_primary_key(["id"])
    }

    #[tokio::test]
    async fn test_mock_fetch() {
        let catalog = MockCatalog::new();
        catalog.add_table(TableIdentifier::new("public", "media"), media()).await;

        let shape = catalog
            .fetch_table(&TableIdentifier::new("public", "media"))
            .await
            .unwrap();
        assert_eq!(shape, media());
        assert_eq!(catalog.table_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_table_not_found() {
        let catalog = MockCatalog::new();
        let result = catalog.fetch_table(&TableIdentifier::new("public", "missing")).await;
        assert!(matches!(result, Err(FetchError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_tables_is_scoped_and_sorted() {
        let catalog = MockCatalogBuilder::new()
            .with_table("public", "users", media())
            .with_table("public", "media", media())
            .with_table("audit", "events", media())
            .with_error("public", "secrets", FetchError::PermissionDenied("secrets".into()))
            .build();

        let names = catalog.list_tables("public").await.unwrap();
        assert_eq!(names, vec!["media", "secrets", "users"]);
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let catalog = MockCatalog::new().with_connection_failure();
        assert!(matches!(
            catalog.test_connection().await,
            Err(FetchError::Connection(_))
        ));
        assert!(catalog.list_tables("public").await.is_err());
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let catalog = MockCatalog::new();
        let clone = catalog.clone();
        clone.add_table(TableIdentifier::new("public", "media"), media()).await;
        assert_eq!(catalog.table_count().await, 1);
    }
}
