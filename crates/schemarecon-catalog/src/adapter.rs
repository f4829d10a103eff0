//! Catalog adapter trait for reading table shapes from a live database

use schemarecon_core::TableShape;
use std::fmt;

/// Identifies a table in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    /// Schema namespace
    pub schema: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Errors that can occur when reading the catalog
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// Whether the catalog as a whole is unreachable
    ///
    /// Connectivity failures abort a run; everything else is local to the
    /// table being read.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Authentication(_) | Self::Config(_))
    }
}

/// Read-only access to a database catalog
#[async_trait::async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Get the adapter name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Name of the connected database, when known
    fn database(&self) -> Option<&str> {
        None
    }

    /// Test the connection to the catalog
    ///
    /// Run before any table is read so an unreachable catalog fails fast.
    async fn test_connection(&self) -> Result<(), FetchError>;

    /// List base tables (not views) in a schema namespace
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>, FetchError>;

    /// Read columns, keys, indexes and unique constraints of one table
    async fn fetch_table(&self, table: &TableIdentifier) -> Result<TableShape, FetchError>;
}
