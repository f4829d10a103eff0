//! Live database catalog introspection
//!
//! Adapters read table shapes from a database catalog; the [`Introspector`]
//! walks one schema namespace and assembles a [`schemarecon_core::Snapshot`]
//! in the native vocabulary.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support via `tokio-postgres`
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemarecon_catalog::{introspect, PostgresAdapter, TableSelection};
//!
//! let adapter = PostgresAdapter::connect(&url, false).await?;
//! let snapshot = introspect(&adapter, "public", &TableSelection::All).await?;
//! ```

pub mod adapter;
pub mod introspect;
pub mod mock;
pub mod postgres;

pub use adapter::{CatalogAdapter, FetchError, TableIdentifier};
pub use introspect::{introspect, Introspector, TableSelection};
pub use mock::{MockCatalog, MockCatalogBuilder};
pub use postgres::{connection_url, PostgresAdapter};
