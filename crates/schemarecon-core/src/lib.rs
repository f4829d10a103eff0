//! SchemaRecon Core
//!
//! Shared domain model for schema reconciliation: snapshots of a database's
//! shape, the canonical type system, discrepancies and their fixed severity
//! policy, and configuration.

pub mod config;
pub mod discrepancy;
pub mod snapshot;
pub mod types;

pub use config::{Config, ConfigError, DatabaseConfig, FilterRules, ModelsConfig, TypesConfig};
pub use discrepancy::{Discrepancy, DiscrepancyKind, DiscrepancySet, Severity, SourceLabels};
pub use snapshot::{
    ColumnShape, ForeignKey, IndexShape, IntegrityIssue, Snapshot, TableShape, UniqueConstraint, ViewSnapshot,
};
pub use types::{normalize, CanonicalType, Normalizer, Vocabulary};
