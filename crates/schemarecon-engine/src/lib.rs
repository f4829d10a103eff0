//! SchemaRecon engine
//!
//! This crate implements the reconciliation logic:
//! - Snapshot comparison
//! - Severity categorization
//! - Report artifacts and the markdown summary
//! - The reports directory

pub mod categorize;
pub mod compare;
pub mod report;
pub mod store;

pub use categorize::{categorize, Categories};
pub use compare::{compare, Comparison};
pub use report::{
    from_json, markdown_summary, table_summary, to_json, ArtifactMetadata, ComparisonArtifact, IntrospectionArtifact,
    ReportError, SourceRef, Summary, GENERATOR,
};
pub use store::{ArtifactKind, ArtifactStore, StoreError};
