//! ORM model definitions as a schema source
//!
//! Model modules are declarative descriptor files. They are loaded into an
//! explicit [`ModelCatalog`] and extracted into an ORM-vocabulary snapshot
//! whose column types are the ORM type class names.

pub mod catalog;
pub mod descriptor;
pub mod extract;

pub use catalog::{MappedClass, ModelCatalog, ModelError};
pub use descriptor::{ColumnDescriptor, ModelDescriptor, ModelModule};
pub use extract::{discover_modules, extract_models, snapshot_from_catalog, Extraction, ExtractionWarning};
