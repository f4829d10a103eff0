//! Explicit model registry
//!
//! The [`ModelCatalog`] is built once and passed to the extractor. Modules
//! are keyed by canonical path, so loading a module twice is a no-op, and a
//! module either registers all of its classes or none of them.

use crate::descriptor::{split_target, ModelDescriptor, ModelModule};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Errors that can occur while loading model modules
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read {}: {message}", .module.display())]
    Io { module: PathBuf, message: String },

    #[error("Failed to parse {}: {message}", .module.display())]
    Parse { module: PathBuf, message: String },

    #[error("Unsupported model module format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("{class}.{column}: invalid foreign key target '{target}' (expected table.column)")]
    InvalidForeignKey {
        class: String,
        column: String,
        target: String,
    },

    #[error("Table '{table}' of class {class} is already mapped by class {existing}")]
    DuplicateTable {
        table: String,
        class: String,
        existing: String,
    },
}

/// A class registered from a module
#[derive(Debug, Clone, PartialEq)]
pub struct MappedClass {
    /// Canonical path of the defining module
    pub module: PathBuf,
    pub descriptor: ModelDescriptor,
}

/// Registry of every mapped class loaded in this process
#[derive(Debug, Default)]
pub struct ModelCatalog {
    modules: BTreeSet<PathBuf>,
    classes: Vec<MappedClass>,
    tables: BTreeMap<String, String>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a module file
    ///
    /// Returns the number of classes registered; 0 when the module was
    /// already loaded.
    pub fn load_module(&mut self, path: &Path) -> Result<usize, ModelError> {
        let module_id = path.canonicalize().map_err(|e| ModelError::Io {
            module: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if self.modules.contains(&module_id) {
            tracing::debug!(module = %module_id.display(), "model module already loaded");
            return Ok(0);
        }

        let contents = std::fs::read_to_string(&module_id).map_err(|e| ModelError::Io {
            module: module_id.clone(),
            message: e.to_string(),
        })?;
        let module = ModelModule::parse(&module_id, &contents)?;

        self.register(module_id, module)
    }

    /// Register an already parsed module under `module_id`
    pub fn register(
        &mut self,
        module_id: impl Into<PathBuf>,
        module: ModelModule,
    ) -> Result<usize, ModelError> {
        let module_id = module_id.into();
        if self.modules.contains(&module_id) {
            return Ok(0);
        }

        self.validate(&module)?;

        for descriptor in &module.models {
            if let Some(table) = &descriptor.table {
                self.tables.insert(table.clone(), descriptor.class.clone());
            }
        }

        let count = module.models.len();
        self.classes.extend(module.models.into_iter().map(|descriptor| MappedClass {
            module: module_id.clone(),
            descriptor,
        }));
        tracing::debug!(module = %module_id.display(), classes = count, "registered model module");
        self.modules.insert(module_id);

        Ok(count)
    }

    fn validate(&self, module: &ModelModule) -> Result<(), ModelError> {
        let mut pending: BTreeMap<&str, &str> = BTreeMap::new();

        for descriptor in &module.models {
            for column in &descriptor.columns {
                if let Some(target) = &column.foreign_key {
                    if split_target(target).is_none() {
                        return Err(ModelError::InvalidForeignKey {
                            class: descriptor.class.clone(),
                            column: column.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }

            let Some(table) = descriptor.table.as_deref() else {
                continue;
            };

            let existing = self
                .tables
                .get(table)
                .map(String::as_str)
                .or_else(|| pending.get(table).copied());
            if let Some(existing) = existing {
                return Err(ModelError::DuplicateTable {
                    table: table.to_string(),
                    class: descriptor.class.clone(),
                    existing: existing.to_string(),
                });
            }
            pending.insert(table, &descriptor.class);
        }

        Ok(())
    }

    pub fn is_loaded(&self, module_id: &Path) -> bool {
        self.modules.contains(module_id)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Every registered class, in registration order
    pub fn classes(&self) -> impl Iterator<Item = &MappedClass> {
        self.classes.iter()
    }

    /// Class mapped to `table`
    pub fn class_for_table(&self, table: &str) -> Option<&str> {
        self.tables.get(table).map(String::as_str)
    }
}
