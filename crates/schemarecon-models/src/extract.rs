//! Model schema extraction
//!
//! Loads model modules into a [`ModelCatalog`] and walks every registered
//! class (including ones loaded earlier) into an ORM-vocabulary snapshot.

use crate::catalog::ModelCatalog;
use schemarecon_core::{ColumnShape, ForeignKey, Snapshot, TableShape, Vocabulary};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A module that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWarning {
    pub module: PathBuf,
    pub message: String,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.module.display(), self.message)
    }
}

/// Result of an extraction run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub snapshot: Snapshot,
    pub warnings: Vec<ExtractionWarning>,
}

/// Find model modules under `roots`
///
/// A root that is a file is taken as a module as-is. Directories are walked
/// for files named `<prefix>*.toml` or `<prefix>*.json`. Results are sorted.
pub fn discover_modules(roots: &[PathBuf], prefix: &str) -> Vec<PathBuf> {
    let mut modules = Vec::new();

    for root in roots {
        if root.is_file() {
            modules.push(root.clone());
            continue;
        }

        if !root.exists() {
            tracing::warn!(path = %root.display(), "model path does not exist");
            continue;
        }

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable model path");
                    continue;
                }
            };

            if entry.file_type().is_file() && is_module_file(entry.path(), prefix) {
                modules.push(entry.into_path());
            }
        }
    }

    modules.sort();
    modules.dedup();
    modules
}

fn is_module_file(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    name.starts_with(prefix) && (name.ends_with(".toml") || name.ends_with(".json"))
}

/// Load `modules` into `catalog` and extract every mapped class
///
/// Modules that fail to load produce a warning and extraction continues with
/// whatever classes are registered.
pub fn extract_models(catalog: &mut ModelCatalog, modules: &[PathBuf]) -> Extraction {
    let mut warnings = Vec::new();

    for module in modules {
        match catalog.load_module(module) {
            Ok(count) => {
                tracing::debug!(module = %module.display(), classes = count, "loaded model module");
            }
            Err(e) => {
                tracing::warn!(module = %module.display(), error = %e, "failed to load model module");
                warnings.push(ExtractionWarning {
                    module: module.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    Extraction {
        snapshot: snapshot_from_catalog(catalog),
        warnings,
    }
}

/// Build the ORM-vocabulary snapshot of every class with a table mapping
pub fn snapshot_from_catalog(catalog: &ModelCatalog) -> Snapshot {
    let mut snapshot = Snapshot::new(Vocabulary::Orm);

    for mapped in catalog.classes() {
        let descriptor = &mapped.descriptor;
        let Some(table) = &descriptor.table else {
            tracing::debug!(class = %descriptor.class, "skipping class without table mapping");
            continue;
        };

        let mut shape = TableShape::new().with_model_class(&descriptor.class);

        for column in &descriptor.columns {
            let mut shape_column =
                ColumnShape::new(&column.name, &column.type_name, column.is_nullable());
            if let Some(length) = column.length_or_precision() {
                shape_column = shape_column.with_length(length);
            }
            shape = shape.with_column(shape_column);

            if let Some((referenced_table, referenced_column)) = column.foreign_key_target() {
                shape = shape.with_foreign_key(ForeignKey::new(
                    &column.name,
                    referenced_table,
                    referenced_column,
                ));
            }
        }

        let primary_key: Vec<&str> = descriptor
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        shape = shape.with_primary_key(primary_key);

        snapshot = snapshot.with_table(table, shape);
    }

    snapshot
}
