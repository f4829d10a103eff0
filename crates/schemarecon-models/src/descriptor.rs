//! Model descriptor modules
//!
//! A module is a TOML or JSON file listing mapped classes:
//!
//! ```toml
//! [[model]]
//! class = "Episode"
//! table = "episodes"
//!
//! [[model.columns]]
//! name = "media_id"
//! type = "Integer"
//! primary_key = true
//! foreign_key = "media.id"
//!
//! [[model.columns]]
//! name = "title"
//! type = "String"
//! length = 255
//! ```
//!
//! Column types are ORM type class names (`String`, `Integer`, `DateTime`),
//! never database spellings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::ModelError;

/// Contents of one model module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelModule {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelDescriptor>,
}

/// A mapped class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Class name
    pub class: String,

    /// Mapped table; abstract classes and mixins have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,
}

/// A mapped column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,

    /// ORM type class name
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// Defaults to `!primary_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub primary_key: bool,

    /// Referenced column as `table.column`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl ColumnDescriptor {
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(!self.primary_key)
    }

    /// Declared length, or precision with optional scale
    pub fn length_or_precision(&self) -> Option<String> {
        match (self.length, self.precision, self.scale) {
            (Some(length), _, _) => Some(length.to_string()),
            (None, Some(p), Some(s)) => Some(format!("{},{}", p, s)),
            (None, Some(p), None) => Some(p.to_string()),
            _ => None,
        }
    }

    /// Split the foreign key target into `(table, column)`
    pub fn foreign_key_target(&self) -> Option<(&str, &str)> {
        self.foreign_key.as_deref().and_then(split_target)
    }
}

/// Split `table.column` at the last dot
pub fn split_target(target: &str) -> Option<(&str, &str)> {
    let (table, column) = target.trim().rsplit_once('.')?;
    if table.is_empty() || column.is_empty() {
        None
    } else {
        Some((table, column))
    }
}

impl ModelModule {
    /// Parse a module, choosing the format by file extension
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ModelError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => toml::from_str(contents).map_err(|e| ModelError::Parse {
                module: path.to_path_buf(),
                message: e.to_string(),
            }),
            Some("json") => serde_json::from_str(contents).map_err(|e| ModelError::Parse {
                module: path.to_path_buf(),
                message: e.to_string(),
            }),
            _ => Err(ModelError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}
