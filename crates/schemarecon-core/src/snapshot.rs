//! Snapshot types: the shape of a database as seen by one source

use crate::types::{length_or_precision, Vocabulary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A column as reported by one source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnShape {
    /// Column name
    pub name: String,

    /// Raw type token in the owning snapshot's vocabulary
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether NULL is allowed
    pub nullable: bool,

    /// Length or precision argument (`255`, `10,2`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_or_precision: Option<String>,

    /// Default expression (captured, never compared)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Whether the catalog reports the column as auto-incrementing
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub autoincrement: bool,
}

impl ColumnShape {
    /// Create a column; a parenthesized suffix on the type fills in the length
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        let data_type = data_type.into();
        Self {
            name: name.into(),
            length_or_precision: length_or_precision(&data_type),
            data_type,
            nullable,
            default: None,
            autoincrement: false,
        }
    }

    /// Set the length/precision argument
    pub fn with_length(mut self, length: impl Into<String>) -> Self {
        self.length_or_precision = Some(length.into());
        self
    }

    /// Set the default expression
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as auto-incrementing
    pub fn with_autoincrement(mut self, autoincrement: bool) -> Self {
        self.autoincrement = autoincrement;
        self
    }

    /// Type token including its length argument
    ///
    /// ORM snapshots keep the length apart from the class name; this joins
    /// them back (`String(255)`) for display and documentation.
    pub fn display_type(&self) -> String {
        match &self.length_or_precision {
            Some(length) if !self.data_type.contains('(') => format!("{}({})", self.data_type, length),
            _ => self.data_type.clone(),
        }
    }
}

/// A single-column foreign key reference
///
/// Composite constraints are split into one entry per constrained column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constrained column
    pub column: String,

    /// Referenced table
    pub referenced_table: String,

    /// Referenced column
    pub referenced_column: String,

    /// Constraint name, when the source knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, name: impl Into<String>) -> Self {
        self.constraint = Some(name.into());
        self
    }

    /// Comparison key `(column, referenced_table, referenced_column)`
    pub fn key(&self) -> (String, String, String) {
        (
            self.column.clone(),
            self.referenced_table.clone(),
            self.referenced_column.clone(),
        )
    }
}

impl std::fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}.{}", self.column, self.referenced_table, self.referenced_column)
    }
}

/// Index metadata (captured, not compared)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexShape {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Unique constraint metadata (captured, not compared)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// The shape of one table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableShape {
    /// Columns in source order
    #[serde(default)]
    pub columns: Vec<ColumnShape>,

    /// Primary key columns in declaration order
    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Foreign keys, one entry per constrained column
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexShape>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueConstraint>,

    /// Mapped class name (ORM snapshots only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_class: Option<String>,

    /// Introspection failure marker; the shape is otherwise empty when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableShape {
    /// Create an empty table shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Table whose introspection failed
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_column(mut self, column: ColumnShape) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnShape>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_model_class(mut self, class_name: impl Into<String>) -> Self {
        self.model_class = Some(class_name.into());
        self
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnShape> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in source order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary key as a set (composite key order is not compared)
    pub fn primary_key_set(&self) -> BTreeSet<String> {
        self.primary_key.iter().cloned().collect()
    }

    /// Foreign keys as `(column, referenced_table, referenced_column)` tuples
    pub fn foreign_key_set(&self) -> BTreeSet<(String, String, String)> {
        self.foreign_keys.iter().map(ForeignKey::key).collect()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Structural problem inside a single snapshot
///
/// These indicate corruption upstream of the comparison and are reported
/// alongside the discrepancies rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Primary key names a column the table does not have
    UnknownPrimaryKeyColumn { table: String, column: String },

    /// Foreign key constrains a column the table does not have
    UnknownForeignKeyColumn { table: String, column: String },

    /// The same column name appears twice
    DuplicateColumn { table: String, column: String },

    /// The table could not be introspected
    IntrospectionFailed { table: String, error: String },
}

impl IntegrityIssue {
    pub fn table(&self) -> &str {
        match self {
            Self::UnknownPrimaryKeyColumn { table, .. }
            | Self::UnknownForeignKeyColumn { table, .. }
            | Self::DuplicateColumn { table, .. }
            | Self::IntrospectionFailed { table, .. } => table,
        }
    }
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPrimaryKeyColumn { table, column } => {
                write!(f, "Table '{}': primary key column '{}' is not a column of the table", table, column)
            }
            Self::UnknownForeignKeyColumn { table, column } => {
                write!(f, "Table '{}': foreign key column '{}' is not a column of the table", table, column)
            }
            Self::DuplicateColumn { table, column } => {
                write!(f, "Table '{}': column '{}' is declared more than once", table, column)
            }
            Self::IntrospectionFailed { table, error } => {
                write!(f, "Table '{}': introspection failed: {}", table, error)
            }
        }
    }
}

/// Tables of one source keyed by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Vocabulary the column types are spelled in
    pub vocabulary: Vocabulary,

    /// Tables by name (case-sensitive)
    pub tables: BTreeMap<String, TableShape>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            tables: BTreeMap::new(),
        }
    }

    /// Add a table, replacing any previous table with the same name
    pub fn with_table(mut self, name: impl Into<String>, table: TableShape) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableShape> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> BTreeSet<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// New snapshot containing only the tables accepted by `keep`
    pub fn filtered<F>(&self, keep: F) -> Snapshot
    where
        F: Fn(&str) -> bool,
    {
        Snapshot {
            vocabulary: self.vocabulary,
            tables: self
                .tables
                .iter()
                .filter(|(name, _)| keep(name))
                .map(|(name, table)| (name.clone(), table.clone()))
                .collect(),
        }
    }

    /// Check that keys only reference existing columns
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        for (name, table) in &self.tables {
            if let Some(error) = &table.error {
                issues.push(IntegrityIssue::IntrospectionFailed {
                    table: name.clone(),
                    error: error.clone(),
                });
                continue;
            }

            let mut seen = HashSet::new();
            for column in &table.columns {
                if !seen.insert(column.name.as_str()) {
                    issues.push(IntegrityIssue::DuplicateColumn {
                        table: name.clone(),
                        column: column.name.clone(),
                    });
                }
            }

            for column in &table.primary_key {
                if !seen.contains(column.as_str()) {
                    issues.push(IntegrityIssue::UnknownPrimaryKeyColumn {
                        table: name.clone(),
                        column: column.clone(),
                    });
                }
            }

            for fk in &table.foreign_keys {
                if !seen.contains(fk.column.as_str()) {
                    issues.push(IntegrityIssue::UnknownForeignKeyColumn {
                        table: name.clone(),
                        column: fk.column.clone(),
                    });
                }
            }
        }

        issues
    }

    /// SHA-256 over the canonical JSON encoding, hex encoded
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Documented views: name to ordered columns
///
/// Views carry no key semantics and never take part in comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub views: BTreeMap<String, Vec<ColumnShape>>,
}

impl ViewSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, name: impl Into<String>, columns: Vec<ColumnShape>) -> Self {
        self.views.insert(name.into(), columns);
        self
    }

    pub fn view(&self, name: &str) -> Option<&[ColumnShape]> {
        self.views.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
