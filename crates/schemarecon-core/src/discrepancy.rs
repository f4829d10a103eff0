//! Discrepancies between two snapshots and their fixed severity policy
//!
//! IMPORTANT: The severity of each discrepancy kind is fixed.
//! It is never configurable, so a "critical" line means the same thing in
//! every report ever generated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - relationships that differ but do not break queries
    Info,

    /// Warning - column definitions disagree
    Warning,

    /// Critical - a table, column or key is missing on one side
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Warning, Severity::Info];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discrepancy kind without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    TableOnlyInA,
    TableOnlyInB,
    ColumnOnlyInA,
    ColumnOnlyInB,
    TypeMismatch,
    NullableMismatch,
    PrimaryKeyMismatch,
    ForeignKeyOnlyInA,
    ForeignKeyOnlyInB,
}

impl DiscrepancyKind {
    /// Every kind, in declaration order
    pub const ALL: [DiscrepancyKind; 9] = [
        Self::TableOnlyInA,
        Self::TableOnlyInB,
        Self::ColumnOnlyInA,
        Self::ColumnOnlyInB,
        Self::TypeMismatch,
        Self::NullableMismatch,
        Self::PrimaryKeyMismatch,
        Self::ForeignKeyOnlyInA,
        Self::ForeignKeyOnlyInB,
    ];

    /// Severity policy table
    pub fn severity(&self) -> Severity {
        match self {
            Self::TableOnlyInA
            | Self::TableOnlyInB
            | Self::ColumnOnlyInA
            | Self::ColumnOnlyInB
            | Self::PrimaryKeyMismatch => Severity::Critical,
            Self::TypeMismatch | Self::NullableMismatch => Severity::Warning,
            Self::ForeignKeyOnlyInA | Self::ForeignKeyOnlyInB => Severity::Info,
        }
    }

    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableOnlyInA => "table_only_in_a",
            Self::TableOnlyInB => "table_only_in_b",
            Self::ColumnOnlyInA => "column_only_in_a",
            Self::ColumnOnlyInB => "column_only_in_b",
            Self::TypeMismatch => "type_mismatch",
            Self::NullableMismatch => "nullable_mismatch",
            Self::PrimaryKeyMismatch => "primary_key_mismatch",
            Self::ForeignKeyOnlyInA => "foreign_key_only_in_a",
            Self::ForeignKeyOnlyInB => "foreign_key_only_in_b",
        }
    }
}

impl std::fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display names of the two compared sources ("DB", "Model", "Doc")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLabels {
    pub a: String,
    pub b: String,
}

impl SourceLabels {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self { a: a.into(), b: b.into() }
    }
}

impl Default for SourceLabels {
    fn default() -> Self {
        Self::new("A", "B")
    }
}

/// One structured difference between snapshot A and snapshot B
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    TableOnlyInA {
        table: String,
    },
    TableOnlyInB {
        table: String,
    },
    ColumnOnlyInA {
        table: String,
        column: String,
    },
    ColumnOnlyInB {
        table: String,
        column: String,
    },
    TypeMismatch {
        table: String,
        column: String,
        type_a: String,
        type_b: String,
    },
    NullableMismatch {
        table: String,
        column: String,
        nullable_a: bool,
        nullable_b: bool,
    },
    PrimaryKeyMismatch {
        table: String,
        pk_a: BTreeSet<String>,
        pk_b: BTreeSet<String>,
    },
    ForeignKeyOnlyInA {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
    ForeignKeyOnlyInB {
        table: String,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
}

impl Discrepancy {
    pub fn kind(&self) -> DiscrepancyKind {
        match self {
            Self::TableOnlyInA { .. } => DiscrepancyKind::TableOnlyInA,
            Self::TableOnlyInB { .. } => DiscrepancyKind::TableOnlyInB,
            Self::ColumnOnlyInA { .. } => DiscrepancyKind::ColumnOnlyInA,
            Self::ColumnOnlyInB { .. } => DiscrepancyKind::ColumnOnlyInB,
            Self::TypeMismatch { .. } => DiscrepancyKind::TypeMismatch,
            Self::NullableMismatch { .. } => DiscrepancyKind::NullableMismatch,
            Self::PrimaryKeyMismatch { .. } => DiscrepancyKind::PrimaryKeyMismatch,
            Self::ForeignKeyOnlyInA { .. } => DiscrepancyKind::ForeignKeyOnlyInA,
            Self::ForeignKeyOnlyInB { .. } => DiscrepancyKind::ForeignKeyOnlyInB,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind().severity()
    }

    /// Table the discrepancy is about
    pub fn table(&self) -> &str {
        match self {
            Self::TableOnlyInA { table }
            | Self::TableOnlyInB { table }
            | Self::ColumnOnlyInA { table, .. }
            | Self::ColumnOnlyInB { table, .. }
            | Self::TypeMismatch { table, .. }
            | Self::NullableMismatch { table, .. }
            | Self::PrimaryKeyMismatch { table, .. }
            | Self::ForeignKeyOnlyInA { table, .. }
            | Self::ForeignKeyOnlyInB { table, .. } => table,
        }
    }

    /// Owning table; empty for table-level discrepancies
    pub fn owning_table(&self) -> &str {
        match self {
            Self::TableOnlyInA { .. } | Self::TableOnlyInB { .. } => "",
            other => other.table(),
        }
    }

    /// Render as one human-readable line
    pub fn describe(&self, labels: &SourceLabels) -> String {
        let (a, b) = (&labels.a, &labels.b);
        match self {
            Self::TableOnlyInA { table } => {
                format!("Table '{}' exists in {} but missing from {}", table, a, b)
            }
            Self::TableOnlyInB { table } => {
                format!("Table '{}' exists in {} but missing from {}", table, b, a)
            }
            Self::ColumnOnlyInA { table, column } => {
                format!("Table '{}': Column '{}' in {} but not in {}", table, column, a, b)
            }
            Self::ColumnOnlyInB { table, column } => {
                format!("Table '{}': Column '{}' in {} but not in {}", table, column, b, a)
            }
            Self::TypeMismatch { table, column, type_a, type_b } => format!(
                "Table '{}': Column '{}' type mismatch ({}: {}, {}: {})",
                table, column, a, type_a, b, type_b
            ),
            Self::NullableMismatch { table, column, nullable_a, nullable_b } => format!(
                "Table '{}': Column '{}' nullable mismatch ({}: {}, {}: {})",
                table, column, a, nullable_a, b, nullable_b
            ),
            Self::PrimaryKeyMismatch { table, pk_a, pk_b } => format!(
                "Table '{}': Primary key mismatch ({}: [{}], {}: [{}])",
                table,
                a,
                join(pk_a),
                b,
                join(pk_b)
            ),
            Self::ForeignKeyOnlyInA { table, column, referenced_table, referenced_column } => format!(
                "Table '{}': FK '{}' -> {}.{} in {} but not in {}",
                table, column, referenced_table, referenced_column, a, b
            ),
            Self::ForeignKeyOnlyInB { table, column, referenced_table, referenced_column } => format!(
                "Table '{}': FK '{}' -> {}.{} in {} but not in {}",
                table, column, referenced_table, referenced_column, b, a
            ),
        }
    }
}

fn join(columns: &BTreeSet<String>) -> String {
    columns.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Unordered set of discrepancies
///
/// Equality is set equality; iteration follows the derived ordering, which
/// keeps rendered output stable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscrepancySet(BTreeSet<Discrepancy>);

impl DiscrepancySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert; returns false when already present
    pub fn insert(&mut self, discrepancy: Discrepancy) -> bool {
        self.0.insert(discrepancy)
    }

    pub fn contains(&self, discrepancy: &Discrepancy) -> bool {
        self.0.contains(discrepancy)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Discrepancy> {
        self.0.iter()
    }

    /// Count discrepancies in a severity tier
    pub fn count(&self, severity: Severity) -> usize {
        self.0.iter().filter(|d| d.severity() == severity).count()
    }
}

impl FromIterator<Discrepancy> for DiscrepancySet {
    fn from_iter<I: IntoIterator<Item = Discrepancy>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for DiscrepancySet {
    type Item = Discrepancy;
    type IntoIter = std::collections::btree_set::IntoIter<Discrepancy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiscrepancySet {
    type Item = &'a Discrepancy;
    type IntoIter = std::collections::btree_set::Iter<'a, Discrepancy>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
