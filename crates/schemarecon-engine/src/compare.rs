//! Snapshot comparison engine
//!
//! Compares two snapshots of the same database (live catalog, ORM models or
//! documentation) and produces the set of structural differences between
//! them. Names are matched exactly; a renamed table or column shows up as
//! one "only in A" plus one "only in B" entry.

use schemarecon_core::{
    Discrepancy, DiscrepancySet, IntegrityIssue, Normalizer, Severity, Snapshot, SourceLabels,
    TableShape, Vocabulary,
};
use std::collections::BTreeSet;

/// Compare snapshot `a` against snapshot `b`
///
/// Column types are compared by canonical type, each side normalized in its
/// own vocabulary. Primary keys are compared as sets, foreign keys as sets
/// of `(column, referenced_table, referenced_column)`. Tables carrying an
/// introspection failure marker take part in the table-set difference only.
pub fn compare(a: &Snapshot, b: &Snapshot, normalizer: &Normalizer) -> DiscrepancySet {
    let mut discrepancies = DiscrepancySet::new();

    let tables_a = a.table_names();
    let tables_b = b.table_names();

    for table in tables_a.difference(&tables_b) {
        discrepancies.insert(Discrepancy::TableOnlyInA {
            table: table.to_string(),
        });
    }

    for table in tables_b.difference(&tables_a) {
        discrepancies.insert(Discrepancy::TableOnlyInB {
            table: table.to_string(),
        });
    }

    for table in tables_a.intersection(&tables_b) {
        let (Some(shape_a), Some(shape_b)) = (a.table(table), b.table(table)) else {
            continue;
        };

        if shape_a.is_failed() || shape_b.is_failed() {
            tracing::debug!(table = %table, "skipping column comparison for failed table");
            continue;
        }

        compare_table(
            table,
            (shape_a, a.vocabulary),
            (shape_b, b.vocabulary),
            normalizer,
            &mut discrepancies,
        );
    }

    discrepancies
}

fn compare_table(
    table: &str,
    (shape_a, vocab_a): (&TableShape, Vocabulary),
    (shape_b, vocab_b): (&TableShape, Vocabulary),
    normalizer: &Normalizer,
    discrepancies: &mut DiscrepancySet,
) {
    let columns_a: BTreeSet<&str> = shape_a.column_names().into_iter().collect();
    let columns_b: BTreeSet<&str> = shape_b.column_names().into_iter().collect();

    for column in columns_a.difference(&columns_b) {
        discrepancies.insert(Discrepancy::ColumnOnlyInA {
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    for column in columns_b.difference(&columns_a) {
        discrepancies.insert(Discrepancy::ColumnOnlyInB {
            table: table.to_string(),
            column: column.to_string(),
        });
    }

    for column in columns_a.intersection(&columns_b) {
        let (Some(col_a), Some(col_b)) = (shape_a.column(column), shape_b.column(column)) else {
            continue;
        };

        let type_a = col_a.display_type();
        let type_b = col_b.display_type();
        if !normalizer.equivalent(&type_a, vocab_a, &type_b, vocab_b) {
            discrepancies.insert(Discrepancy::TypeMismatch {
                table: table.to_string(),
                column: column.to_string(),
                type_a,
                type_b,
            });
        }

        if col_a.nullable != col_b.nullable {
            discrepancies.insert(Discrepancy::NullableMismatch {
                table: table.to_string(),
                column: column.to_string(),
                nullable_a: col_a.nullable,
                nullable_b: col_b.nullable,
            });
        }
    }

    let pk_a = shape_a.primary_key_set();
    let pk_b = shape_b.primary_key_set();
    if pk_a != pk_b {
        discrepancies.insert(Discrepancy::PrimaryKeyMismatch {
            table: table.to_string(),
            pk_a,
            pk_b,
        });
    }

    let fks_a = shape_a.foreign_key_set();
    let fks_b = shape_b.foreign_key_set();

    for (column, referenced_table, referenced_column) in fks_a.difference(&fks_b).cloned() {
        discrepancies.insert(Discrepancy::ForeignKeyOnlyInA {
            table: table.to_string(),
            column,
            referenced_table,
            referenced_column,
        });
    }

    for (column, referenced_table, referenced_column) in fks_b.difference(&fks_a).cloned() {
        discrepancies.insert(Discrepancy::ForeignKeyOnlyInB {
            table: table.to_string(),
            column,
            referenced_table,
            referenced_column,
        });
    }
}

/// A comparison together with the integrity problems found in its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub labels: SourceLabels,
    pub discrepancies: DiscrepancySet,
    pub integrity: Vec<IntegrityIssue>,
}

impl Comparison {
    /// Check both snapshots for integrity problems, then compare them
    pub fn run(a: &Snapshot, b: &Snapshot, labels: SourceLabels, normalizer: &Normalizer) -> Self {
        let mut integrity = a.integrity_issues();
        integrity.extend(b.integrity_issues());
        integrity.sort();
        integrity.dedup();

        for issue in &integrity {
            tracing::warn!(table = issue.table(), "{}", issue);
        }

        let discrepancies = compare(a, b, normalizer);
        tracing::info!(
            a = %labels.a,
            b = %labels.b,
            total = discrepancies.len(),
            critical = discrepancies.count(Severity::Critical),
            "comparison finished"
        );

        Self {
            labels,
            discrepancies,
            integrity,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty() && self.integrity.is_empty()
    }
}
