//! Documentation markdown parser
//!
//! Line-oriented state machine over the schema documentation grammar:
//!
//! ```text
//! ### <table>                       (or `### view: <name>`)
//! **Primary Key:** col1, col2
//! **Columns:**
//! - `column`: type_token NOT NULL   (or NULL)
//! **Foreign Keys:**
//! - `column` -> `table.column`
//! > Introspection failed: <message>  (tables only; replaces the blocks)
//! ```
//!
//! Sections run until the next `### ` heading. Lines that do not fit the
//! grammar are skipped; the parser never fails.

use crate::FAILURE_MARKER;
use schemarecon_core::{ColumnShape, ForeignKey, Snapshot, TableShape, ViewSnapshot, Vocabulary};

/// Tables and views read from a documentation file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDoc {
    pub schema: Snapshot,
    pub views: ViewSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Columns,
    ForeignKeys,
}

enum Section {
    Table { name: String, shape: TableShape },
    View { name: String, columns: Vec<ColumnShape> },
}

/// Parse documentation text into a doc-vocabulary snapshot and its views
pub fn parse_doc(text: &str) -> ParsedDoc {
    let mut parsed = ParsedDoc {
        schema: Snapshot::new(Vocabulary::Doc),
        views: ViewSnapshot::new(),
    };
    let mut section: Option<Section> = None;
    let mut block = Block::None;

    for line in text.lines() {
        let line = line.trim();

        if let Some(heading) = line.strip_prefix("### ") {
            if let Some(done) = section.take() {
                finish(&mut parsed, done);
            }
            section = parse_heading(heading);
            block = Block::None;
            continue;
        }

        let Some(current) = section.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix("**Primary Key:**") {
            if let Section::Table { shape, .. } = current {
                shape.primary_key = rest
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            block = Block::None;
        } else if let Some(message) = line.strip_prefix(FAILURE_MARKER) {
            if let Section::Table { shape, .. } = current {
                shape.error = Some(message.trim().to_string());
            }
            block = Block::None;
        } else if line == "**Columns:**" {
            block = Block::Columns;
        } else if line == "**Foreign Keys:**" {
            block = Block::ForeignKeys;
        } else if line.starts_with("**") {
            block = Block::None;
        } else if line.starts_with("- `") {
            match (block, current) {
                (Block::Columns, Section::Table { shape, .. }) => {
                    if let Some(column) = parse_column(line) {
                        shape.columns.push(column);
                    }
                }
                (Block::Columns, Section::View { columns, .. }) => {
                    if let Some(column) = parse_column(line) {
                        columns.push(column);
                    }
                }
                (Block::ForeignKeys, Section::Table { shape, .. }) => {
                    if let Some(fk) = parse_foreign_key(line) {
                        shape.foreign_keys.push(fk);
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(done) = section {
        finish(&mut parsed, done);
    }

    parsed
}

fn finish(parsed: &mut ParsedDoc, section: Section) {
    match section {
        Section::Table { name, shape } => {
            parsed.schema.tables.insert(name, shape);
        }
        Section::View { name, columns } => {
            parsed.views.views.insert(name, columns);
        }
    }
}

fn parse_heading(heading: &str) -> Option<Section> {
    let heading = heading.trim();

    let view_name = heading
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("view:"))
        .map(|_| heading[5..].trim());

    match view_name {
        Some("") => None,
        Some(name) => Some(Section::View {
            name: name.to_string(),
            columns: Vec::new(),
        }),
        None if heading.is_empty() => None,
        None => Some(Section::Table {
            name: heading.to_string(),
            shape: TableShape::new(),
        }),
    }
}

/// Split "- `name` rest" into `(name, rest)`
fn split_ticked(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix("- `")?;
    let (name, rest) = rest.split_once('`')?;
    if name.is_empty() {
        None
    } else {
        Some((name, rest))
    }
}

/// `` - `column`: type_token NOT NULL `` or `` ... NULL ``
fn parse_column(line: &str) -> Option<ColumnShape> {
    let (name, rest) = split_ticked(line)?;
    let rest = rest.strip_prefix(':')?.trim();

    let (data_type, nullable) = if let Some(t) = rest.strip_suffix("NOT NULL") {
        (t, false)
    } else if let Some(t) = rest.strip_suffix("NULL") {
        (t, true)
    } else {
        return None;
    };

    // the type must be separated from the nullability marker
    if !data_type.ends_with(char::is_whitespace) {
        return None;
    }
    let data_type = data_type.trim();
    if data_type.is_empty() {
        return None;
    }

    Some(ColumnShape::new(name, data_type, nullable))
}

/// `` - `column` -> `table.column` ``
fn parse_foreign_key(line: &str) -> Option<ForeignKey> {
    let (column, rest) = split_ticked(line)?;
    let target = rest
        .trim()
        .strip_prefix("->")?
        .trim()
        .strip_prefix('`')?
        .strip_suffix('`')?;
    let (table, referenced) = target.rsplit_once('.')?;
    if table.is_empty() || referenced.is_empty() {
        return None;
    }

    Some(ForeignKey::new(column, table, referenced))
}
