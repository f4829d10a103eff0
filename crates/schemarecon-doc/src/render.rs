//! Documentation markdown renderer
//!
//! Emits the grammar read by [`crate::parse_doc`]. Views come first, then
//! tables, each group in lexicographic order, so regenerated documentation
//! diffs cleanly.

use crate::FAILURE_MARKER;
use schemarecon_core::{ColumnShape, Snapshot, TableShape, ViewSnapshot};

/// Preamble written above the first section
///
/// Everything here sits outside the grammar and is ignored when parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocHeader {
    pub title: String,
    pub generated_at: Option<String>,
    pub note: Option<String>,
}

impl DocHeader {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: None,
            note: None,
        }
    }

    pub fn with_generated_at(mut self, timestamp: impl Into<String>) -> Self {
        self.generated_at = Some(timestamp.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Render a snapshot and its views as documentation markdown
pub fn render_doc(snapshot: &Snapshot, views: &ViewSnapshot, header: Option<&DocHeader>) -> String {
    let mut out = String::new();

    if let Some(header) = header {
        out.push_str(&format!("# {}\n\n", header.title));
        if let Some(timestamp) = &header.generated_at {
            out.push_str(&format!("Generated: {}\n\n", timestamp));
        }
        if let Some(note) = &header.note {
            out.push_str(&format!("{}\n\n", note));
        }
    }

    for (name, columns) in &views.views {
        out.push_str(&format!("### view: {}\n\n", name));
        render_columns(&mut out, columns);
    }

    for (name, table) in &snapshot.tables {
        render_table(&mut out, name, table);
    }

    out
}

fn render_table(out: &mut String, name: &str, table: &TableShape) {
    out.push_str(&format!("### {}\n\n", name));

    if let Some(error) = &table.error {
        out.push_str(&format!("{} {}\n\n", FAILURE_MARKER, error));
        return;
    }

    if !table.primary_key.is_empty() {
        out.push_str(&format!("**Primary Key:** {}\n\n", table.primary_key.join(", ")));
    }

    render_columns(out, &table.columns);

    if !table.foreign_keys.is_empty() {
        let mut foreign_keys: Vec<_> = table.foreign_keys.iter().collect();
        foreign_keys.sort();

        out.push_str("**Foreign Keys:**\n");
        for fk in foreign_keys {
            out.push_str(&format!(
                "- `{}` -> `{}.{}`\n",
                fk.column, fk.referenced_table, fk.referenced_column
            ));
        }
        out.push('\n');
    }
}

fn render_columns(out: &mut String, columns: &[ColumnShape]) {
    out.push_str("**Columns:**\n");
    for column in columns {
        let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
        out.push_str(&format!("- `{}`: {} {}\n", column.name, column.display_type(), nullability));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemarecon_core::{ForeignKey, Vocabulary};

    #[test]
    fn renders_grammar() {
        let snapshot = Snapshot::new(Vocabulary::Native)
            .with_table(
                "media",
                TableShape::new()
                    .with_column(ColumnShape::new("id", "integer", false))
                    .with_column(ColumnShape::new("title", "varchar", true).with_length("255"))
                    .with_primary_key(["id"]),
            )
            .with_table(
                "episodes",
                TableShape::new()
                    .with_column(ColumnShape::new("media_id", "integer", false))
                    .with_primary_key(["media_id"])
                    .with_foreign_key(ForeignKey::new("media_id", "media", "id")),
            );
        let views = ViewSnapshot::new()
            .with_view("active_users", vec![ColumnShape::new("id", "integer", false)]);

        let expected = "\
### view: active_users

**Columns:**
- `id`: integer NOT NULL

### episodes

**Primary Key:** media_id

**Columns:**
- `media_id`: integer NOT NULL

**Foreign Keys:**
- `media_id` -> `media.id`

### media

**Primary Key:** id

**Columns:**
- `id`: integer NOT NULL
- `title`: varchar(255) NULL

";
        assert_eq!(render_doc(&snapshot, &views, None), expected);
    }

    #[test]
    fn header_and_failed_tables() {
        let snapshot = Snapshot::new(Vocabulary::Native)
            .with_table("secrets", TableShape::failed("permission denied"));
        let header = DocHeader::new("Database Schema")
            .with_generated_at("2026-01-01T00:00:00Z")
            .with_note("> Regenerate with `schemarecon generate-docs`.");

        let doc = render_doc(&snapshot, &ViewSnapshot::new(), Some(&header));

        assert!(doc.starts_with("# Database Schema\n\nGenerated: 2026-01-01T00:00:00Z\n\n"));
        assert!(doc.contains("### secrets\n\n> Introspection failed: permission denied\n"));
        assert!(!doc.contains("**Columns:**"));
    }
}
