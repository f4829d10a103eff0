//! Test fixtures for catalog introspection tests
//!
//! Table shapes modelled on a small media catalog: a `media` table, an
//! `episodes` table referencing it, and a `users` table.

#![allow(dead_code)]

use schemarecon_core::{ColumnShape, ForeignKey, IndexShape, TableShape, UniqueConstraint};

/// `media`: serial id, title, release timestamp
pub fn media_table() -> TableShape {
    TableShape::new()
        .with_columns(vec![
            ColumnShape::new("id", "integer", false)
                .with_default("nextval('media_id_seq'::regclass)")
                .with_autoincrement(true),
            ColumnShape::new("title", "character varying(255)", false),
            ColumnShape::new("released_at", "timestamp with time zone", true),
            ColumnShape::new("tags", "text[]", true),
        ])
        .with_primary_key(["id"])
}

/// `episodes`: composite key, references `media.id`
pub fn episodes_table() -> TableShape {
    let mut shape = TableShape::new()
        .with_columns(vec![
            ColumnShape::new("media_id", "integer", false),
            ColumnShape::new("number", "integer", false),
            ColumnShape::new("runtime", "numeric(6,2)", true),
        ])
        .with_primary_key(["media_id", "number"])
        .with_foreign_key(ForeignKey::new("media_id", "media", "id").with_constraint("episodes_media_id_fkey"));

    shape.indexes.push(IndexShape {
        name: "ix_episodes_runtime".to_string(),
        unique: false,
        columns: vec!["runtime".to_string()],
    });
    shape
}

/// `users`: unique email
pub fn users_table() -> TableShape {
    let mut shape = TableShape::new()
        .with_columns(vec![
            ColumnShape::new("id", "bigint", false),
            ColumnShape::new("email", "character varying(320)", false),
            ColumnShape::new("is_active", "boolean", false).with_default("true"),
        ])
        .with_primary_key(["id"]);

    shape.unique_constraints.push(UniqueConstraint {
        name: Some("users_email_key".to_string()),
        columns: vec!["email".to_string()],
    });
    shape
}
