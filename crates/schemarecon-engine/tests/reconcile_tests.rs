//! End-to-end reconciliation: parse, compare, write artifacts, summarize

use pretty_assertions::assert_eq;
use schemarecon_core::{
    ColumnShape, Discrepancy, ForeignKey, Normalizer, Severity, Snapshot, SourceLabels, TableShape, ViewSnapshot,
    Vocabulary,
};
use schemarecon_doc::{parse_doc, render_doc};
use schemarecon_engine::{
    markdown_summary, to_json, ArtifactKind, ArtifactMetadata, ArtifactStore, Comparison, ComparisonArtifact,
    IntrospectionArtifact, SourceRef,
};
use tempfile::TempDir;

const DOC: &str = "\
# Database Schema

### view: active_users

**Columns:**
- `id`: integer NOT NULL
- `email`: varchar(320) NULL

### media

**Primary Key:** id

**Columns:**
- `id`: integer NOT NULL
- `title`: varchar(255) NOT NULL
- `rating`: numeric(3,1) NULL

### episodes

**Primary Key:** media_id, number

**Columns:**
- `media_id`: integer NOT NULL
- `number`: integer NOT NULL

**Foreign Keys:**
- `media_id` -> `media.id`
";

fn models() -> Snapshot {
    Snapshot::new(Vocabulary::Orm)
        .with_table(
            "media",
            TableShape::new()
                .with_column(ColumnShape::new("id", "Integer", false))
                .with_column(ColumnShape::new("title", "String", false).with_length("255"))
                .with_column(ColumnShape::new("rating", "Numeric", true))
                .with_primary_key(["id"])
                .with_model_class("Media"),
        )
        .with_table(
            "episodes",
            TableShape::new()
                .with_column(ColumnShape::new("media_id", "Integer", false))
                .with_column(ColumnShape::new("number", "Integer", false))
                .with_primary_key(["media_id", "number"])
                .with_foreign_key(ForeignKey::new("media_id", "media", "id"))
                .with_model_class("Episode"),
        )
}

// ============================================================================
// Documentation vs models
// ============================================================================

#[test]
fn test_documented_views_are_not_compared() {
    let doc = parse_doc(DOC);
    assert!(doc.views.view("active_users").is_some());

    let comparison = Comparison::run(&doc.schema, &models(), SourceLabels::new("Doc", "Model"), &Normalizer::new());

    assert!(comparison.is_clean(), "unexpected: {:?}", comparison.discrepancies);
    assert!(!comparison
        .discrepancies
        .contains(&Discrepancy::TableOnlyInA { table: "active_users".to_string() }));
}

#[test]
fn test_doc_drift_is_categorized() {
    let doc = parse_doc(&DOC.replace("- `rating`: numeric(3,1) NULL", "- `rating`: numeric(3,1) NOT NULL"));
    let models = models().with_table("users", TableShape::new().with_column(ColumnShape::new("id", "BigInteger", false)));

    let comparison = Comparison::run(&doc.schema, &models, SourceLabels::new("Doc", "Model"), &Normalizer::new());

    assert_eq!(comparison.discrepancies.len(), 2);
    assert_eq!(comparison.discrepancies.count(Severity::Critical), 1);
    assert_eq!(comparison.discrepancies.count(Severity::Warning), 1);

    let artifact = ComparisonArtifact::new(ArtifactMetadata::new("compare-models-doc"), &comparison);
    assert_eq!(
        artifact.categories.critical,
        vec!["Table 'users' exists in Model but missing from Doc"]
    );
    assert_eq!(
        artifact.categories.warning,
        vec!["Table 'media': Column 'rating' nullable mismatch (Doc: false, Model: true)"]
    );
}

#[test]
fn test_failed_table_in_generated_doc_is_skipped() {
    let live = Snapshot::new(Vocabulary::Native).with_table("secrets", TableShape::failed("permission denied"));
    let doc = parse_doc(&render_doc(&live, &ViewSnapshot::new(), None));

    let models = Snapshot::new(Vocabulary::Orm).with_table(
        "secrets",
        TableShape::new()
            .with_column(ColumnShape::new("id", "Integer", false))
            .with_column(ColumnShape::new("token", "String", false)),
    );

    let comparison = Comparison::run(&doc.schema, &models, SourceLabels::new("Doc", "Model"), &Normalizer::new());

    assert!(comparison.discrepancies.is_empty(), "unexpected: {:?}", comparison.discrepancies);
    assert_eq!(comparison.integrity.len(), 1);
    assert!(comparison.integrity[0].to_string().contains("permission denied"));
}

// ============================================================================
// Reports directory
// ============================================================================

#[test]
fn test_cached_introspection_feeds_comparison() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path().join("reports"));

    let live = Snapshot::new(Vocabulary::Native).with_table(
        "media",
        TableShape::new()
            .with_column(ColumnShape::new("id", "integer", false))
            .with_column(ColumnShape::new("title", "character varying(255)", false))
            .with_column(ColumnShape::new("rating", "numeric(3,1)", true))
            .with_primary_key(["id"]),
    );
    let artifact = IntrospectionArtifact::new(ArtifactMetadata::new("introspect"), &live);
    store.write_new(ArtifactKind::Introspect, &to_json(&artifact).unwrap()).unwrap();

    let path = store.latest(ArtifactKind::Introspect).unwrap().unwrap();
    let cached: IntrospectionArtifact = store.load(&path).unwrap();
    let db = cached.snapshot();
    assert_eq!(db, live);

    let comparison = Comparison::run(&db, &models(), SourceLabels::new("DB", "Model"), &Normalizer::new());
    assert_eq!(
        comparison.discrepancies.iter().cloned().collect::<Vec<_>>(),
        vec![Discrepancy::TableOnlyInB { table: "episodes".to_string() }]
    );
}

#[test]
fn test_summary_over_stored_comparisons() {
    let temp = TempDir::new().unwrap();
    let store = ArtifactStore::new(temp.path());
    let doc = parse_doc(DOC);

    let clean = Comparison::run(&doc.schema, &models(), SourceLabels::new("Doc", "Model"), &Normalizer::new());
    let metadata = ArtifactMetadata::new("compare-models-doc")
        .with_source("Doc", SourceRef::new("docs/database_schema.md").with_fingerprint(&doc.schema))
        .with_source("Model", SourceRef::new("models").with_fingerprint(&models()));
    let artifact = ComparisonArtifact::new(metadata, &clean);
    store.write_new(ArtifactKind::CompareModelsDoc, &to_json(&artifact).unwrap()).unwrap();

    let mut loaded = Vec::new();
    for kind in ArtifactKind::COMPARISONS {
        for path in store.list(kind).unwrap() {
            loaded.push(store.load::<ComparisonArtifact>(&path).unwrap());
        }
    }
    assert_eq!(loaded, vec![artifact]);

    let md = markdown_summary(&loaded, "2026-10-18 12:00:00 UTC");
    assert!(md.contains("## compare-models-doc\n"));
    assert!(md.contains("- Sources: Doc: docs/database_schema.md, Model: models\n"));
    assert!(md.contains("*No discrepancies found*"));

    let fingerprint = loaded[0].metadata.sources["Doc"].fingerprint.as_deref().unwrap();
    assert_eq!(fingerprint, doc.schema.fingerprint().unwrap());
}
