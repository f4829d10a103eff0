//! Report artifacts
//!
//! JSON artifacts written by each command, plus the consolidated markdown
//! summary over comparison artifacts.

use crate::categorize::{categorize, Categories};
use crate::compare::Comparison;
use schemarecon_core::{
    DiscrepancySet, IntegrityIssue, Severity, Snapshot, TableShape, Vocabulary,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Generator name recorded in every artifact
pub const GENERATOR: &str = "schemarecon";

/// Errors that can occur when encoding or decoding artifacts
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to serialize artifact: {0}")]
    Serialize(String),

    #[error("Failed to parse artifact: {0}")]
    Parse(String),
}

/// Where one compared input came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// File path, or `live` for a live introspection
    pub origin: String,

    /// Files the source was assembled from (model modules)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    /// SHA-256 of the snapshot's canonical JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl SourceRef {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            files: Vec::new(),
            fingerprint: None,
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fingerprint(mut self, snapshot: &Snapshot) -> Self {
        match snapshot.fingerprint() {
            Ok(fingerprint) => self.fingerprint = Some(fingerprint),
            Err(e) => tracing::warn!(origin = %self.origin, error = %e, "failed to fingerprint snapshot"),
        }
        self
    }
}

/// Metadata block present in every artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub generator: String,

    /// UTC, RFC 3339
    pub timestamp: String,

    pub command: String,

    /// Input sources keyed by label
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SourceRef>,

    /// Database name (introspection only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl ArtifactMetadata {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            generator: GENERATOR.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: command.into(),
            sources: BTreeMap::new(),
            database: None,
        }
    }

    pub fn with_source(mut self, label: impl Into<String>, source: SourceRef) -> Self {
        self.sources.insert(label.into(), source);
        self
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }
}

/// Output of `introspect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionArtifact {
    pub metadata: ArtifactMetadata,
    pub schema: BTreeMap<String, TableShape>,
}

impl IntrospectionArtifact {
    pub fn new(metadata: ArtifactMetadata, snapshot: &Snapshot) -> Self {
        Self {
            metadata,
            schema: snapshot.tables.clone(),
        }
    }

    /// The cached catalog as a native-vocabulary snapshot
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            vocabulary: Vocabulary::Native,
            tables: self.schema.clone(),
        }
    }
}

/// Per-severity counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl Summary {
    pub fn of(discrepancies: &DiscrepancySet) -> Self {
        Self {
            total: discrepancies.len(),
            critical: discrepancies.count(Severity::Critical),
            warning: discrepancies.count(Severity::Warning),
            info: discrepancies.count(Severity::Info),
        }
    }
}

/// Output of `compare-db-models` and `compare-models-doc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonArtifact {
    pub metadata: ArtifactMetadata,
    pub summary: Summary,
    pub discrepancies: DiscrepancySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrity: Vec<IntegrityIssue>,
    pub categories: Categories,
}

impl ComparisonArtifact {
    pub fn new(metadata: ArtifactMetadata, comparison: &Comparison) -> Self {
        Self {
            metadata,
            summary: Summary::of(&comparison.discrepancies),
            categories: categorize(&comparison.discrepancies, &comparison.labels),
            discrepancies: comparison.discrepancies.clone(),
            integrity: comparison.integrity.clone(),
        }
    }

    /// Keep only the listed severity buckets; totals are left as recorded
    pub fn with_sections(mut self, sections: &[Severity]) -> Self {
        self.categories.retain(sections);
        self
    }
}

/// Encode an artifact as indented UTF-8 JSON
pub fn to_json<T: Serialize>(artifact: &T) -> Result<Vec<u8>, ReportError> {
    let mut bytes =
        serde_json::to_vec_pretty(artifact).map_err(|e| ReportError::Serialize(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode an artifact
pub fn from_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, ReportError> {
    serde_json::from_slice(bytes).map_err(|e| ReportError::Parse(e.to_string()))
}

/// Render one markdown section per comparison artifact
pub fn markdown_summary(artifacts: &[ComparisonArtifact], generated_at: &str) -> String {
    let mut md = String::new();

    md.push_str("# Schema Comparison Summary\n\n");
    md.push_str(&format!("*Generated: {}*\n\n", generated_at));

    for artifact in artifacts {
        let metadata = &artifact.metadata;
        md.push_str(&format!("## {}\n\n", metadata.command));
        md.push_str(&format!("- Timestamp: {}\n", metadata.timestamp));

        if !metadata.sources.is_empty() {
            let sources: Vec<String> = metadata
                .sources
                .iter()
                .map(|(label, source)| format!("{}: {}", label, source.origin))
                .collect();
            md.push_str(&format!("- Sources: {}\n", sources.join(", ")));
        }

        let summary = &artifact.summary;
        md.push_str(&format!(
            "- Totals: {} critical, {} warning, {} info\n\n",
            summary.critical, summary.warning, summary.info
        ));

        let sections = [
            ("Critical Issues", &artifact.categories.critical),
            ("Warnings", &artifact.categories.warning),
            ("Info", &artifact.categories.info),
        ];
        for (title, lines) in sections {
            if lines.is_empty() {
                continue;
            }
            md.push_str(&format!("### {}\n\n", title));
            for line in lines {
                md.push_str(&format!("- {}\n", line));
            }
            md.push('\n');
        }

        if !artifact.integrity.is_empty() {
            md.push_str("### Integrity\n\n");
            for issue in &artifact.integrity {
                md.push_str(&format!("- {}\n", issue));
            }
            md.push('\n');
        }

        if artifact.summary.total == 0 {
            md.push_str("*No discrepancies found*\n\n");
        }
    }

    md
}

/// Render the summary as markdown tables
///
/// One overview row per artifact, then a severity/issue table for each
/// artifact that still has lines after section filtering.
pub fn table_summary(artifacts: &[ComparisonArtifact], generated_at: &str) -> String {
    let mut md = String::new();

    md.push_str("# Schema Comparison Summary\n\n");
    md.push_str(&format!("*Generated: {}*\n\n", generated_at));

    md.push_str("| Comparison | Timestamp | Critical | Warning | Info |\n");
    md.push_str("|------------|-----------|----------|---------|------|\n");
    for artifact in artifacts {
        let summary = &artifact.summary;
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            artifact.metadata.command, artifact.metadata.timestamp, summary.critical, summary.warning, summary.info
        ));
    }
    md.push('\n');

    for artifact in artifacts {
        if artifact.categories.is_empty() {
            continue;
        }
        md.push_str(&format!("## {} ({})\n\n", artifact.metadata.command, artifact.metadata.timestamp));
        md.push_str("| Severity | Issue |\n");
        md.push_str("|----------|-------|\n");
        for severity in Severity::ALL {
            for line in artifact.categories.bucket(severity) {
                md.push_str(&format!("| {} | {} |\n", severity, line.replace('|', "\\|")));
            }
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemarecon_core::{ColumnShape, Normalizer, SourceLabels};

    fn comparison() -> Comparison {
        let db = Snapshot::new(Vocabulary::Native)
            .with_table(
                "users",
                TableShape::new().with_column(ColumnShape::new("id", "integer", false)),
            )
            .with_table(
                "media",
                TableShape::new().with_column(ColumnShape::new("imdb_rating", "double precision", true)),
            );
        let models = Snapshot::new(Vocabulary::Orm).with_table(
            "media",
            TableShape::new().with_column(ColumnShape::new("imdb_rating", "Float", false)),
        );

        Comparison::run(&db, &models, SourceLabels::new("DB", "Model"), &Normalizer::new())
    }

    #[test]
    fn comparison_artifact_json() {
        let metadata = ArtifactMetadata::new("compare-db-models")
            .with_source("DB", SourceRef::new("live"))
            .with_source("Model", SourceRef::new("models").with_files(["models/models_media.toml"]));
        let artifact = ComparisonArtifact::new(metadata, &comparison());

        let bytes = to_json(&artifact).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["metadata"]["generator"], "schemarecon");
        assert_eq!(value["metadata"]["command"], "compare-db-models");
        assert_eq!(value["metadata"]["sources"]["DB"]["origin"], "live");
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["critical"], 1);
        assert_eq!(value["discrepancies"][0]["kind"], "table_only_in_a");
        assert_eq!(value["categories"]["warning"].as_array().unwrap().len(), 1);
        assert!(value.get("integrity").is_none());

        let parsed: ComparisonArtifact = from_json(&bytes).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn introspection_artifact_roundtrip() {
        let snapshot = Snapshot::new(Vocabulary::Native)
            .with_table(
                "media",
                TableShape::new()
                    .with_column(ColumnShape::new("id", "integer", false).with_default("nextval('media_id_seq'::regclass)"))
                    .with_primary_key(["id"]),
            )
            .with_table("secrets", TableShape::failed("permission denied"));
        let metadata = ArtifactMetadata::new("introspect").with_database(Some("media".to_string()));
        let artifact = IntrospectionArtifact::new(metadata, &snapshot);

        let bytes = to_json(&artifact).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["metadata"]["database"], "media");
        assert_eq!(value["schema"]["secrets"]["error"], "permission denied");

        let loaded: IntrospectionArtifact = from_json(&bytes).unwrap();
        assert_eq!(loaded.snapshot(), snapshot);
    }

    #[test]
    fn summary_markdown_sections() {
        let metadata = ArtifactMetadata::new("compare-db-models").with_source("DB", SourceRef::new("live"));
        let dirty = ComparisonArtifact::new(metadata, &comparison());

        let same = Snapshot::new(Vocabulary::Native);
        let clean = ComparisonArtifact::new(
            ArtifactMetadata::new("compare-models-doc"),
            &Comparison::run(&same, &same, SourceLabels::new("Doc", "Model"), &Normalizer::new()),
        );

        let md = markdown_summary(&[dirty, clean], "2026-10-18 12:00:00 UTC");

        assert!(md.starts_with("# Schema Comparison Summary\n\n*Generated: 2026-10-18 12:00:00 UTC*\n\n"));
        assert!(md.contains("## compare-db-models\n"));
        assert!(md.contains("- Sources: DB: live\n"));
        assert!(md.contains("### Critical Issues\n\n- Table 'users' exists in DB but missing from Model\n"));
        assert!(md.contains("### Warnings\n\n- Table 'media': Column 'imdb_rating' nullable mismatch (DB: true, Model: false)\n"));
        assert!(!md.contains("### Info"));

        let clean_section = md.split("## compare-models-doc").nth(1).unwrap();
        assert!(clean_section.contains("*No discrepancies found*"));
        assert_eq!(md.matches("*No discrepancies found*").count(), 1);
    }

    #[test]
    fn filtered_sections_keep_totals() {
        let artifact = ComparisonArtifact::new(ArtifactMetadata::new("compare-db-models"), &comparison())
            .with_sections(&[Severity::Warning]);

        assert!(artifact.categories.critical.is_empty());
        assert_eq!(artifact.categories.warning.len(), 1);
        assert_eq!(artifact.summary.critical, 1);

        let md = markdown_summary(&[artifact], "now");
        assert!(!md.contains("### Critical Issues"));
        assert!(md.contains("### Warnings\n"));
        assert!(md.contains("- Totals: 1 critical, 1 warning, 0 info\n"));
        assert!(!md.contains("*No discrepancies found*"));
    }

    #[test]
    fn summary_as_tables() {
        let mut metadata = ArtifactMetadata::new("compare-db-models");
        metadata.timestamp = "2026-10-18T12:00:00Z".to_string();
        let artifact = ComparisonArtifact::new(metadata, &comparison());

        let md = table_summary(&[artifact], "now");

        assert!(md.contains("| compare-db-models | 2026-10-18T12:00:00Z | 1 | 1 | 0 |\n"));
        assert!(md.contains("## compare-db-models (2026-10-18T12:00:00Z)\n\n| Severity | Issue |\n"));
        let critical = md.find("| critical | Table 'users' exists in DB but missing from Model |").unwrap();
        let warning = md
            .find("| warning | Table 'media': Column 'imdb_rating' nullable mismatch (DB: true, Model: false) |")
            .unwrap();
        assert!(critical < warning);
    }

    #[test]
    fn integrity_is_rendered() {
        let broken = Snapshot::new(Vocabulary::Native).with_table(
            "media",
            TableShape::new()
                .with_column(ColumnShape::new("id", "integer", false))
                .with_primary_key(["uuid"]),
        );
        let comparison = Comparison::run(&broken, &broken, SourceLabels::new("DB", "Doc"), &Normalizer::new());
        let artifact = ComparisonArtifact::new(ArtifactMetadata::new("compare"), &comparison);

        let md = markdown_summary(&[artifact], "now");
        assert!(md.contains("### Integrity\n\n- Table 'media': primary key column 'uuid' is not a column of the table\n"));
    }
}
