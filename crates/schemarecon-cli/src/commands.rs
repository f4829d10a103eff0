//! Subcommand implementations
//!
//! Every command returns a [`CommandStatus`]; failures inside a command are
//! folded into an error status by the dispatcher rather than aborting.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use schemarecon_catalog::{CatalogAdapter, Introspector, PostgresAdapter, TableSelection};
use schemarecon_core::{Config, Normalizer, Severity, Snapshot, SourceLabels, ViewSnapshot};
use schemarecon_doc::{parse_doc, render_doc, DocHeader};
use schemarecon_engine::{
    markdown_summary, table_summary, to_json, ArtifactKind, ArtifactMetadata, ArtifactStore, Comparison, ComparisonArtifact,
    IntrospectionArtifact, SourceRef,
};
use schemarecon_models::{discover_modules, extract_models, ModelCatalog};

const DOC_TITLE: &str = "Database Schema";
const DOC_NOTE: &str = "> Generated from the live database catalog. Regenerate with `schemarecon generate-docs`.";

/// Layout of the `report` output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Markdown sections per comparison
    #[default]
    Summary,
    /// Markdown tables
    Table,
    /// The selected comparison artifacts as a JSON array
    Json,
}

/// Severity bucket selectable with `report --sections`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Critical,
    Warning,
    Info,
}

impl From<Section> for Severity {
    fn from(section: Section) -> Self {
        match section {
            Section::Critical => Severity::Critical,
            Section::Warning => Severity::Warning,
            Section::Info => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform outcome of one command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandStatus {
    pub status: Status,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl CommandStatus {
    pub fn success(command: &str, output_file: PathBuf) -> Self {
        Self {
            status: Status::Success,
            command: command.to_string(),
            output_file: Some(output_file),
            error: None,
            details: BTreeMap::new(),
        }
    }

    pub fn error(command: &str, error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            command: command.to_string(),
            output_file: None,
            error: Some(error.into()),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Print a colored summary to stdout
    pub fn print(&self) {
        match self.status {
            Status::Success => println!("{} {}", "✓".green().bold(), self.command.bold()),
            Status::Error => println!("{} {}", "✗".red().bold(), self.command.bold()),
        }

        if let Some(path) = &self.output_file {
            println!("  {} {}", "Output:".cyan(), path.display());
        }
        if let Some(error) = &self.error {
            println!("  {} {}", "Error:".red(), error);
        }

        for (key, value) in &self.details {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let rendered = match (key.as_str(), value.as_u64()) {
                ("critical", Some(n)) if n > 0 => rendered.red().bold().to_string(),
                ("warning", Some(n)) if n > 0 => rendered.yellow().to_string(),
                _ => rendered,
            };
            println!("  {}: {}", key, rendered);
        }
    }
}

/// State shared by the commands of one invocation
///
/// The catalog connection is opened on first use so commands that can work
/// from a cached introspection never touch the database.
pub struct Session {
    config: Config,
    store: ArtifactStore,
    normalizer: Normalizer,
    models: ModelCatalog,
    adapter: Option<Box<dyn CatalogAdapter>>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        let normalizer = config.types.normalizer()?;
        let store = ArtifactStore::new(config.reports_path());

        Ok(Self {
            config,
            store,
            normalizer,
            models: ModelCatalog::new(),
            adapter: None,
        })
    }

    /// Use an already-open catalog instead of connecting from configuration
    pub fn with_adapter(mut self, adapter: Box<dyn CatalogAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    async fn adapter(&mut self) -> Result<&dyn CatalogAdapter> {
        if self.adapter.is_none() {
            let adapter = connect(&self.config).await?;
            self.adapter = Some(adapter);
        }
        self.adapter
            .as_deref()
            .ok_or_else(|| anyhow!("No database connection available"))
    }

    async fn introspect_live(&mut self, selection: &TableSelection) -> Result<(Snapshot, Option<String>)> {
        let schema = self.config.database.schema.clone();
        let adapter = self.adapter().await?;
        let snapshot = Introspector::new(adapter, schema)
            .introspect(selection)
            .await
            .context("Database introspection failed")?;
        Ok((snapshot, adapter.database().map(str::to_string)))
    }

    /// Latest cached introspection, or a live one when none is cached
    async fn database_snapshot(&mut self) -> Result<(Snapshot, SourceRef)> {
        if let Some(path) = self.store.latest(ArtifactKind::Introspect)? {
            tracing::info!(path = %path.display(), "using cached introspection");
            let artifact: IntrospectionArtifact = self.store.load(&path)?;
            let snapshot = artifact.snapshot();
            let source = SourceRef::new(path.display().to_string()).with_fingerprint(&snapshot);
            return Ok((snapshot, source));
        }

        tracing::info!("no cached introspection found, introspecting live database");
        let (snapshot, _) = self.introspect_live(&TableSelection::All).await?;
        let source = SourceRef::new("live").with_fingerprint(&snapshot);
        Ok((snapshot, source))
    }

    fn model_snapshot(&mut self) -> (Snapshot, SourceRef, usize) {
        let modules = discover_modules(&self.config.model_paths(), &self.config.models.prefix);
        let extraction = extract_models(&mut self.models, &modules);

        let origin = self
            .config
            .models
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let source = SourceRef::new(origin)
            .with_files(modules.iter().map(|m| m.display().to_string()))
            .with_fingerprint(&extraction.snapshot);

        (extraction.snapshot, source, extraction.warnings.len())
    }

    fn without_ignored(&self, snapshot: &Snapshot) -> Snapshot {
        snapshot.filtered(|table| !self.config.filters.is_ignored(table))
    }

    /// `introspect`: write a snapshot of the live catalog
    pub async fn introspect(&mut self, tables: Vec<String>, output: Option<PathBuf>) -> Result<CommandStatus> {
        let command = ArtifactKind::Introspect.command();
        let selection = TableSelection::from_names(tables);

        let (snapshot, database) = self.introspect_live(&selection).await?;
        let failed = snapshot.tables.values().filter(|t| t.is_failed()).count();

        let metadata = ArtifactMetadata::new(command)
            .with_source("DB", SourceRef::new("live").with_fingerprint(&snapshot))
            .with_database(database);
        let bytes = to_json(&IntrospectionArtifact::new(metadata, &snapshot))?;
        let path = self.store.write_new(ArtifactKind::Introspect, &bytes)?;

        if let Some(output) = output {
            let output = self.config.resolve(&output);
            write_file(&output, &bytes)?;
            tracing::info!(path = %output.display(), "copied introspection artifact");
        }

        Ok(CommandStatus::success(command, path)
            .with_detail("tables_processed", snapshot.len())
            .with_detail("tables_failed", failed))
    }

    /// `compare-db-models`: live (or cached) catalog against the model definitions
    pub async fn compare_db_models(&mut self) -> Result<CommandStatus> {
        let (db, db_source) = self.database_snapshot().await?;
        let (models, model_source, warnings) = self.model_snapshot();

        let comparison = Comparison::run(
            &self.without_ignored(&db),
            &self.without_ignored(&models),
            SourceLabels::new("DB", "Model"),
            &self.normalizer,
        );

        let metadata = ArtifactMetadata::new(ArtifactKind::CompareDbModels.command())
            .with_source("DB", db_source)
            .with_source("Model", model_source);

        self.write_comparison(ArtifactKind::CompareDbModels, metadata, &comparison, warnings)
    }

    /// `compare-models-doc`: the documentation file against the model definitions
    pub fn compare_models_doc(&mut self, doc_path: Option<PathBuf>) -> Result<CommandStatus> {
        let doc_path = match doc_path {
            Some(path) => self.config.resolve(&path),
            None => self.config.doc_file(),
        };
        let text = fs::read_to_string(&doc_path)
            .with_context(|| format!("Failed to read documentation file {}", doc_path.display()))?;

        let doc = parse_doc(&text);
        let (models, model_source, warnings) = self.model_snapshot();

        let comparison = Comparison::run(
            &self.without_ignored(&doc.schema),
            &self.without_ignored(&models),
            SourceLabels::new("Doc", "Model"),
            &self.normalizer,
        );

        let metadata = ArtifactMetadata::new(ArtifactKind::CompareModelsDoc.command())
            .with_source(
                "Doc",
                SourceRef::new(doc_path.display().to_string()).with_fingerprint(&doc.schema),
            )
            .with_source("Model", model_source);

        self.write_comparison(ArtifactKind::CompareModelsDoc, metadata, &comparison, warnings)
    }

    fn write_comparison(
        &self,
        kind: ArtifactKind,
        metadata: ArtifactMetadata,
        comparison: &Comparison,
        model_warnings: usize,
    ) -> Result<CommandStatus> {
        let artifact = ComparisonArtifact::new(metadata, comparison);
        let path = self.store.write_new(kind, &to_json(&artifact)?)?;

        let discrepancies = &comparison.discrepancies;
        let mut status = CommandStatus::success(kind.command(), path)
            .with_detail("total", discrepancies.len())
            .with_detail("critical", discrepancies.count(Severity::Critical))
            .with_detail("warning", discrepancies.count(Severity::Warning))
            .with_detail("info", discrepancies.count(Severity::Info));

        if !comparison.integrity.is_empty() {
            status = status.with_detail("integrity_issues", comparison.integrity.len());
        }
        if model_warnings > 0 {
            status = status.with_detail("model_load_warnings", model_warnings);
        }
        Ok(status)
    }

    /// `generate-docs`: render the catalog as documentation markdown
    ///
    /// Views documented in the existing file are carried over, since the
    /// catalog introspection only covers tables.
    pub async fn generate_docs(&mut self, output: Option<PathBuf>) -> Result<CommandStatus> {
        let output = match output {
            Some(path) => self.config.resolve(&path),
            None => self.config.doc_file(),
        };

        let views = match fs::read_to_string(&output) {
            Ok(existing) => parse_doc(&existing).views,
            Err(_) => ViewSnapshot::new(),
        };

        let (db, _) = self.database_snapshot().await?;
        let db = self.without_ignored(&db);

        let header = DocHeader::new(DOC_TITLE)
            .with_generated_at(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .with_note(DOC_NOTE);
        let markdown = render_doc(&db, &views, Some(&header));
        write_file(&output, markdown.as_bytes())?;

        Ok(CommandStatus::success("generate-docs", output)
            .with_detail("tables_processed", db.len())
            .with_detail("views", views.views.len()))
    }

    /// `report`: summarize every comparison artifact in the reports directory
    pub fn report(&self, output: Option<PathBuf>, format: ReportFormat, sections: &[Section]) -> Result<CommandStatus> {
        let mut artifacts = Vec::new();
        for kind in ArtifactKind::COMPARISONS {
            for path in self.store.list(kind)? {
                match self.store.load::<ComparisonArtifact>(&path) {
                    Ok(artifact) => artifacts.push(artifact),
                    Err(e) => tracing::warn!(error = %e, "skipping unreadable comparison report"),
                }
            }
        }

        if artifacts.is_empty() {
            return Ok(CommandStatus::error(
                ArtifactKind::Summary.command(),
                "No comparison reports found to summarize.",
            ));
        }

        artifacts.sort_by(|a, b| a.metadata.timestamp.cmp(&b.metadata.timestamp));

        let severities: Vec<Severity> = if sections.is_empty() {
            Severity::ALL.to_vec()
        } else {
            sections.iter().map(|&s| Severity::from(s)).collect()
        };
        let artifacts: Vec<ComparisonArtifact> =
            artifacts.into_iter().map(|a| a.with_sections(&severities)).collect();

        let generated_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let (contents, extension) = match format {
            ReportFormat::Summary => (markdown_summary(&artifacts, &generated_at).into_bytes(), "md"),
            ReportFormat::Table => (table_summary(&artifacts, &generated_at).into_bytes(), "md"),
            ReportFormat::Json => (to_json(&artifacts)?, "json"),
        };

        let path = match output {
            Some(path) => {
                let path = self.config.resolve(&path);
                write_file(&path, &contents)?;
                path
            }
            None => self.store.write_new_as(ArtifactKind::Summary, extension, &contents)?,
        };

        let sections: Vec<&str> = severities.iter().map(|s| s.as_str()).collect();
        Ok(CommandStatus::success(ArtifactKind::Summary.command(), path)
            .with_detail("reports", artifacts.len())
            .with_detail("sections", sections.join(",")))
    }
}

/// Open the configured database catalog
async fn connect(config: &Config) -> Result<Box<dyn CatalogAdapter>> {
    let url = std::env::var(&config.database.url_env).map_err(|_| {
        anyhow!(
            "Environment variable {} is not set. Add it to the environment or a .env file.",
            config.database.url_env
        )
    })?;

    let adapter = PostgresAdapter::connect(&url, config.database.tls).await?;
    tracing::info!(host = adapter.host(), port = adapter.port(), "connected to database");
    Ok(Box::new(adapter))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
