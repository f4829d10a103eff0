//! Configuration schema (schemarecon.toml)

use crate::types::{CanonicalType, Normalizer};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Schema namespace to introspect
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

fn default_url_env() -> String {
    "DATABASE_URL".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            schema: default_schema(),
            tls: false,
        }
    }
}

/// Where model descriptor modules live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directories (or files) to scan for modules
    #[serde(default = "default_model_paths")]
    pub paths: Vec<PathBuf>,

    /// File name prefix of a module (`models_media.toml`)
    #[serde(default = "default_model_prefix")]
    pub prefix: String,
}

fn default_model_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("models")]
}

fn default_model_prefix() -> String {
    "models_".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            paths: default_model_paths(),
            prefix: default_model_prefix(),
        }
    }
}

/// Type normalization settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypesConfig {
    /// Treat `timestamp without time zone` as equivalent to `timestamptz`
    #[serde(default)]
    pub naive_timestamps_match_tz: bool,

    /// Extra raw token -> canonical tag entries for the shared synonym table
    #[serde(default)]
    pub synonyms: BTreeMap<String, String>,
}

impl TypesConfig {
    /// Build the active normalizer
    pub fn normalizer(&self) -> Result<Normalizer, ConfigError> {
        let mut normalizer = Normalizer::new().with_naive_timestamps_match_tz(self.naive_timestamps_match_tz);

        for (raw, tag) in &self.synonyms {
            let canonical = CanonicalType::from_tag(tag).ok_or_else(|| {
                ConfigError::InvalidValue(format!("unknown canonical type '{}' for synonym '{}'", tag, raw))
            })?;
            normalizer = normalizer.with_synonym(raw, canonical);
        }

        Ok(normalizer)
    }
}

/// Tables excluded from every comparison
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Table name glob patterns (`*`, `?`, `[..]`)
    #[serde(default)]
    pub ignore_tables: Vec<String>,
}

impl FilterRules {
    /// Check if a table matches any ignore pattern
    pub fn is_ignored(&self, table: &str) -> bool {
        self.ignore_tables
            .iter()
            .any(|pattern| Pattern::new(pattern).is_ok_and(|p| p.matches(table)))
    }

    /// Reject patterns that do not compile
    pub fn validate(&self) -> Result<(), ConfigError> {
        for pattern in &self.ignore_tables {
            Pattern::new(pattern)
                .map_err(|e| ConfigError::InvalidValue(format!("ignore_tables pattern '{}': {}", pattern, e)))?;
        }
        Ok(())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding JSON and markdown artifacts
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Canonical schema documentation file
    #[serde(default = "default_doc_path")]
    pub doc_path: PathBuf,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub types: TypesConfig,

    #[serde(default)]
    pub filters: FilterRules,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("docs/schema_reports")
}

fn default_doc_path() -> PathBuf {
    PathBuf::from("docs/database_schema.md")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            doc_path: default_doc_path(),
            database: DatabaseConfig::default(),
            models: ModelsConfig::default(),
            types: TypesConfig::default(),
            filters: FilterRules::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.filters.validate()?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Resolve a path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    pub fn reports_path(&self) -> PathBuf {
        self.resolve(&self.reports_dir)
    }

    pub fn doc_file(&self) -> PathBuf {
        self.resolve(&self.doc_path)
    }

    pub fn model_paths(&self) -> Vec<PathBuf> {
        self.models.paths.iter().map(|p| self.resolve(p)).collect()
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
