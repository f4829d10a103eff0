use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemarecon_core::Config;

mod commands;

use commands::{CommandStatus, ReportFormat, Section, Session};

const DEFAULT_CONFIG: &str = "schemarecon.toml";

/// SchemaRecon - Reconcile the live database, ORM models and schema docs
#[derive(Parser)]
#[command(name = "schemarecon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemarecon.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the command status as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot the live database catalog
    Introspect {
        /// Tables to introspect (all tables if not specified)
        #[arg(short, long, num_args = 1..)]
        tables: Vec<String>,

        /// Also write the snapshot to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare the database against the ORM models
    CompareDbModels,

    /// Compare the schema documentation against the ORM models
    CompareModelsDoc {
        /// Documentation file (default: doc_path from config)
        #[arg(short, long)]
        doc_path: Option<PathBuf>,
    },

    /// Regenerate the schema documentation from the database
    GenerateDocs {
        /// Output file (default: doc_path from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize all comparison reports
    Report {
        /// Output file (default: a new summary in the reports directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output layout
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Summary)]
        format: ReportFormat,

        /// Severity sections to include, comma separated (default: all)
        #[arg(short, long, value_enum, value_delimiter = ',')]
        sections: Vec<Section>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Introspect { .. } => "introspect",
            Commands::CompareDbModels => "compare-db-models",
            Commands::CompareModelsDoc { .. } => "compare-models-doc",
            Commands::GenerateDocs { .. } => "generate-docs",
            Commands::Report { .. } => "report",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("{} failed to load .env: {}", "Warning:".yellow(), e);
        }
    }

    let name = cli.command.name();
    let status = match run(&cli).await {
        Ok(status) => status,
        Err(e) => CommandStatus::error(name, format!("{:#}", e)),
    };

    if cli.json {
        match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    } else {
        status.print();
    }

    if !status.is_success() {
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<CommandStatus> {
    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    let mut session = Session::new(config)?;

    match &cli.command {
        Commands::Introspect { tables, output } => session.introspect(tables.clone(), output.clone()).await,
        Commands::CompareDbModels => session.compare_db_models().await,
        Commands::CompareModelsDoc { doc_path } => session.compare_models_doc(doc_path.clone()),
        Commands::GenerateDocs { output } => session.generate_docs(output.clone()).await,
        Commands::Report { output, format, sections } => session.report(output.clone(), *format, sections),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(config_path) = path {
        Config::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_introspect_tables() {
        let cli = Cli::try_parse_from(["schemarecon", "introspect", "--tables", "media", "episodes"]).unwrap();
        match cli.command {
            Commands::Introspect { tables, output } => {
                assert_eq!(tables, vec!["media", "episodes"]);
                assert!(output.is_none());
            }
            _ => panic!("expected introspect"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["schemarecon", "report", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.command.name(), "report");
    }

    #[test]
    fn parses_report_options() {
        let cli = Cli::try_parse_from(["schemarecon", "report", "--format", "table", "--sections", "critical,info"]).unwrap();
        match cli.command {
            Commands::Report { output, format, sections } => {
                assert!(output.is_none());
                assert_eq!(format, ReportFormat::Table);
                assert_eq!(sections, vec![Section::Critical, Section::Info]);
            }
            _ => panic!("expected report"),
        }

        assert!(Cli::try_parse_from(["schemarecon", "report", "--sections", "fatal"]).is_err());
    }

    #[test]
    fn explicit_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("schemarecon.toml");
        std::fs::write(&path, "reports_dir = \"out\"\n\n[filters]\nignore_tables = [\"alembic_*\"]\n").unwrap();

        let config = load_config(Some(&path), false).unwrap();
        assert_eq!(config.reports_path(), temp.path().join("out"));
        assert!(config.filters.is_ignored("alembic_version"));
    }
}
