use catalog::{import, Catalog, CatalogConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

/// Catalog CLI: administer the book catalog database from the command line
#[derive(Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    /// Path to a catalog.yaml config file (default: $CATALOG_CONFIG, then ./catalog.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Bulk load authors from a headerless CSV file (first column is the name)
    ImportAuthors {
        /// CSV file to read
        path: PathBuf,
    },

    /// Show database location and record counts
    Status,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CatalogConfig::load(cli.config.as_deref())?;
    log::debug!("Using database {}", config.database.display());
    let catalog = Catalog::open(&config)?;
    let output = execute(&catalog, &config, &cli.command)?;
    print_output(&output, &cli.format)
}

fn execute(
    catalog: &Catalog,
    config: &CatalogConfig,
    command: &Command,
) -> Result<serde_json::Value, catalog::CatalogError> {
    match command {
        Command::ImportAuthors { path } => {
            let ids = import::import_authors_from_path(catalog, path)?;
            Ok(serde_json::json!({ "ok": true, "imported": ids.len() }))
        }
        Command::Status => {
            let mut status = catalog.status()?;
            status["database"] = serde_json::Value::String(config.database.display().to_string());
            Ok(status)
        }
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_import_command() {
        let cli =
            Cli::try_parse_from(["catalog", "--format", "json", "import-authors", "a.csv"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        match cli.command {
            Command::ImportAuthors { path } => assert_eq!(path, PathBuf::from("a.csv")),
            Command::Status => panic!("expected import-authors"),
        }
    }

    #[test]
    fn test_import_requires_path() {
        assert!(Cli::try_parse_from(["catalog", "import-authors"]).is_err());
    }

    #[test]
    fn test_execute_import_then_status() {
        let tmp = TempDir::new().unwrap();
        let csv = tmp.path().join("authors.csv");
        std::fs::write(&csv, "Luciano Ramalho\nDavid Beazley\n").unwrap();

        let catalog = Catalog::open_in_memory().unwrap();
        let config = CatalogConfig {
            database: tmp.path().join("catalog.db"),
            ..CatalogConfig::default()
        };
        let out = execute(&catalog, &config, &Command::ImportAuthors { path: csv }).unwrap();
        assert_eq!(out["imported"], 2);

        let status = execute(&catalog, &config, &Command::Status).unwrap();
        assert_eq!(status["authors"]["count"], 2);
        assert_eq!(status["books"]["count"], 0);
        assert_eq!(
            status["database"],
            tmp.path().join("catalog.db").display().to_string()
        );
    }

    #[test]
    fn test_execute_import_missing_file() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open_in_memory().unwrap();
        let result = execute(
            &catalog,
            &CatalogConfig::default(),
            &Command::ImportAuthors {
                path: tmp.path().join("nope.csv"),
            },
        );
        assert!(result.is_err());
    }
}
