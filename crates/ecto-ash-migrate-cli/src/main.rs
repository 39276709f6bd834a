//! ecto-ash-migrate CLI - Generate Ash resources from a PostgreSQL catalog.

use clap::Parser;
use ecto_ash_migrate::{Config, GenerationSummary, Generator, MigrateError, PgCatalog};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecto-ash-migrate")]
#[command(about = "Generate an Ash resource for a table from the live PostgreSQL catalog")]
#[command(version)]
struct Cli {
    /// Table to generate a resource for
    table: String,

    /// Directory for the generated file [default: generator.output_dir]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Legacy Ecto schema file to mine for associations and validations
    #[arg(short, long)]
    legacy_schema: Option<PathBuf>,

    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Connection URL; replaces the config file's connection settings
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Override database schema
    #[arg(long)]
    schema: Option<String>,

    /// Override resource module namespace
    #[arg(long)]
    namespace: Option<String>,

    /// Print the generated resource instead of writing it
    #[arg(long)]
    stdout: bool,

    /// Output JSON summary to stdout
    #[arg(long, conflicts_with = "stdout")]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = load_config(&cli)?;
    if let Some(schema) = &cli.schema {
        config.database.schema = schema.clone();
    }
    if let Some(namespace) = &cli.namespace {
        config.generator.namespace = namespace.clone();
    }
    config.validate()?;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| config.generator.output_dir.clone());

    info!("Connecting to {}", config.database.endpoint());
    let catalog = PgCatalog::connect(&config.database).await?;
    let generator = Generator::new(catalog, config)?;

    let generation = generator
        .generate_into(&cli.table, cli.legacy_schema.as_deref(), &output_dir)
        .await?;

    if cli.stdout {
        print!("{}", generation.source);
        print_summary(&mut std::io::stderr(), &generation.summary, false)?;
        return Ok(());
    }

    generation.write().await?;

    if cli.output_json {
        println!("{}", generation.summary.to_json()?);
    } else {
        print_summary(&mut std::io::stdout(), &generation.summary, true)?;
    }

    Ok(())
}

/// Resolve configuration from the URL flag, the config file, or both.
///
/// A file combined with a URL is validated by the caller once the URL is in place.
fn load_config(cli: &Cli) -> Result<Config, MigrateError> {
    match &cli.database_url {
        Some(url) if cli.config.exists() => {
            let mut config = Config::read(&cli.config)?;
            config.database.url = Some(url.clone());
            info!("Loaded configuration from {:?} (connection from URL)", cli.config);
            Ok(config)
        }
        Some(url) => Config::from_url(url),
        None => {
            let config = Config::load(&cli.config)?;
            info!("Loaded configuration from {:?}", cli.config);
            Ok(config)
        }
    }
}

fn print_summary(
    out: &mut impl Write,
    summary: &GenerationSummary,
    written: bool,
) -> Result<(), MigrateError> {
    writeln!(out, "\nGenerated {} for table {}", summary.module, summary.table)?;
    if written {
        writeln!(out, "  Output: {}", summary.output_path.display())?;
    }
    writeln!(out, "  Columns: {}", summary.columns)?;
    writeln!(out, "  Primary key: [{}]", summary.primary_key.join(", "))?;
    writeln!(
        out,
        "  Foreign keys: {} (reverse: {})",
        summary.foreign_keys, summary.reverse_foreign_keys
    )?;
    writeln!(out, "  Unique constraints: {}", summary.unique_constraints)?;
    writeln!(out, "  Enum columns: {}", summary.enum_columns)?;
    writeln!(
        out,
        "  Relationships: {} resolved, {} unresolved",
        summary.resolved_relationships, summary.unresolved_relationships
    )?;

    if let Some(legacy) = &summary.legacy {
        writeln!(
            out,
            "  Legacy schema: {}",
            legacy.module.as_deref().unwrap_or("(none)")
        )?;
        writeln!(out, "    Virtual fields: {}", legacy.virtual_fields)?;
        writeln!(out, "    Associations: {}", legacy.associations)?;
        let validations: Vec<_> = legacy
            .validations
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        writeln!(
            out,
            "    Validations: {}",
            if validations.is_empty() {
                "none".to_string()
            } else {
                validations.join(", ")
            }
        )?;
        if !legacy.changeset_functions.is_empty() {
            writeln!(out, "    Changesets: {}", legacy.changeset_functions.join(", "))?;
        }
    }

    if !summary.diagnostics.is_empty() {
        writeln!(out, "  Diagnostics ({}):", summary.diagnostics.len())?;
        for diagnostic in &summary.diagnostics {
            writeln!(out, "    - {}", diagnostic)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout carries only the artifact or summary.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
