use anyhow::{Context, Result};
use banks_etl::config::Config;
use banks_etl::infra::http_client::ReqwestPageSource;
use banks_etl::logging::{self, ProgressLogger};
use banks_etl::pipeline::{verify, EtlPipeline};
use banks_etl::storage::{csv_file, sqlite};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "banks_etl")]
#[command(about = "Largest banks by market capitalization: extract, convert, load")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file (defaults are used when it is absent)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extract-transform-load pipeline (default)
    Run,
    /// Run a query against the loaded database and print the result
    Query {
        /// SQL to run; defaults to selecting the whole loaded table
        sql: Option<String>,
    },
    /// Print the rows of the output CSV
    Show,
}

fn show_output_rows(config: &Config) -> Result<()> {
    let rows = csv_file::read_rows(&config.output_csv)
        .with_context(|| format!("reading {}", config.output_csv.display()))?;
    println!("{:?}", rows);
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let logger = ProgressLogger::new(&config.log_file);
            let pipeline = EtlPipeline::new(
                config.clone(),
                logger,
                Box::new(ReqwestPageSource::new()?),
            );
            let summary = pipeline.run()?;
            info!(
                "Loaded {} rows into {} ({}) and {}",
                summary.rows,
                summary.table_name,
                summary.db_path.display(),
                summary.output_csv.display()
            );

            show_output_rows(&config)?;
        }
        Commands::Query { sql } => {
            let conn = sqlite::open(&config.db_path)?;
            let sql = sql.unwrap_or_else(|| config.verification_query());
            verify::run_query(&conn, &sql)?;
        }
        Commands::Show => show_output_rows(&config)?,
    }
    Ok(())
}
