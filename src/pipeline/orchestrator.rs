use crate::app::ports::PageSource;
use crate::config::Config;
use crate::error::Result;
use crate::logging::ProgressLogger;
use crate::pipeline::{extract, transform, verify};
use crate::storage::{csv_file, sqlite};
use crate::table::Table;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Outcome of one full run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub output_csv: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub query_rows: usize,
}

/// Drives Fetch → Extract → Transform → Write-CSV → Write-DB → Query in order.
/// Any stage error stops the run; stages already completed are not undone.
pub struct EtlPipeline {
    config: Config,
    logger: ProgressLogger,
    source: Box<dyn PageSource>,
}

impl EtlPipeline {
    pub fn new(config: Config, logger: ProgressLogger, source: Box<dyn PageSource>) -> Self {
        Self {
            config,
            logger,
            source,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[instrument(skip(self), fields(url = %self.config.url))]
    pub fn run(&self) -> Result<RunSummary> {
        self.logger
            .log_progress("Preliminaries complete. Initiating ETL process")?;

        let table = self.extract()?;
        let table = self.transform(table)?;
        self.load_to_csv(&table)?;

        self.logger.log_progress("SQL Connection initiated")?;
        let mut conn = sqlite::open(&self.config.db_path)?;
        self.load_to_db(&mut conn, &table)?;
        let result = self.run_query(&conn)?;
        conn.close().map_err(|(_, e)| e)?;
        self.logger.log_progress("Server Connection closed")?;

        let summary = RunSummary {
            rows: table.num_rows(),
            columns: table.columns().to_vec(),
            output_csv: self.config.output_csv.clone(),
            db_path: self.config.db_path.clone(),
            table_name: self.config.table_name.clone(),
            query_rows: result.num_rows(),
        };
        info!(rows = summary.rows, "ETL run finished");
        Ok(summary)
    }

    pub fn extract(&self) -> Result<Table> {
        self.logger.log_progress("Extracting data from URL...")?;
        let table = extract::extract(
            &*self.source,
            &self.config.url,
            &self.config.table_class,
            &self.config.selector(),
        )?;
        self.logger
            .log_progress("Data extraction complete. Initiating Transformation process")?;
        Ok(table)
    }

    pub fn transform(&self, table: Table) -> Result<Table> {
        self.logger.log_progress("Transforming data...")?;
        let rates = transform::load_rates(&self.config.exchange_rate_csv)?;
        let table = transform::transform(
            table,
            &rates,
            &self.config.source_column,
            &self.config.currencies,
        )?;
        self.logger
            .log_progress("Data transformation complete. Initiating Loading process")?;
        Ok(table)
    }

    pub fn load_to_csv(&self, table: &Table) -> Result<()> {
        self.logger.log_progress("Saving data to CSV...")?;
        csv_file::write_table(table, &self.config.output_csv)?;
        self.logger.log_progress("Data saved to CSV file")?;
        Ok(())
    }

    pub fn load_to_db(&self, conn: &mut rusqlite::Connection, table: &Table) -> Result<()> {
        self.logger.log_progress("Loading data to database...")?;
        sqlite::replace_table(conn, table, &self.config.table_name)?;
        self.logger
            .log_progress("Data loaded to Database as a table, Executing queries")?;
        Ok(())
    }

    pub fn run_query(&self, conn: &rusqlite::Connection) -> Result<Table> {
        self.logger.log_progress("Running query on database...")?;
        let result = verify::run_query(conn, &self.config.verification_query())?;
        self.logger.log_progress("Process Complete")?;
        Ok(result)
    }
}
