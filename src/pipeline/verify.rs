use crate::error::Result;
use crate::storage::sqlite;
use crate::table::Table;
use rusqlite::Connection;
use tracing::info;

/// Run `query` against the store and print the result set to stdout.
///
/// The result is handed back for callers that want it; the pipeline only displays it.
pub fn run_query(conn: &Connection, query: &str) -> Result<Table> {
    let result = sqlite::query_table(conn, query)?;
    info!("Query returned {} rows", result.num_rows());
    println!("{}", query);
    println!("{}", result);
    Ok(result)
}
