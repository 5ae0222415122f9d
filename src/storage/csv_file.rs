use crate::error::Result;
use crate::table::{Table, Value};
use std::path::Path;
use tracing::{debug, instrument};

/// Write `table` as CSV with a header row, replacing any existing file.
/// Nulls become empty fields; no index column is written.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::to_field))?;
    }
    writer.flush()?;
    debug!("Wrote {} rows", table.num_rows());
    Ok(())
}

/// Read a CSV with a header row into a [`Table`], inferring cell types.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(Value::infer).collect());
    }
    Ok(table)
}

/// Raw string records of a CSV, header row excluded.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(rows)
}
