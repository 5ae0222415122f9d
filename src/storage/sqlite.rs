use crate::error::Result;
use crate::table::{Table, Value};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info, instrument};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Int(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Text(format!("<{} byte blob>", b.len())),
        }
    }
}

pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    debug!("Opened SQLite database at {}", path.as_ref().display());
    Ok(conn)
}

/// Replace `table_name` with the contents of `table`: drop, create and insert in
/// one transaction. Returns the number of rows inserted.
#[instrument(skip(conn, table))]
pub fn replace_table(conn: &mut Connection, table: &Table, table_name: &str) -> Result<usize> {
    let name = quote_ident(table_name);
    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} {}", quote_ident(c), column_affinity(table, i)))
        .collect();
    let placeholders: Vec<String> = (1..=table.columns().len()).map(|i| format!("?{}", i)).collect();

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} ({});",
        column_defs.join(", ")
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            name,
            placeholders.join(", ")
        ))?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;

    info!("Replaced table {} with {} rows", table_name, table.num_rows());
    Ok(table.num_rows())
}

/// Run a read statement and collect the result set.
#[instrument(skip(conn))]
pub fn query_table(conn: &Connection, sql: &str) -> Result<Table> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut table = Table::new(columns);
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(Value::from(row.get_ref(i)?));
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// INTEGER when every non-null cell is an integer, REAL when every one is
/// numeric, TEXT otherwise (including all-null columns).
fn column_affinity(table: &Table, idx: usize) -> &'static str {
    let mut saw_value = false;
    let mut all_int = true;
    let mut all_numeric = true;
    for row in table.rows() {
        match &row[idx] {
            Value::Null => continue,
            Value::Int(_) => {}
            Value::Float(_) => all_int = false,
            Value::Text(_) => {
                all_int = false;
                all_numeric = false;
            }
        }
        saw_value = true;
    }

    match (saw_value, all_int, all_numeric) {
        (false, _, _) => "TEXT",
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}

/// Double-quoted SQL identifier; embedded quotes are doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The verification statement run after loading, quoted like the table it reads.
pub fn select_all_query(table_name: &str) -> String {
    format!("SELECT * FROM {}", quote_ident(table_name))
}
