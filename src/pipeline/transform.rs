use crate::constants::{derived_column_name, RATE_CURRENCY_COLUMN, RATE_VALUE_COLUMN};
use crate::error::{EtlError, Result};
use crate::storage::csv_file;
use crate::table::{Table, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Currency code to multiplier applied to the source column.
pub type RateTable = BTreeMap<String, f64>;

/// Read a rate table from a CSV with `Currency` and `Rate` columns.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_rates<P: AsRef<Path>>(path: P) -> Result<RateTable> {
    let table = csv_file::read_table(path)?;
    rates_from_table(&table)
}

pub fn rates_from_table(table: &Table) -> Result<RateTable> {
    let currency_idx = table.require_column(RATE_CURRENCY_COLUMN)?;
    let rate_idx = table.require_column(RATE_VALUE_COLUMN)?;

    let mut rates = RateTable::new();
    for (i, row) in table.rows().iter().enumerate() {
        let code = match &row[currency_idx] {
            Value::Null => continue,
            other => other.to_string(),
        };
        let rate = row[rate_idx].as_f64().ok_or_else(|| EtlError::NonNumeric {
            column: RATE_VALUE_COLUMN.to_string(),
            row: i,
            value: row[rate_idx].to_field(),
        })?;
        rates.insert(code, rate);
    }
    debug!("Loaded {} exchange rates", rates.len());
    Ok(rates)
}

/// Append one `MC_<CODE>_Billion` column per currency, each equal to
/// `source_column * rates[code]`. Null source cells stay null.
///
/// Every currency must be present in `rates`; nothing is modified otherwise.
pub fn transform(
    mut table: Table,
    rates: &RateTable,
    source_column: &str,
    currencies: &[String],
) -> Result<Table> {
    let source_idx = table.require_column(source_column)?;

    let resolved: Vec<(String, f64)> = currencies
        .iter()
        .map(|code| {
            rates
                .get(code)
                .map(|rate| (code.clone(), *rate))
                .ok_or_else(|| EtlError::MissingRate(code.clone()))
        })
        .collect::<Result<_>>()?;

    for (code, rate) in resolved {
        table.derive_column(&derived_column_name(&code), |i, row| {
            match &row[source_idx] {
                Value::Null => Ok(Value::Null),
                value => value
                    .as_f64()
                    .map(|v| Value::Float(v * rate))
                    .ok_or_else(|| EtlError::NonNumeric {
                        column: source_column.to_string(),
                        row: i,
                        value: value.to_field(),
                    }),
            }
        })?;
    }

    info!(
        "Added {} currency columns to {} rows",
        currencies.len(),
        table.num_rows()
    );
    Ok(table)
}
