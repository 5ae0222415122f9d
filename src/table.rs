use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{EtlError, Result};

// Wikipedia-style footnote markers: "[1]", "[a]", "[note 3]"
static FOOTNOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static THOUSANDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d+)?$").unwrap());
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap());

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl Value {
    /// Infer a typed value from scraped cell text, dropping footnote markers.
    pub fn parse_cell(raw: &str) -> Value {
        Value::infer(&clean_text(raw))
    }

    /// Infer a typed value from a plain field: integer, float, text, or null when empty.
    pub fn infer(field: &str) -> Value {
        let text = field.trim().to_string();
        if text.is_empty() {
            return Value::Null;
        }

        let numeric = if THOUSANDS_RE.is_match(&text) {
            text.replace(',', "")
        } else {
            text.clone()
        };

        if NUMBER_RE.is_match(&numeric) {
            if let Ok(i) = numeric.parse::<i64>() {
                return Value::Int(i);
            }
            if let Ok(f) = numeric.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Text(text)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text written to a delimited file; nulls become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Text(s) => f.write_str(s),
            Value::Null => f.write_str("NaN"),
        }
    }
}

/// Floats always carry a decimal point so they read back as floats.
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Trim, drop footnote markers, and collapse inner whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = FOOTNOTE_RE.replace_all(raw, "");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Rows of cells under named columns. Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Add a row, padding with nulls or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()))
    }

    pub fn has_columns<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.column_index(n.as_ref()).is_some())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Append a column computed from each existing row. Row count and order are
    /// left untouched; on error the table is not modified.
    pub fn derive_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &[Value]) -> Result<Value>,
    {
        let values = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| f(i, row))
            .collect::<Result<Vec<_>>>()?;

        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

impl fmt::Display for Table {
    /// Aligned text layout with a leading row index column.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "Empty table\nColumns: []\nIndex: []");
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect();

        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                cells
                    .iter()
                    .map(|r| r[c].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (name, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$}", name, w = *w)?;
        }
        for (i, row) in cells.iter().enumerate() {
            write!(f, "\n{:<index_width$}", i)?;
            for (cell, w) in row.iter().zip(&widths) {
                write!(f, "  {:>w$}", cell, w = *w)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_inference() {
        assert_eq!(Value::parse_cell(" 1 "), Value::Int(1));
        assert_eq!(Value::parse_cell("432.92"), Value::Float(432.92));
        assert_eq!(Value::parse_cell("1,234.5"), Value::Float(1234.5));
        assert_eq!(Value::parse_cell("12,000"), Value::Int(12000));
        assert_eq!(
            Value::parse_cell("JPMorgan Chase[1]"),
            Value::Text("JPMorgan Chase".to_string())
        );
        assert_eq!(Value::parse_cell("  "), Value::Null);
        // Not a thousands pattern, so stays text
        assert_eq!(Value::parse_cell("1,2"), Value::Text("1,2".to_string()));
        assert_eq!(Value::parse_cell("nan"), Value::Text("nan".to_string()));
    }

    #[test]
    fn test_float_formatting_keeps_decimal_point() {
        assert_eq!(format_float(80.0), "80.0");
        assert_eq!(format_float(93.5), "93.5");
        assert_eq!(format_float(-2.0), "-2.0");
    }

    #[test]
    fn test_push_row_normalizes_width() {
        let mut table = Table::new(vec!["a".into(), "b".into()]);
        table.push_row(vec![Value::Int(1)]);
        table.push_row(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(table.rows()[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(table.rows()[1], vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_derive_column_failure_leaves_table_unchanged() {
        let mut table = Table::new(vec!["a".into()]);
        table.push_row(vec![Value::Int(1)]);
        table.push_row(vec![Value::Int(2)]);
        let before = table.clone();

        let err = table.derive_column("b", |i, _| {
            if i == 1 {
                Err(EtlError::MissingRate("XXX".into()))
            } else {
                Ok(Value::Int(0))
            }
        });
        assert!(err.is_err());
        assert_eq!(table, before);
    }

    #[test]
    fn test_display_layout() {
        let mut table = Table::new(vec!["Name".into(), "Cap".into()]);
        table.push_row(vec![Value::Text("X".into()), Value::Float(100.0)]);
        table.push_row(vec![Value::Text("Long".into()), Value::Null]);

        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "   Name    Cap");
        assert_eq!(lines[1], "0     X  100.0");
        assert_eq!(lines[2], "1  Long    NaN");
    }
}
