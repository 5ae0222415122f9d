use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Table index {index} out of range: only {found} candidate tables found")]
    TableIndexOutOfRange { index: usize, found: usize },

    #[error("No candidate table has all headers: {headers:?}")]
    NoTableWithHeaders { headers: Vec<String> },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("No exchange rate for currency: {0}")]
    MissingRate(String),

    #[error("Non-numeric value {value:?} in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;
