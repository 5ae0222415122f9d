use crate::constants;
use crate::error::{EtlError, Result};
use crate::pipeline::extract::TableSelector;
use crate::storage::sqlite;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run configuration. Every key is optional in `config.toml`; absent keys fall
/// back to the values in `constants`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub table_class: String,
    pub table_index: usize,
    /// When set, the extractor picks the first table whose header contains all
    /// of these names instead of going by position.
    pub table_headers: Option<Vec<String>>,
    pub exchange_rate_csv: PathBuf,
    pub output_csv: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
    pub source_column: String,
    pub currencies: Vec<String>,
    pub log_file: PathBuf,
    pub query: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: constants::DATA_URL.to_string(),
            table_class: constants::TABLE_CLASS.to_string(),
            table_index: constants::TABLE_INDEX,
            table_headers: None,
            exchange_rate_csv: PathBuf::from(constants::EXCHANGE_RATE_CSV),
            output_csv: PathBuf::from(constants::OUTPUT_CSV),
            db_path: PathBuf::from(constants::DB_NAME),
            table_name: constants::TABLE_NAME.to_string(),
            source_column: constants::SOURCE_COLUMN.to_string(),
            currencies: constants::TARGET_CURRENCIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            log_file: PathBuf::from(constants::LOG_FILE),
            query: None,
        }
    }
}

impl Config {
    /// Load from `path`, or return the defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(EtlError::Config("table_name must not be empty".to_string()));
        }
        if self.table_name.contains('"') {
            return Err(EtlError::Config(format!(
                "table_name may not contain quotes: {}",
                self.table_name
            )));
        }
        if self.table_class.is_empty() || self.table_class.chars().any(char::is_whitespace) {
            return Err(EtlError::Config(format!(
                "table_class must be a single class name: {:?}",
                self.table_class
            )));
        }
        if self.currencies.is_empty() {
            return Err(EtlError::Config(
                "currencies must list at least one code".to_string(),
            ));
        }
        if matches!(&self.table_headers, Some(h) if h.is_empty()) {
            return Err(EtlError::Config(
                "table_headers must not be an empty list".to_string(),
            ));
        }
        Ok(())
    }

    pub fn selector(&self) -> TableSelector {
        match &self.table_headers {
            Some(headers) => TableSelector::Headers(headers.clone()),
            None => TableSelector::Position(self.table_index),
        }
    }

    pub fn verification_query(&self) -> String {
        self.query
            .clone()
            .unwrap_or_else(|| sqlite::select_all_query(&self.table_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.table_index, 2);
        assert_eq!(config.table_name, "Largest_banks");
        assert_eq!(config.currencies, vec!["GBP", "EUR", "INR"]);
        assert_eq!(config.verification_query(), "SELECT * FROM \"Largest_banks\"");
        assert_eq!(config.selector(), TableSelector::Position(2));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            table_name = "Banks"
            table_headers = ["Bank name", "Market cap(US$ billion)"]
            "#,
        )
        .unwrap();

        assert_eq!(config.table_name, "Banks");
        assert_eq!(config.db_path, PathBuf::from("Banks.db"));
        assert_eq!(config.verification_query(), "SELECT * FROM \"Banks\"");
        assert_eq!(
            config.selector(),
            TableSelector::Headers(vec![
                "Bank name".to_string(),
                "Market cap(US$ billion)".to_string()
            ])
        );
    }

    #[test]
    fn test_rejects_empty_currency_list() {
        let err = Config::from_toml_str("currencies = []").unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_rejects_table_class_with_whitespace() {
        let err = Config::from_toml_str(r#"table_class = "wiki table""#).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));

        let err = Config::from_toml_str(r#"table_class = """#).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_table_name_with_space_is_quoted_in_query() {
        let config = Config::from_toml_str(r#"table_name = "Largest banks""#).unwrap();
        assert_eq!(
            config.verification_query(),
            "SELECT * FROM \"Largest banks\""
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.url, constants::DATA_URL);
    }
}
