/// Run constants. Every value here is the default for the matching `Config` field.

pub const DATA_URL: &str = "https://en.wikipedia.org/wiki/List_of_largest_banks";

// Candidate tables carry this class; the wanted one is the third match.
pub const TABLE_CLASS: &str = "wikitable";
pub const TABLE_INDEX: usize = 2;

pub const EXCHANGE_RATE_CSV: &str = "./exchange_rate.csv";
pub const OUTPUT_CSV: &str = "./banks_data.csv";
pub const DB_NAME: &str = "Banks.db";
pub const TABLE_NAME: &str = "Largest_banks";
pub const LOG_FILE: &str = "code_log.txt";

pub const SOURCE_COLUMN: &str = "Market cap(US$ billion)";
pub const TARGET_CURRENCIES: [&str; 3] = ["GBP", "EUR", "INR"];

// Rate table column names
pub const RATE_CURRENCY_COLUMN: &str = "Currency";
pub const RATE_VALUE_COLUMN: &str = "Rate";

/// Rows shown per candidate table while extracting.
pub const PREVIEW_ROWS: usize = 5;

/// Name of the derived column holding `SOURCE_COLUMN` converted to `currency`.
pub fn derived_column_name(currency: &str) -> String {
    format!("MC_{}_Billion", currency)
}
