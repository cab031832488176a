use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("No header row found")]
    MissingHeaders,

    #[error("CSV needs a header row and at least one data row")]
    NoDataRows,

    #[error("Line {line}: too few fields (expected {expected}, got {actual})")]
    ShortRow {
        line: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Spreadsheet request failed with status {0}")]
    Fetch(u16),

    #[error("No data found in spreadsheet")]
    NoData,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("No dataset loaded. Run `leadstats load <file>` or `leadstats fetch` first.")]
    NoDataset,

    #[error("No date column detected; set one with `leadstats config set date_column <name>`")]
    NoDateColumn,

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Invalid month (expected YYYY-MM): {0}")]
    InvalidMonth(String),

    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("Snapshot too large to store ({size} bytes, limit {limit})")]
    SnapshotTooLarge { size: usize, limit: usize },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LeadError>;
