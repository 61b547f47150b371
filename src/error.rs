use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PacingError {
    #[error("Invalid split configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Duplicate date in date dimension: {0}")]
    DuplicateDate(NaiveDate),

    #[error("Order count overflow while summing counts for {0}")]
    CountOverflow(NaiveDate),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PacingError>;
