/// Error types for the RDA core types
use thiserror::Error;

/// Main error type for reading, configuring and locating reanalysis data
#[derive(Error, Debug)]
pub enum Era5Error {
    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to read or write a stream
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or write JSON
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Variable configuration could not be parsed
    #[error("Failed to parse variable configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Variable configuration parsed but is inconsistent
    #[error("Invalid variable configuration: {0}")]
    InvalidConfig(String),

    /// IANA zone name not known to the timezone database
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// No timezone polygon covers the coordinate
    #[error("No timezone found for latitude {latitude}, longitude {longitude}")]
    TimezoneLookup { latitude: f64, longitude: f64 },

    /// Timestamp could not be parsed
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

/// Type alias for Results using Era5Error
pub type Result<T> = std::result::Result<T, Era5Error>;
