//! Error handling for the wallet monitoring system.

use thiserror::Error;

/// Main error type for the wallet monitoring system
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input handed to a scoring function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Alert request rejected at creation time
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Data-related errors (e.g. missing or malformed provider data)
    #[error("Data error: {0}")]
    DataError(String),

    /// Connection / network errors
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Lookup of an unknown alert, token or address
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Request errors
    #[error("Request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the wallet monitoring system
pub type Result<T> = std::result::Result<T, Error>;

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

// Allow automatic conversion from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
