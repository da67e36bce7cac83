//! Error types for rusty_prices

use thiserror::Error;

/// Main error type for price store operations
#[derive(Error, Debug)]
pub enum PriceStoreError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Derivation error: {0}")]
    Derivation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for PriceStoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<r2d2::Error> for PriceStoreError {
    fn from(e: r2d2::Error) -> Self {
        Self::Pool(e.to_string())
    }
}

/// Result type alias for price store operations
pub type Result<T> = std::result::Result<T, PriceStoreError>;
