//! Error types for pointclass

use thiserror::Error;

/// Main error type for pointclass operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for pointclass operations
pub type Result<T> = std::result::Result<T, Error>;
