//! Error types for the scanner

use thiserror::Error;

/// Main error type for the scanner
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Record error: {0}")]
    Record(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}
