//! Core scanner types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod time;
pub mod camera;

pub use types::*;
pub use error::Error;
pub use config::ScannerConfig;
