//! Error handling module
//!
//! This module defines the error types and result type aliases used by the
//! fallible parts of the crate. Facade calls never produce these errors; they
//! report unavailability through sentinel values, and the typed wrappers built
//! on top of them translate those sentinels into `TrustError`.

use std::io;

use thiserror::Error;

/// Error type for loading, decoding, persistence and configuration failures
#[derive(Error, Debug)]
pub enum TrustError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The crypto or protocol library is not loaded
    #[error("Library error: {0}")]
    Library(String),

    /// The loaded library does not export the symbol an operation needs
    #[error("Unsupported operation: {0} is not available in the loaded library")]
    Unsupported(&'static str),

    /// Certificate decode or encode failure
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// PKCS#7 or PKCS#12 failure
    #[error("PKCS error: {0}")]
    Pkcs(String),

    /// Rule store backend failure
    #[error("Rule store error: {0}")]
    Persistence(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<config::ConfigError> for TrustError {
    fn from(err: config::ConfigError) -> Self {
        TrustError::Config(err.to_string())
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `TrustError`.
pub type Result<T> = std::result::Result<T, TrustError>;
