//! Common module
//!
//! This module contains shared errors, logging setup and filesystem helpers
//! used throughout the crate.

pub mod error;
pub mod fs;
pub mod log;

// Re-export commonly used types and functions
pub use error::{Result, TrustError};
pub use log::init_logger;
