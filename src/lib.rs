//! OpenSSL Trust Proxy: Runtime-Resolved OpenSSL with Certificate Trust Rules
//!
//! This library locates the system's OpenSSL at runtime, binds the entry
//! points it needs, and builds certificate handling on top of them: an owned
//! certificate model, chain validation against trusted roots, and per-host
//! rules recording which validation errors a user chose to accept.
//!
//! When no OpenSSL can be found nothing fails hard; validation reports
//! [`ValidationError::NoSsl`] and decoding returns an error.
//!
//! # Main Features
//!
//! - Library discovery over per-platform directory and file name tables
//! - Table-driven symbol binding tolerant of OpenSSL 1.0, 1.1 and 3.x naming
//! - Multi-error chain validation with per-certificate result caching
//! - Host rules with wildcard matching, expiry and JSON persistence
//!
//! # Example
//!
//! ```no_run
//! use openssl_trust_proxy::{validate, Certificate, Purpose, RuleStore, Result};
//!
//! fn main() -> Result<()> {
//!     let pem = std::fs::read_to_string("server.pem")?;
//!     let certificate = Certificate::from_pem(&pem)?;
//!
//!     // Validate against the configured root bundles
//!     let errors = validate(&certificate, None, Purpose::SslServer);
//!
//!     // Apply whatever the user decided earlier for this host
//!     let accepted = RuleStore::global().is_acceptable(&certificate, "www.example.com", &errors);
//!     println!("{}: {:?} (accepted: {})", certificate.subject(), errors, accepted);
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod cert;
pub mod common;
pub mod config;
pub mod crypto;
pub mod rules;
pub mod validation;

// Re-export commonly used structures and functions for convenience
pub use cert::{Certificate, CertificateChain, Purpose, ValidationError};
pub use common::{Result, TrustError};
pub use crypto::{acquire, release, OpenSslProxy};
pub use rules::{CertificateRule, RuleStore};
pub use validation::{validate, ChainValidator, RootStore};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
