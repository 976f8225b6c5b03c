//! Trust rules
//!
//! A rule records what the user decided about a certificate presented by a
//! host: which validation errors to ignore, whether to reject it outright,
//! and until when the decision holds.

pub mod backend;
pub mod host;
pub mod rule;
pub mod store;

pub use backend::{CertificateEntry, JsonFileBackend, MemoryBackend, RuleBackend, RuleDocument};
pub use host::{normalize_host, specificity, Specificity};
pub use rule::{CertificateRule, HostPolicy};
pub use store::RuleStore;
