//! Certificate chain validation
//!
//! [`ChainValidator`] runs the library verifier once per root source
//! (installed anchors, then each readable bundle) and reports every distinct
//! failure. Results that depend only on the certificate are cached on it.

pub mod cache;
pub mod classify;
pub mod roots;
pub mod validator;

pub use cache::{CacheKey, ValidationCache};
pub use classify::{classify, code_of};
pub use roots::RootStore;
pub use validator::ChainValidator;

use crate::cert::{Certificate, CertificateChain, Purpose, ValidationError};

/// Validate against the process-wide roots
///
/// `chain` supplies untrusted intermediates; when `None` the certificate's own
/// chain is used and the result may come from, and go to, its cache. An empty
/// result means the certificate is trusted for `purpose`.
pub fn validate(
    certificate: &Certificate,
    chain: Option<&CertificateChain>,
    purpose: Purpose,
) -> Vec<ValidationError> {
    ChainValidator::default().validate_with(certificate, chain, None, purpose)
}
