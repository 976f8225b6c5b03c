//! Certificate model
//!
//! Owned wrappers over native certificates, chains and PKCS containers, plus
//! the purpose and error vocabulary validation is expressed in.

pub mod certificate;
pub mod chain;
pub mod error;
pub mod pem;
pub mod pkcs;
pub mod purpose;
pub mod time;

pub use certificate::{Certificate, CertificateDetails, KeyAlgorithm, PublicKeyInfo, SubjectAltName};
pub use chain::{CertificateChain, NativeStack};
pub use error::{ValidationError, NON_IGNORABLE};
pub use pkcs::{ParsedPkcs12, Pkcs12, Pkcs7};
pub use purpose::{purpose_satisfied_by, ExtendedPurposes, Extensions, Purpose};
