//! Validation outcome taxonomy

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::TrustError;

macro_rules! validation_errors {
    ($($variant:ident => $text:literal,)+) => {
        /// Why a certificate did not validate
        ///
        /// `Ok` only appears as the projection of an empty error list in the
        /// single-result API; the validator itself reports failures only.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum ValidationError {
            $($variant,)+
        }

        impl ValidationError {
            /// Every variant in declaration order
            pub const ALL: &'static [ValidationError] = &[$(ValidationError::$variant,)+];

            /// Variant name, as used in persisted rules
            pub fn name(self) -> &'static str {
                match self {
                    $(ValidationError::$variant => stringify!($variant),)+
                }
            }

            /// Human-readable explanation
            pub fn description(self) -> &'static str {
                match self {
                    $(ValidationError::$variant => $text,)+
                }
            }
        }
    };
}

validation_errors! {
    Ok => "The certificate is valid.",
    Unknown => "The certificate is invalid for an unknown reason.",
    NoSsl => "No usable OpenSSL library was found, so the certificate could not be checked.",
    NoCaRoot => "No trusted root certificates are available.",
    ErrorReadingRoot => "The trusted root certificates could not be read.",
    GetIssuerCertFailed => "The issuer certificate could not be found.",
    GetCrlFailed => "The issuer's certificate revocation list could not be found.",
    DecryptCertificateSignatureFailed => "The certificate's signature could not be decrypted.",
    DecryptCrlSignatureFailed => "The revocation list's signature could not be decrypted.",
    DecodeIssuerPublicKeyFailed => "The issuer's public key could not be decoded.",
    CertificateSignatureFailed => "The certificate's signature is invalid.",
    CrlSignatureFailed => "The revocation list's signature is invalid.",
    CertificateNotYetValid => "The certificate is not valid yet.",
    CertificateHasExpired => "The certificate has expired.",
    CrlNotYetValid => "The revocation list is not valid yet.",
    CrlHasExpired => "The revocation list has expired.",
    CertificateFieldNotBeforeErroneous => "The certificate's notBefore field is malformed.",
    CertificateFieldNotAfterErroneous => "The certificate's notAfter field is malformed.",
    CrlFieldLastUpdateErroneous => "The revocation list's lastUpdate field is malformed.",
    CrlFieldNextUpdateErroneous => "The revocation list's nextUpdate field is malformed.",
    OutOfMemory => "OpenSSL ran out of memory.",
    SelfSigned => "The certificate is self-signed and not in the list of trusted certificates.",
    SelfSignedInChain => "The trust chain ends in a self-signed certificate that is not trusted.",
    GetIssuerCertLocallyFailed => "The issuer certificate is not available locally; the trust chain is broken.",
    VerifyLeafSignatureFailed => "The certificate is the only one in its chain and is not self-signed.",
    CertificateChainTooLong => "The certificate chain is longer than the maximum depth.",
    CertificateRevoked => "The certificate has been revoked.",
    InvalidCa => "The issuing certificate authority is invalid.",
    PathLengthExceeded => "The trust chain exceeds a path length constraint of one of its authorities.",
    InvalidPurpose => "The certificate may not be used for this purpose.",
    CertificateUntrusted => "The root authority is not trusted for this purpose.",
    CertificateRejected => "The certificate has been marked as rejected.",
    IssuerSubjectMismatched => "The issuer name does not match the authority's subject.",
    AuthAndSubjectKeyIdMismatched => "The authority key identifier does not match the issuer's key.",
    AuthAndSubjectKeyIdAndNameMismatched => "The authority key identifier and name do not match the issuer.",
    KeyMayNotSignCertificate => "The issuer's key may not sign certificates.",
    ApplicationVerificationFailed => "Application-level verification failed.",
    Irrelevant => "The given authority does not take part in the certificate's trust chain.",
    InvalidHost => "The certificate does not match the host name.",
    PrivateKeyFailed => "The private key could not be used.",
}

/// Errors no rule may ignore
pub const NON_IGNORABLE: &[ValidationError] = &[
    ValidationError::NoSsl,
    ValidationError::CertificateRevoked,
    ValidationError::CertificateRejected,
    ValidationError::CertificateSignatureFailed,
    ValidationError::DecryptCertificateSignatureFailed,
];

impl ValidationError {
    /// Whether a rule may suppress this error
    pub fn is_ignorable(self) -> bool {
        !NON_IGNORABLE.contains(&self)
    }

    /// Whether the error describes the host environment rather than the
    /// certificate, which makes it unsuitable for caching
    pub fn is_environmental(self) -> bool {
        matches!(
            self,
            ValidationError::NoSsl
                | ValidationError::NoCaRoot
                | ValidationError::ErrorReadingRoot
                | ValidationError::InvalidCa
                | ValidationError::GetIssuerCertFailed
                | ValidationError::GetIssuerCertLocallyFailed
                | ValidationError::DecodeIssuerPublicKeyFailed
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ValidationError {
    type Err = TrustError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ValidationError::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TrustError::Certificate(format!("Unknown validation error: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for error in ValidationError::ALL {
            assert_eq!(error.name().parse::<ValidationError>().unwrap(), *error);
            assert!(!error.description().is_empty());
        }
        assert_eq!("selfsigned".parse::<ValidationError>().unwrap(), ValidationError::SelfSigned);
        assert!("NotAnError".parse::<ValidationError>().is_err());
    }

    #[test]
    fn test_non_ignorable() {
        assert!(!ValidationError::CertificateRevoked.is_ignorable());
        assert!(!ValidationError::NoSsl.is_ignorable());
        assert!(ValidationError::SelfSigned.is_ignorable());
        assert!(ValidationError::CertificateHasExpired.is_ignorable());
    }

    #[test]
    fn test_environmental_errors() {
        assert!(ValidationError::NoCaRoot.is_environmental());
        assert!(ValidationError::InvalidCa.is_environmental());
        assert!(!ValidationError::SelfSigned.is_environmental());
        assert!(!ValidationError::CertificateHasExpired.is_environmental());
    }

    #[test]
    fn test_serializes_by_name() {
        let json = serde_json::to_string(&ValidationError::SelfSignedInChain).unwrap();
        assert_eq!(json, "\"SelfSignedInChain\"");
        let back: ValidationError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ValidationError::SelfSignedInChain);
    }
}
