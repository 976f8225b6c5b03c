//! Library verification codes to [`ValidationError`]

use std::os::raw::c_int;

use crate::cert::ValidationError;

/// `X509_V_*` codes with a dedicated variant
const CODES: &[(c_int, ValidationError)] = &[
    (0, ValidationError::Ok),
    (2, ValidationError::GetIssuerCertFailed),
    (3, ValidationError::GetCrlFailed),
    (4, ValidationError::DecryptCertificateSignatureFailed),
    (5, ValidationError::DecryptCrlSignatureFailed),
    (6, ValidationError::DecodeIssuerPublicKeyFailed),
    (7, ValidationError::CertificateSignatureFailed),
    (8, ValidationError::CrlSignatureFailed),
    (9, ValidationError::CertificateNotYetValid),
    (10, ValidationError::CertificateHasExpired),
    (11, ValidationError::CrlNotYetValid),
    (12, ValidationError::CrlHasExpired),
    (13, ValidationError::CertificateFieldNotBeforeErroneous),
    (14, ValidationError::CertificateFieldNotAfterErroneous),
    (15, ValidationError::CrlFieldLastUpdateErroneous),
    (16, ValidationError::CrlFieldNextUpdateErroneous),
    (17, ValidationError::OutOfMemory),
    (18, ValidationError::SelfSigned),
    (19, ValidationError::SelfSignedInChain),
    (20, ValidationError::GetIssuerCertLocallyFailed),
    (21, ValidationError::VerifyLeafSignatureFailed),
    (22, ValidationError::CertificateChainTooLong),
    (23, ValidationError::CertificateRevoked),
    (24, ValidationError::InvalidCa),
    (25, ValidationError::PathLengthExceeded),
    (26, ValidationError::InvalidPurpose),
    (27, ValidationError::CertificateUntrusted),
    (28, ValidationError::CertificateRejected),
    (29, ValidationError::IssuerSubjectMismatched),
    (30, ValidationError::AuthAndSubjectKeyIdMismatched),
    (31, ValidationError::AuthAndSubjectKeyIdAndNameMismatched),
    (32, ValidationError::KeyMayNotSignCertificate),
    (50, ValidationError::ApplicationVerificationFailed),
    (62, ValidationError::InvalidHost),
];

/// Map a verification code; anything unlisted is [`ValidationError::Unknown`]
pub fn classify(code: c_int) -> ValidationError {
    CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, error)| *error)
        .unwrap_or(ValidationError::Unknown)
}

/// The library code for `error`, if it has one
pub fn code_of(error: ValidationError) -> Option<c_int> {
    CODES.iter().find(|(_, e)| *e == error).map(|(c, _)| *c)
}
