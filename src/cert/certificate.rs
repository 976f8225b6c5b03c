//! Owned X.509 certificate
//!
//! A [`Certificate`] owns one native certificate together with the proxy it
//! was decoded through, so the library stays loaded for as long as the
//! certificate lives. Derived attributes are computed on first access and
//! cached; copies are deep and made explicitly with
//! [`replicate`](Certificate::replicate).

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::debug;
use once_cell::sync::OnceCell;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::chain::CertificateChain;
use super::pem;
use super::purpose::{ExtendedPurposes, Extensions};
use super::time::parse_asn1_time;
use crate::common::fs::read_file;
use crate::common::{Result, TrustError};
use crate::crypto::ffi::{self, X509};
use crate::crypto::{acquire, DigestKind, OpenSslProxy, RawGeneralName};
use crate::validation::cache::ValidationCache;

const PEM_LABEL: &str = "CERTIFICATE";

/// Numbers identities of certificates that cannot be encoded
static UNENCODABLE: AtomicU64 = AtomicU64::new(0);

/// Public key algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyAlgorithm {
    Rsa,
    RsaPss,
    Dsa,
    Dh,
    Ec,
    Ed25519,
    Ed448,
    Other(i32),
}

impl KeyAlgorithm {
    fn from_id(id: i32) -> Self {
        match id {
            ffi::EVP_PKEY_RSA => KeyAlgorithm::Rsa,
            ffi::EVP_PKEY_RSA_PSS => KeyAlgorithm::RsaPss,
            ffi::EVP_PKEY_DSA => KeyAlgorithm::Dsa,
            ffi::EVP_PKEY_DH => KeyAlgorithm::Dh,
            ffi::EVP_PKEY_EC => KeyAlgorithm::Ec,
            ffi::EVP_PKEY_ED25519 => KeyAlgorithm::Ed25519,
            ffi::EVP_PKEY_ED448 => KeyAlgorithm::Ed448,
            other => KeyAlgorithm::Other(other),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "RSA"),
            KeyAlgorithm::RsaPss => write!(f, "RSA-PSS"),
            KeyAlgorithm::Dsa => write!(f, "DSA"),
            KeyAlgorithm::Dh => write!(f, "DH"),
            KeyAlgorithm::Ec => write!(f, "EC"),
            KeyAlgorithm::Ed25519 => write!(f, "Ed25519"),
            KeyAlgorithm::Ed448 => write!(f, "Ed448"),
            KeyAlgorithm::Other(id) => write!(f, "unknown ({})", id),
        }
    }
}

/// Public key summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicKeyInfo {
    pub algorithm: KeyAlgorithm,
    pub bits: i32,
}

/// One subjectAltName entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SubjectAltName {
    Dns(String),
    Email(String),
    Uri(String),
    Ip(IpAddr),
}

impl SubjectAltName {
    fn from_raw(raw: &RawGeneralName) -> Option<Self> {
        let text = || String::from_utf8_lossy(&raw.data).into_owned();
        match raw.kind {
            ffi::GEN_DNS => Some(SubjectAltName::Dns(text())),
            ffi::GEN_EMAIL => Some(SubjectAltName::Email(text())),
            ffi::GEN_URI => Some(SubjectAltName::Uri(text())),
            ffi::GEN_IPADD => match raw.data.len() {
                4 => {
                    let octets: [u8; 4] = raw.data.as_slice().try_into().ok()?;
                    Some(SubjectAltName::Ip(IpAddr::V4(Ipv4Addr::from(octets))))
                }
                16 => {
                    let octets: [u8; 16] = raw.data.as_slice().try_into().ok()?;
                    Some(SubjectAltName::Ip(IpAddr::V6(Ipv6Addr::from(octets))))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for SubjectAltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectAltName::Dns(name) => write!(f, "DNS:{}", name),
            SubjectAltName::Email(email) => write!(f, "email:{}", email),
            SubjectAltName::Uri(uri) => write!(f, "URI:{}", uri),
            SubjectAltName::Ip(ip) => write!(f, "IP:{}", ip),
        }
    }
}

/// Attributes derived from a certificate, computed once
#[derive(Debug, Clone, Serialize)]
pub struct CertificateDetails {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub public_key: Option<PublicKeyInfo>,
    pub signature_algorithm: Option<String>,
    pub extensions: Extensions,
    pub purposes: ExtendedPurposes,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub self_signed: bool,
}

/// An owned native certificate
pub struct Certificate {
    x509: NonNull<X509>,
    proxy: Arc<OpenSslProxy>,
    chain: CertificateChain,
    identity: OnceCell<String>,
    details: OnceCell<CertificateDetails>,
    cache: ValidationCache,
}

// SAFETY: the native object is only read after construction, and the reads
// go through library calls that are safe to issue concurrently.
unsafe impl Send for Certificate {}
unsafe impl Sync for Certificate {}

impl Certificate {
    /// Decode DER through the process-wide proxy
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_der_with(acquire(), der)
    }

    /// Decode DER through a specific proxy
    pub fn from_der_with(proxy: Arc<OpenSslProxy>, der: &[u8]) -> Result<Self> {
        if !proxy.has_crypto_support() {
            return Err(TrustError::Library("No crypto library loaded".to_string()));
        }
        let x509 = proxy.d2i_x509(der);
        // SAFETY: a non-null result is a fresh certificate we now own.
        unsafe { Self::from_raw(proxy, x509) }
            .ok_or_else(|| TrustError::Certificate("Failed to decode DER certificate".to_string()))
    }

    /// Decode the first PEM certificate in `text`
    pub fn from_pem(text: &str) -> Result<Self> {
        Self::from_pem_with(acquire(), text)
    }

    /// [`from_pem`](Self::from_pem) through a specific proxy
    pub fn from_pem_with(proxy: Arc<OpenSslProxy>, text: &str) -> Result<Self> {
        let der = pem::decode_all(PEM_LABEL, text)?
            .into_iter()
            .next()
            .ok_or_else(|| TrustError::Certificate("No PEM certificate found".to_string()))?;
        Self::from_der_with(proxy, &der)
    }

    /// Decode every PEM certificate in `text`
    pub fn from_pem_bundle(text: &str) -> Result<Vec<Self>> {
        Self::from_pem_bundle_with(acquire(), text)
    }

    /// [`from_pem_bundle`](Self::from_pem_bundle) through a specific proxy
    pub fn from_pem_bundle_with(proxy: Arc<OpenSslProxy>, text: &str) -> Result<Vec<Self>> {
        pem::decode_all(PEM_LABEL, text)?
            .iter()
            .map(|der| Self::from_der_with(Arc::clone(&proxy), der))
            .collect()
    }

    /// Decode base64 DER, the form rules store certificates in
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_base64_with(acquire(), encoded)
    }

    /// [`from_base64`](Self::from_base64) through a specific proxy
    pub fn from_base64_with(proxy: Arc<OpenSslProxy>, encoded: &str) -> Result<Self> {
        let der = STANDARD
            .decode(encoded.trim())
            .map_err(|e| TrustError::Certificate(format!("Invalid base64 certificate: {}", e)))?;
        Self::from_der_with(proxy, &der)
    }

    /// Read a PEM or DER certificate file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = read_file(path)?;
        debug!("Loading certificate from {}", path.display());
        match std::str::from_utf8(&bytes) {
            Ok(text) if text.contains("-----BEGIN") => Self::from_pem(text),
            _ => Self::from_der(&bytes),
        }
    }

    /// Take ownership of a native certificate; `None` for null
    ///
    /// # Safety
    ///
    /// `x509` must be null or a certificate allocated by `proxy`'s library
    /// that nothing else frees.
    pub(crate) unsafe fn from_raw(proxy: Arc<OpenSslProxy>, x509: *mut X509) -> Option<Self> {
        let x509 = NonNull::new(x509)?;
        Some(Self {
            x509,
            proxy,
            chain: CertificateChain::new(),
            identity: OnceCell::new(),
            details: OnceCell::new(),
            cache: ValidationCache::new(),
        })
    }

    /// The native certificate, still owned by `self`
    pub(crate) fn as_ptr(&self) -> *mut X509 {
        self.x509.as_ptr()
    }

    /// Proxy the certificate was decoded through
    pub fn proxy(&self) -> &Arc<OpenSslProxy> {
        &self.proxy
    }

    /// Independent deep copy, including the attached chain
    pub fn replicate(&self) -> Result<Self> {
        // SAFETY: `self.x509` is live for the duration of the call.
        let copy = unsafe { self.proxy.x509_dup(self.as_ptr()) };
        // SAFETY: the duplicate is a fresh certificate we now own.
        let mut copy = unsafe { Self::from_raw(Arc::clone(&self.proxy), copy) }
            .ok_or(TrustError::Unsupported("X509_dup"))?;
        copy.chain = self.chain.replicate()?;
        copy.cache = self.cache.clone();
        Ok(copy)
    }

    /// DER encoding
    pub fn to_der(&self) -> Result<Vec<u8>> {
        // SAFETY: `self.x509` is live.
        let der = unsafe { self.proxy.i2d_x509(self.as_ptr()) };
        if der.is_empty() {
            return Err(TrustError::Certificate("Failed to encode certificate".to_string()));
        }
        Ok(der)
    }

    /// PEM encoding
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem::encode(PEM_LABEL, &self.to_der()?))
    }

    /// Base64 DER without armor
    pub fn to_base64(&self) -> Result<String> {
        Ok(STANDARD.encode(self.to_der()?))
    }

    /// Hex SHA-256 of the DER encoding; the key rules are stored under
    ///
    /// A certificate that cannot be encoded gets an `unencodable-<n>` identity
    /// of its own, which no stored rule can match.
    pub fn identity(&self) -> &str {
        self.identity.get_or_init(|| match self.to_der() {
            Ok(der) => hex(&Sha256::digest(&der)),
            Err(e) => {
                let n = UNENCODABLE.fetch_add(1, AtomicOrdering::Relaxed);
                debug!("No DER identity ({}); using unencodable-{}", e, n);
                format!("unencodable-{}", n)
            }
        })
    }

    /// Attributes, computed on first use
    pub fn details(&self) -> &CertificateDetails {
        self.details.get_or_init(|| self.compute_details())
    }

    fn compute_details(&self) -> CertificateDetails {
        let proxy = &self.proxy;
        let x509 = self.as_ptr();

        // SAFETY: `x509` is live for every call below.
        unsafe {
            let not_before = proxy.x509_not_before(x509).and_then(|t| parse_asn1_time(&t));
            let not_after = proxy.x509_not_after(x509).and_then(|t| parse_asn1_time(&t));
            let extensions = Extensions {
                key_usage: proxy.x509_key_usage(x509).unwrap_or(u32::MAX),
                extended_key_usage: proxy.x509_extended_key_usage(x509).unwrap_or(u32::MAX),
            };
            let purposes =
                ExtendedPurposes::probe(|purpose, ca| proxy.x509_check_purpose(x509, purpose.id(), ca) > 0);

            CertificateDetails {
                subject: proxy.x509_subject(x509).unwrap_or_default(),
                issuer: proxy.x509_issuer(x509).unwrap_or_default(),
                serial: proxy.x509_serial_hex(x509).unwrap_or_default(),
                not_before,
                not_after,
                public_key: proxy.x509_public_key(x509).map(|(id, bits)| PublicKeyInfo {
                    algorithm: KeyAlgorithm::from_id(id),
                    bits,
                }),
                signature_algorithm: proxy.x509_signature_algorithm(x509),
                extensions,
                purposes,
                subject_alt_names: proxy
                    .x509_subject_alt_names(x509)
                    .iter()
                    .filter_map(SubjectAltName::from_raw)
                    .collect(),
                self_signed: proxy.x509_check_issued(x509, x509) == ffi::X509_V_OK,
            }
        }
    }

    pub fn subject(&self) -> &str {
        &self.details().subject
    }

    pub fn issuer(&self) -> &str {
        &self.details().issuer
    }

    /// Serial number in upper-case hex
    pub fn serial(&self) -> &str {
        &self.details().serial
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.details().not_before
    }

    pub fn not_after(&self) -> Option<DateTime<Utc>> {
        self.details().not_after
    }

    /// Whether `now` falls inside the validity window
    ///
    /// False when either bound could not be read.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (self.not_before(), self.not_after()) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }

    pub fn public_key(&self) -> Option<PublicKeyInfo> {
        self.details().public_key
    }

    pub fn signature_algorithm(&self) -> Option<&str> {
        self.details().signature_algorithm.as_deref()
    }

    pub fn extensions(&self) -> Extensions {
        self.details().extensions
    }

    pub fn purposes(&self) -> ExtendedPurposes {
        self.details().purposes
    }

    pub fn subject_alt_names(&self) -> &[SubjectAltName] {
        &self.details().subject_alt_names
    }

    /// Whether the certificate names and verifies itself as issuer
    pub fn is_self_signed(&self) -> bool {
        self.details().self_signed
    }

    /// Raw digest of the DER encoding; empty when unavailable
    pub fn digest(&self, kind: DigestKind) -> Vec<u8> {
        // SAFETY: `self.x509` is live.
        unsafe { self.proxy.x509_digest(self.as_ptr(), kind) }
    }

    /// Digest as colon-separated upper-case hex
    pub fn fingerprint(&self, kind: DigestKind) -> String {
        self.digest(kind)
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Untrusted intermediates carried with the certificate
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }

    /// Replace the carried intermediates; cached results are dropped
    pub fn set_chain(&mut self, chain: CertificateChain) {
        self.chain = chain;
        self.cache.clear();
    }

    pub(crate) fn cache(&self) -> &ValidationCache {
        &self.cache
    }
}

impl Drop for Certificate {
    fn drop(&mut self) {
        // SAFETY: we own the certificate and nothing else frees it.
        unsafe { self.proxy.x509_free(self.as_ptr()) }
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        // SAFETY: both certificates are live.
        match unsafe { self.proxy.x509_cmp(self.as_ptr(), other.as_ptr()) } {
            Some(ordering) => ordering == Ordering::Equal,
            None => match (self.to_der(), other.to_der()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("identity", &self.identity())
            .field("chain", &self.chain.depth())
            .finish()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
