//! Per-certificate, per-host trust decisions

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::host::normalize_host;
use crate::cert::{Certificate, ValidationError};
use crate::common::Result;

/// The decision stored for one host, without the certificate it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostPolicy {
    /// When the rule lapses; never when unset
    pub expiry: Option<DateTime<Utc>>,
    pub rejected: bool,
    pub permanent: bool,
    pub ignored: BTreeSet<ValidationError>,
}

/// A user decision about a certificate presented by a host
///
/// The host is stored normalized and may be a pattern (`*`, `*.example.com`)
/// or empty for a rule that applies to any host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRule {
    identity: String,
    host: String,
    certificate: String,
    policy: HostPolicy,
}

impl CertificateRule {
    /// Empty rule for `certificate` on `host`
    pub fn new(certificate: &Certificate, host: &str) -> Result<Self> {
        Ok(Self {
            identity: certificate.identity().to_string(),
            host: normalize_host(host),
            certificate: certificate.to_base64()?,
            policy: HostPolicy::default(),
        })
    }

    /// Rule for a certificate known only by its identity
    pub fn for_identity(identity: &str, host: &str) -> Self {
        Self {
            identity: identity.to_string(),
            host: normalize_host(host),
            certificate: String::new(),
            policy: HostPolicy::default(),
        }
    }

    pub(crate) fn from_parts(identity: &str, host: &str, certificate: &str, policy: HostPolicy) -> Self {
        Self {
            identity: identity.to_string(),
            host: host.to_string(),
            certificate: certificate.to_string(),
            policy,
        }
    }

    pub(crate) fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    /// Hex SHA-256 of the certificate's DER encoding
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Base64 DER of the certificate; empty when unknown
    pub fn certificate_base64(&self) -> &str {
        &self.certificate
    }

    /// Decode the stored certificate
    pub fn certificate(&self) -> Result<Certificate> {
        Certificate::from_base64(&self.certificate)
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.policy.expiry
    }

    pub fn set_expiry(&mut self, expiry: Option<DateTime<Utc>>) {
        self.policy.expiry = expiry;
    }

    pub fn is_rejected(&self) -> bool {
        self.policy.rejected
    }

    pub fn set_rejected(&mut self, rejected: bool) {
        self.policy.rejected = rejected;
    }

    pub fn is_permanent(&self) -> bool {
        self.policy.permanent
    }

    pub fn set_permanent(&mut self, permanent: bool) {
        self.policy.permanent = permanent;
    }

    pub fn ignored_errors(&self) -> &BTreeSet<ValidationError> {
        &self.policy.ignored
    }

    /// Replace the ignored set; non-ignorable errors are dropped
    pub fn set_ignored_errors<I>(&mut self, errors: I)
    where
        I: IntoIterator<Item = ValidationError>,
    {
        self.policy.ignored = errors.into_iter().filter(|e| e.is_ignorable()).collect();
    }

    /// Add to the ignored set; non-ignorable errors are dropped
    pub fn add_ignored_errors<I>(&mut self, errors: I)
    where
        I: IntoIterator<Item = ValidationError>,
    {
        self.policy.ignored.extend(errors.into_iter().filter(|e| e.is_ignorable()));
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.policy.expiry, Some(expiry) if expiry <= now)
    }

    /// The rule as it applies at `now`
    ///
    /// A lapsed rule no longer applies, except that a permanent rejection
    /// outlives its expiry without ignoring anything.
    pub fn effective_at(&self, now: DateTime<Utc>) -> Option<CertificateRule> {
        if !self.is_expired_at(now) {
            return Some(self.clone());
        }
        if self.policy.permanent && self.policy.rejected {
            let mut rule = self.clone();
            rule.policy.ignored.clear();
            return Some(rule);
        }
        None
    }

    /// Errors that remain after applying the rule
    ///
    /// Ignored errors are removed unless they are non-ignorable, duplicates
    /// collapse, and a rejected rule always contributes
    /// [`ValidationError::CertificateRejected`].
    pub fn filter_errors(&self, errors: &[ValidationError]) -> Vec<ValidationError> {
        let mut remaining: Vec<ValidationError> = Vec::with_capacity(errors.len() + 1);
        for error in errors {
            let ignored = error.is_ignorable() && self.policy.ignored.contains(error);
            if !ignored && !remaining.contains(error) {
                remaining.push(*error);
            }
        }
        if self.policy.rejected && !remaining.contains(&ValidationError::CertificateRejected) {
            remaining.push(ValidationError::CertificateRejected);
        }
        remaining
    }

    /// Whether nothing is left after filtering
    pub fn is_acceptable(&self, errors: &[ValidationError]) -> bool {
        self.filter_errors(errors).is_empty()
    }
}
