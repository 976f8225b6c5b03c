//! Rule database
//!
//! Every mutation runs as one read-modify-write under the store lock: the
//! change is applied to a copy, persisted, and only then made visible.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::backend::{CertificateEntry, JsonFileBackend, MemoryBackend, RuleBackend, RuleDocument};
use super::host::{normalize_host, specificity};
use super::rule::CertificateRule;
use crate::cert::{Certificate, ValidationError};
use crate::common::Result;
use crate::config::{global_config, RulesSection};

static GLOBAL: Lazy<RuleStore> = Lazy::new(|| {
    RuleStore::from_config(&global_config().rules).unwrap_or_else(|e| {
        warn!("Rule database unavailable, keeping rules in memory: {}", e);
        RuleStore::in_memory()
    })
});

/// Certificate rules keyed by certificate identity and host
pub struct RuleStore {
    document: Mutex<RuleDocument>,
    backend: Box<dyn RuleBackend>,
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("certificates", &self.document.lock().certificates.len())
            .finish()
    }
}

impl RuleStore {
    /// Store over `backend`, loading what it holds
    pub fn new(backend: Box<dyn RuleBackend>) -> Result<Self> {
        let document = backend.load()?;
        Ok(Self {
            document: Mutex::new(document),
            backend,
        })
    }

    /// Store that forgets its rules when dropped
    pub fn in_memory() -> Self {
        Self {
            document: Mutex::new(RuleDocument::default()),
            backend: Box::new(MemoryBackend::new()),
        }
    }

    /// Store backed by a JSON file
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::new(Box::new(JsonFileBackend::new(path)))
    }

    /// Store as configured: a JSON file when `store_path` is set, memory
    /// otherwise
    pub fn from_config(rules: &RulesSection) -> Result<Self> {
        match rules.store_path {
            Some(ref path) => {
                info!("Using rule database {}", path.display());
                Self::open(path.clone())
            }
            None => Ok(Self::in_memory()),
        }
    }

    /// Process-wide store built from the global configuration
    pub fn global() -> &'static RuleStore {
        &GLOBAL
    }

    /// Best rule for `certificate` on `host`, now
    ///
    /// `None` means no live rule covers the pair: nothing is ignored and
    /// nothing is rejected, so only an empty error list passes (see
    /// [`is_acceptable`](Self::is_acceptable)).
    pub fn rule(&self, certificate: &Certificate, host: &str) -> Option<CertificateRule> {
        self.rule_at(certificate, host, Utc::now())
    }

    /// Best rule for `certificate` on `host` at `now`
    ///
    /// Exact host rules beat wildcard rules, which beat a rule without a
    /// host. Lapsed rules are skipped.
    pub fn rule_at(&self, certificate: &Certificate, host: &str, now: DateTime<Utc>) -> Option<CertificateRule> {
        self.rule_for_identity_at(certificate.identity(), host, now)
    }

    /// [`rule_at`](Self::rule_at) by certificate identity
    pub fn rule_for_identity_at(&self, identity: &str, host: &str, now: DateTime<Utc>) -> Option<CertificateRule> {
        let host = normalize_host(host);
        let document = self.document.lock();
        let entry = document.certificates.get(identity)?;

        entry
            .hosts
            .iter()
            .filter_map(|(pattern, policy)| {
                let strength = specificity(pattern, &host)?;
                let rule = CertificateRule::from_parts(identity, pattern, &entry.certificate, policy.clone());
                rule.effective_at(now).map(|rule| (strength, rule))
            })
            .max_by_key(|(strength, _)| *strength)
            .map(|(_, rule)| rule)
    }

    /// Insert or replace the rule for its certificate and host
    pub fn set_rule(&self, rule: CertificateRule) -> Result<()> {
        let mut policy = rule.policy().clone();
        policy.ignored.retain(|e| e.is_ignorable());

        self.update(|document| {
            let entry = document
                .certificates
                .entry(rule.identity().to_string())
                .or_insert_with(CertificateEntry::default);
            if !rule.certificate_base64().is_empty() {
                entry.certificate = rule.certificate_base64().to_string();
            }
            entry.hosts.insert(rule.host().to_string(), policy);
        })?;

        info!(
            "Stored rule for {} on '{}'{}",
            rule.identity(),
            rule.host(),
            if rule.is_rejected() { " (rejected)" } else { "" }
        );
        Ok(())
    }

    /// Remove the rule for `certificate` on exactly `host`; returns whether
    /// one existed
    pub fn clear_rule(&self, certificate: &Certificate, host: &str) -> Result<bool> {
        self.clear_rule_for_identity(certificate.identity(), host)
    }

    /// [`clear_rule`](Self::clear_rule) by certificate identity
    pub fn clear_rule_for_identity(&self, identity: &str, host: &str) -> Result<bool> {
        let host = normalize_host(host);
        let removed = self.update(|document| {
            let Some(entry) = document.certificates.get_mut(identity) else {
                return false;
            };
            let removed = entry.hosts.remove(&host).is_some();
            if entry.hosts.is_empty() {
                document.certificates.remove(identity);
            }
            removed
        })?;

        if removed {
            info!("Cleared rule for {} on '{}'", identity, host);
        }
        Ok(removed)
    }

    /// Add `errors` to the ignored set of the rule for `certificate` on
    /// `host`, creating the rule if needed
    pub fn merge_ignored_errors(
        &self,
        certificate: &Certificate,
        host: &str,
        errors: &[ValidationError],
    ) -> Result<CertificateRule> {
        let mut template = CertificateRule::new(certificate, host)?;
        template.add_ignored_errors(errors.iter().copied());
        let identity = template.identity().to_string();
        let host = template.host().to_string();

        let policy = self.update(|document| {
            let entry = document
                .certificates
                .entry(identity.clone())
                .or_insert_with(CertificateEntry::default);
            entry.certificate = template.certificate_base64().to_string();
            let policy = entry.hosts.entry(host.clone()).or_default();
            policy.ignored.extend(template.ignored_errors().iter().copied());
            policy.clone()
        })?;

        debug!("Rule for {} on '{}' now ignores {:?}", identity, host, policy.ignored);
        Ok(CertificateRule::from_parts(
            &identity,
            &host,
            template.certificate_base64(),
            policy,
        ))
    }

    /// Whether any rule mentions `certificate`
    pub fn seen_certificate(&self, certificate: &Certificate) -> bool {
        self.document.lock().certificates.contains_key(certificate.identity())
    }

    /// Whether any rule for `certificate` is permanent
    pub fn is_permanent(&self, certificate: &Certificate) -> bool {
        self.document
            .lock()
            .certificates
            .get(certificate.identity())
            .map_or(false, |entry| entry.hosts.values().any(|policy| policy.permanent))
    }

    /// Every stored rule for `certificate`, lapsed or not
    pub fn rules_for(&self, certificate: &Certificate) -> Vec<CertificateRule> {
        self.rules_for_identity(certificate.identity())
    }

    /// [`rules_for`](Self::rules_for) by certificate identity
    pub fn rules_for_identity(&self, identity: &str) -> Vec<CertificateRule> {
        let document = self.document.lock();
        let Some(entry) = document.certificates.get(identity) else {
            return Vec::new();
        };
        entry
            .hosts
            .iter()
            .map(|(host, policy)| CertificateRule::from_parts(identity, host, &entry.certificate, policy.clone()))
            .collect()
    }

    /// Whether `errors` for `certificate` on `host` are all covered by the
    /// applicable rule
    ///
    /// Without a rule only an empty error list is acceptable.
    pub fn is_acceptable(&self, certificate: &Certificate, host: &str, errors: &[ValidationError]) -> bool {
        match self.rule(certificate, host) {
            Some(rule) => rule.is_acceptable(errors),
            None => errors.is_empty(),
        }
    }

    /// Identities that have rules
    pub fn identities(&self) -> Vec<String> {
        self.document.lock().certificates.keys().cloned().collect()
    }

    /// Number of stored rules
    pub fn len(&self) -> usize {
        self.document
            .lock()
            .certificates
            .values()
            .map(|entry| entry.hosts.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop rules that no longer apply at `now`; returns how many went
    pub fn compact(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self.update(|document| {
            let mut removed = 0;
            for (identity, entry) in document.certificates.iter_mut() {
                let before = entry.hosts.len();
                entry.hosts.retain(|host, policy| {
                    CertificateRule::from_parts(identity, host, "", policy.clone())
                        .effective_at(now)
                        .is_some()
                });
                removed += before - entry.hosts.len();
            }
            document.certificates.retain(|_, entry| !entry.hosts.is_empty());
            removed
        })?;

        if removed > 0 {
            info!("Removed {} lapsed rules", removed);
        }
        Ok(removed)
    }

    fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut RuleDocument) -> T,
    {
        let mut document = self.document.lock();
        let mut next = document.clone();
        let result = change(&mut next);
        if next != *document {
            self.backend.save(&next)?;
            *document = next;
        }
        Ok(result)
    }
}
