//! Rule persistence
//!
//! On disk the database is one JSON object: certificate identity to the
//! certificate's base64 DER and a map of host to [`HostPolicy`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::rule::HostPolicy;
use crate::common::fs::write_atomic;
use crate::common::{Result, TrustError};

/// Current on-disk format
pub const DOCUMENT_VERSION: u32 = 1;

/// Rules stored for one certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateEntry {
    /// Base64 DER
    pub certificate: String,
    pub hosts: BTreeMap<String, HostPolicy>,
}

/// The whole rule database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDocument {
    pub version: u32,
    pub certificates: BTreeMap<String, CertificateEntry>,
}

impl Default for RuleDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            certificates: BTreeMap::new(),
        }
    }
}

/// Where a [`RuleStore`](super::RuleStore) keeps its rules
#[cfg_attr(test, mockall::automock)]
pub trait RuleBackend: Send + Sync {
    /// The stored database; empty if nothing was stored yet
    fn load(&self) -> Result<RuleDocument>;

    /// Replace the stored database
    fn save(&self, document: &RuleDocument) -> Result<()>;
}

/// Keeps rules for the life of the process only
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<RuleDocument>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleBackend for MemoryBackend {
    fn load(&self) -> Result<RuleDocument> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &RuleDocument) -> Result<()> {
        *self.document.lock() = document.clone();
        Ok(())
    }
}

/// JSON file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleBackend for JsonFileBackend {
    fn load(&self) -> Result<RuleDocument> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No rule database at {}", self.path.display());
                return Ok(RuleDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        let document: RuleDocument = serde_json::from_slice(&bytes)?;
        if document.version > DOCUMENT_VERSION {
            return Err(TrustError::Persistence(format!(
                "{} uses rule format {}, newer than {}",
                self.path.display(),
                document.version,
                DOCUMENT_VERSION
            )));
        }
        debug!(
            "Loaded rules for {} certificates from {}",
            document.certificates.len(),
            self.path.display()
        );
        Ok(document)
    }

    fn save(&self, document: &RuleDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::ValidationError;
    use tempfile::tempdir;

    fn sample() -> RuleDocument {
        let mut policy = HostPolicy::default();
        policy.ignored.insert(ValidationError::SelfSigned);

        let mut entry = CertificateEntry {
            certificate: "MAA=".to_string(),
            ..Default::default()
        };
        entry.hosts.insert("example.com".to_string(), policy);

        let mut document = RuleDocument::default();
        document.certificates.insert("ab12".to_string(), entry);
        document
    }

    #[test]
    fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.load().unwrap(), RuleDocument::default());

        backend.save(&sample()).unwrap();
        assert_eq!(backend.load().unwrap(), sample());
    }

    #[test]
    fn test_json_backend_missing_file() {
        let dir = tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("rules.json"));
        assert_eq!(backend.load().unwrap(), RuleDocument::default());
    }

    #[test]
    fn test_json_backend_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rules.json");

        JsonFileBackend::new(&path).save(&sample()).unwrap();
        let loaded = JsonFileBackend::new(&path).load().unwrap();
        assert_eq!(loaded, sample());

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"SelfSigned\""));
        assert!(text.contains("\"example.com\""));
    }

    #[test]
    fn test_json_backend_rejects_garbage_and_newer_formats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");

        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(JsonFileBackend::new(&path).load(), Err(TrustError::Json(_))));

        std::fs::write(&path, r#"{"version": 99, "certificates": {}}"#).unwrap();
        assert!(matches!(JsonFileBackend::new(&path).load(), Err(TrustError::Persistence(_))));
    }
}
