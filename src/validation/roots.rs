//! Trust anchors
//!
//! A [`RootStore`] combines certificates installed at runtime with PEM bundle
//! files found on disk. Bundles are discovered once, on first use, under the
//! store's own lock.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::cert::Certificate;
use crate::common::fs::{is_readable, read_file};
use crate::common::{Result, TrustError};
use crate::config::{global_config, RootsSection};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

static GLOBAL: Lazy<RootStore> = Lazy::new(|| RootStore::new(&global_config().roots));

/// Trusted roots for chain validation
#[derive(Debug)]
pub struct RootStore {
    id: u64,
    generation: AtomicU64,
    anchors: RwLock<Vec<Certificate>>,
    candidates: Vec<PathBuf>,
    scanned: AtomicBool,
    bundles: Mutex<Vec<PathBuf>>,
    scans: AtomicUsize,
}

impl RootStore {
    /// Store over the configured bundle candidates
    pub fn new(roots: &RootsSection) -> Self {
        Self::with_bundles(roots.candidate_bundles())
    }

    /// Store over explicit bundle candidates, tried in order
    pub fn with_bundles(candidates: Vec<PathBuf>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            generation: AtomicU64::new(0),
            anchors: RwLock::new(Vec::new()),
            candidates,
            scanned: AtomicBool::new(false),
            bundles: Mutex::new(Vec::new()),
            scans: AtomicUsize::new(0),
        }
    }

    /// Store with no bundles and no anchors
    pub fn empty() -> Self {
        Self::with_bundles(Vec::new())
    }

    /// Process-wide store built from the global configuration
    pub fn global() -> &'static RootStore {
        &GLOBAL
    }

    /// Distinguishes stores in cached validation results
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bumped whenever the set of roots changes
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Trust `certificate` in addition to the bundles
    pub fn add_anchor(&self, certificate: Certificate) {
        info!("Installing trust anchor {}", certificate.subject());
        self.anchors.write().push(certificate);
        self.bump();
    }

    /// Trust every certificate in a PEM bundle; returns how many were added
    pub fn add_anchors_from_pem(&self, text: &str) -> Result<usize> {
        let certificates = Certificate::from_pem_bundle(text)?;
        let count = certificates.len();
        if count > 0 {
            self.anchors.write().extend(certificates);
            self.bump();
            info!("Installed {} trust anchors", count);
        }
        Ok(count)
    }

    /// [`add_anchors_from_pem`](Self::add_anchors_from_pem) for a file
    pub fn add_anchors_from_file(&self, path: &Path) -> Result<usize> {
        let bytes = read_file(path)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| TrustError::Certificate(format!("{} is not PEM: {}", path.display(), e)))?;
        self.add_anchors_from_pem(text)
    }

    /// Forget every installed anchor
    pub fn clear_anchors(&self) {
        let mut anchors = self.anchors.write();
        if !anchors.is_empty() {
            anchors.clear();
            self.bump();
        }
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.read().len()
    }

    /// Installed anchors, read-locked for as long as the guard lives
    pub fn anchors(&self) -> RwLockReadGuard<'_, Vec<Certificate>> {
        self.anchors.read()
    }

    /// Every configured bundle path, readable or not
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Readable bundle files in lookup order, discovered on first call
    pub fn bundles(&self) -> Vec<PathBuf> {
        if self.scanned.load(Ordering::Acquire) {
            return self.bundles.lock().clone();
        }

        let mut bundles = self.bundles.lock();
        if !self.scanned.load(Ordering::Acquire) {
            *bundles = self.scan();
            self.scanned.store(true, Ordering::Release);
        }
        bundles.clone()
    }

    /// Discard discovered bundles so the next lookup scans again
    pub fn rescan(&self) {
        let mut bundles = self.bundles.lock();
        bundles.clear();
        self.scanned.store(false, Ordering::Release);
        self.bump();
    }

    /// How many times the bundle candidates have been scanned
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    fn scan(&self) -> Vec<PathBuf> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let found: Vec<PathBuf> = self
            .candidates
            .iter()
            .filter(|path| {
                let readable = is_readable(path);
                debug!(
                    "Root bundle {}: {}",
                    path.display(),
                    if readable { "found" } else { "not readable" }
                );
                readable
            })
            .cloned()
            .collect();
        debug!("Found {} of {} root bundles", found.len(), self.candidates.len());
        found
    }
}
