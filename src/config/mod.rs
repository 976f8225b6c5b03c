//! Configuration module
//!
//! Settings that steer library discovery, trust-anchor lookup and rule
//! persistence. Values come from an optional JSON file and `SSLTRUST_`
//! environment overrides; see [`loader`].

mod defaults;
mod loader;

pub use self::defaults::{
    BUNDLE_FILE_NAME, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE, ENV_PREFIX, SYSTEM_BUNDLE_FILES,
};
pub use self::loader::{global_config, init_config, load_config};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Library discovery settings (the `OpenSSL` group)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OpenSslSection {
    /// Directory searched before the built-in candidate list
    pub path: Option<PathBuf>,
}

/// Trust-anchor bundle lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RootsSection {
    /// Directories that may contain `bundle_file_name`, searched in order
    pub bundle_dirs: Vec<PathBuf>,

    /// File name looked up in each of `bundle_dirs`
    pub bundle_file_name: String,

    /// Bundle files tried after `bundle_dirs`
    pub bundle_files: Vec<PathBuf>,
}

impl Default for RootsSection {
    fn default() -> Self {
        Self {
            bundle_dirs: Vec::new(),
            bundle_file_name: defaults::bundle_file_name(),
            bundle_files: defaults::bundle_files(),
        }
    }
}

impl RootsSection {
    /// Every candidate bundle path in lookup order
    pub fn candidate_bundles(&self) -> Vec<PathBuf> {
        self.bundle_dirs
            .iter()
            .map(|dir| dir.join(&self.bundle_file_name))
            .chain(self.bundle_files.iter().cloned())
            .collect()
    }
}

/// Rule persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesSection {
    /// JSON rule database; rules live only in memory when unset
    pub store_path: Option<PathBuf>,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrustConfig {
    /// Library discovery
    pub openssl: OpenSslSection,

    /// Trust anchors
    pub roots: RootsSection,

    /// Rule persistence
    pub rules: RulesSection,

    /// Default log level
    pub log_level: String,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            openssl: OpenSslSection::default(),
            roots: RootsSection::default(),
            rules: RulesSection::default(),
            log_level: defaults::log_level(),
        }
    }
}

/// Log the effective configuration at info level
pub fn log_config(config: &TrustConfig) {
    use log::info;

    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Trust Configuration ===");
    match config.openssl.path {
        Some(ref dir) => info!("  OpenSSL directory: {}", dir.display()),
        None => info!("  OpenSSL directory: <built-in search>"),
    }
    for bundle in config.roots.candidate_bundles() {
        info!("  Root bundle candidate: {}", bundle.display());
    }
    match config.rules.store_path {
        Some(ref path) => info!("  Rule store: {}", path.display()),
        None => info!("  Rule store: <memory>"),
    }
    info!("  Log level: {}", config.log_level);
}
