//! Configuration loading
//!
//! Layers, lowest priority first: built-in defaults, the JSON file, then
//! `SSLTRUST_` environment variables (`SSLTRUST_OPENSSL__PATH`,
//! `SSLTRUST_RULES__STORE_PATH`, ...).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use log::{debug, warn};
use once_cell::sync::OnceCell;

use super::defaults::{self, ENV_PREFIX, ENV_SEPARATOR};
use super::TrustConfig;
use crate::common::{Result, TrustError};

static CONFIG: OnceCell<TrustConfig> = OnceCell::new();

/// Load configuration from `path` (or the default file) plus the environment
///
/// A missing file is not an error; a malformed one is.
pub fn load_config(path: Option<&Path>) -> Result<TrustConfig> {
    let path: PathBuf = path.map(Path::to_path_buf).unwrap_or_else(defaults::config_file);
    debug!("Loading configuration from {}", path.display());

    let settings = Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Json).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR),
        )
        .build()?;

    settings.try_deserialize::<TrustConfig>().map_err(TrustError::from)
}

/// Install the process-wide configuration from `path`
///
/// Only the first initialization wins; later calls return the configuration
/// already in place.
pub fn init_config(path: Option<&Path>) -> Result<&'static TrustConfig> {
    CONFIG.get_or_try_init(|| load_config(path))
}

/// Process-wide configuration, loaded on first use
///
/// Falls back to defaults when the file cannot be parsed.
pub fn global_config() -> &'static TrustConfig {
    CONFIG.get_or_init(|| {
        load_config(None).unwrap_or_else(|e| {
            warn!("Ignoring unusable configuration: {}", e);
            TrustConfig::default()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_load_missing_file_gives_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/cryptodefaults.json"))).unwrap();
        assert_eq!(config, TrustConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "openssl": {{ "path": "/opt/openssl/lib" }},
                "roots": {{ "bundle_dirs": ["/srv/trust/"], "bundle_files": [] }},
                "rules": {{ "store_path": "/var/lib/ssltrust/rules.json" }},
                "log_level": "debug"
            }}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.openssl.path, Some(PathBuf::from("/opt/openssl/lib")));
        assert_eq!(config.roots.bundle_dirs, vec![PathBuf::from("/srv/trust/")]);
        assert!(config.roots.bundle_files.is_empty());
        assert_eq!(config.roots.bundle_file_name, "ca-bundle.crt");
        assert_eq!(config.rules.store_path, Some(PathBuf::from("/var/lib/ssltrust/rules.json")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "openssl": {{ "path": "/from/file" }} }}"#).unwrap();

        std::env::set_var("SSLTRUST_OPENSSL__PATH", "/from/env");
        let config = load_config(Some(file.path()));
        std::env::remove_var("SSLTRUST_OPENSSL__PATH");

        assert_eq!(config.unwrap().openssl.path, Some(PathBuf::from("/from/env")));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(load_config(Some(file.path())), Err(TrustError::Config(_))));
    }
}
