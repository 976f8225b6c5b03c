//! Default configuration values
//!
//! Single source of truth for defaults, so the loader, the CLI and the
//! `Default` impls agree.

use std::path::PathBuf;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SSLTRUST";

/// Separator between nested keys in environment overrides
pub const ENV_SEPARATOR: &str = "__";

/// Environment variable naming the configuration file
pub const CONFIG_FILE_ENV: &str = "SSLTRUST_CONFIG";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "cryptodefaults.json";

/// File name looked up inside every configured bundle directory
pub const BUNDLE_FILE_NAME: &str = "ca-bundle.crt";

/// Default log level
pub const LOG_LEVEL_STR: &str = "info";

/// PEM bundles shipped by common distributions, in lookup order
pub const SYSTEM_BUNDLE_FILES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/ssl/cert.pem",
];

/// Default configuration file path
pub fn config_file() -> PathBuf {
    std::env::var_os(CONFIG_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Default bundle file name
pub fn bundle_file_name() -> String {
    BUNDLE_FILE_NAME.to_string()
}

/// Default explicit bundle files
pub fn bundle_files() -> Vec<PathBuf> {
    SYSTEM_BUNDLE_FILES.iter().map(PathBuf::from).collect()
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}
