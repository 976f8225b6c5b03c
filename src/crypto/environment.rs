//! Environment checks and diagnostics for the runtime-loaded library

use std::env;

use super::proxy::{acquire, OpenSslProxy, VERIFY_SYMBOLS};
use super::symbols::Symbol;

/// Environment issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Informational issue
    Info,

    /// Warning issue
    Warning,

    /// Error issue
    Error,
}

/// Environment issue with message, severity and resolution
#[derive(Debug, Clone)]
pub struct EnvironmentIssue {
    /// Issue message
    pub message: String,

    /// Issue severity
    pub severity: IssueSeverity,

    /// Suggested resolution
    pub resolution: Option<String>,
}

/// What the proxy found when it probed the system
#[derive(Debug, Clone)]
pub struct EnvironmentInfo {
    /// Where the crypto library was loaded from
    pub crypto_library: Option<String>,

    /// Where the protocol library was loaded from
    pub ssl_library: Option<String>,

    /// Library version banner
    pub version: Option<String>,

    /// Number of bound symbols
    pub resolved_symbols: usize,

    /// Symbols no loaded library exports
    pub missing_symbols: Vec<&'static str>,

    /// Initializers that ran
    pub initializers: Vec<&'static str>,

    /// Relevant environment variables
    pub environment_variables: Vec<(String, String)>,

    /// Environment issues
    pub issues: Vec<EnvironmentIssue>,
}

impl EnvironmentInfo {
    /// Whether any issue is an error
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }
}

/// Check the process-wide proxy
pub fn check_environment() -> EnvironmentInfo {
    inspect_proxy(&acquire())
}

/// Diagnose environment issues and return suggested resolutions
pub fn diagnose_environment() -> Vec<EnvironmentIssue> {
    check_environment().issues
}

/// Build the report for a given proxy
pub fn inspect_proxy(proxy: &OpenSslProxy) -> EnvironmentInfo {
    let missing_symbols: Vec<&'static str> = proxy
        .symbols()
        .missing()
        .into_iter()
        .map(Symbol::name)
        .collect();

    EnvironmentInfo {
        crypto_library: proxy.crypto_origin().map(str::to_string),
        ssl_library: proxy.ssl_origin().map(str::to_string),
        version: proxy.version(),
        resolved_symbols: proxy.symbols().resolved_count(),
        issues: detect_issues(proxy, &missing_symbols),
        missing_symbols,
        initializers: proxy.initializers().to_vec(),
        environment_variables: get_environment_variables(),
    }
}

fn get_environment_variables() -> Vec<(String, String)> {
    let mut variables = Vec::new();

    for var in &[
        "SSLTRUST_CONFIG",
        "SSLTRUST_OPENSSL__PATH",
        "OPENSSL_CONF",
        "LD_LIBRARY_PATH",
        "DYLD_LIBRARY_PATH",
    ] {
        if let Ok(value) = env::var(var) {
            variables.push((var.to_string(), value));
        }
    }

    variables
}

fn detect_issues(proxy: &OpenSslProxy, missing: &[&'static str]) -> Vec<EnvironmentIssue> {
    let mut issues = Vec::new();

    if !proxy.has_crypto_support() {
        issues.push(EnvironmentIssue {
            message: "No crypto library could be loaded; certificate validation reports NoSsl".to_string(),
            severity: IssueSeverity::Error,
            resolution: Some(
                "Install OpenSSL or point the openssl.path setting at the directory holding libcrypto".to_string(),
            ),
        });
        return issues;
    }

    if !proxy.has_protocol_support() {
        issues.push(EnvironmentIssue {
            message: "No protocol library could be loaded; cipher enumeration is unavailable".to_string(),
            severity: IssueSeverity::Warning,
            resolution: Some("Install libssl next to libcrypto".to_string()),
        });
    }

    if !proxy.supports_verification() {
        let needed: Vec<&str> = VERIFY_SYMBOLS
            .iter()
            .filter(|s| proxy.symbols().get(**s).is_none())
            .map(|s| s.name())
            .collect();
        issues.push(EnvironmentIssue {
            message: format!("Chain verification unavailable, missing: {}", needed.join(", ")),
            severity: IssueSeverity::Error,
            resolution: Some("Use an OpenSSL release from 1.0.2 onwards".to_string()),
        });
    }

    if !missing.is_empty() {
        issues.push(EnvironmentIssue {
            message: format!("{} symbols are not exported: {}", missing.len(), missing.join(", ")),
            severity: IssueSeverity::Info,
            resolution: None,
        });
    }

    issues
}
