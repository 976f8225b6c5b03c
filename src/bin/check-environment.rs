//! Tool to check the OpenSSL environment certificate validation depends on

use std::process::exit;

use openssl_trust_proxy::common::init_logger;
use openssl_trust_proxy::config::global_config;
use openssl_trust_proxy::crypto::{check_environment, IssueSeverity};
use openssl_trust_proxy::validation::RootStore;

fn main() {
    init_logger(&global_config().log_level);

    println!("=== OpenSSL Trust Proxy Environment Check ===\n");

    let env_info = check_environment();

    println!(
        "Crypto library: {}",
        env_info.crypto_library.as_deref().unwrap_or("not found")
    );
    println!(
        "Protocol library: {}",
        env_info.ssl_library.as_deref().unwrap_or("not found")
    );
    println!("OpenSSL version: {}", env_info.version.as_deref().unwrap_or("unknown"));
    println!(
        "Resolved symbols: {} ({} missing)",
        env_info.resolved_symbols,
        env_info.missing_symbols.len()
    );

    if !env_info.initializers.is_empty() {
        println!("\nInitializers run:");
        for name in &env_info.initializers {
            println!("  - {}", name);
        }
    }

    if !env_info.environment_variables.is_empty() {
        println!("\nEnvironment variables:");
        for (name, value) in &env_info.environment_variables {
            println!("  {}={}", name, value);
        }
    }

    let roots = RootStore::global();
    let bundles = roots.bundles();
    println!("\nRoot bundles:");
    for candidate in roots.candidates() {
        let state = if bundles.contains(candidate) { "found" } else { "missing" };
        println!("  [{:7}] {}", state, candidate.display());
    }

    if !env_info.issues.is_empty() {
        println!("\nEnvironment issues:");

        for issue in &env_info.issues {
            let prefix = match issue.severity {
                IssueSeverity::Info => "INFO",
                IssueSeverity::Warning => "WARNING",
                IssueSeverity::Error => "ERROR",
            };

            println!("  [{:7}] {}", prefix, issue.message);
            if let Some(ref resolution) = issue.resolution {
                println!("            {}", resolution);
            }
        }
    }

    if bundles.is_empty() {
        println!("\nNo root bundle is readable; validation reports NoCaRoot until roots are installed.");
    }

    println!("\n=== Summary ===");
    if env_info.has_errors() {
        println!("Certificate validation is NOT available.");
        exit(1);
    }
    println!("Certificate validation is available.");
}
