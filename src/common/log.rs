//! Logging helpers
//!
//! Thin wrapper over `env_logger` so binaries and tests set up logging the
//! same way.

/// Initialize the global logger
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless; only the first call installs a logger.
///
/// # Arguments
///
/// * `level` - Default filter, e.g. `"info"` or `"openssl_trust_proxy=debug"`
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    let _ = env_logger::Builder::from_env(env).try_init();
}
