//! Certificate Trust Command Line Tool
//!
//! Inspect and validate certificates through the runtime-loaded OpenSSL and
//! manage the per-host rules stored for them.

use std::path::PathBuf;
use std::process::exit;

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use log::{debug, error, info};

use openssl_trust_proxy::cert::{Certificate, CertificateChain, Purpose, ValidationError};
use openssl_trust_proxy::common::{init_logger, Result};
use openssl_trust_proxy::config::{init_config, log_config};
use openssl_trust_proxy::crypto::{acquire, DigestKind};
use openssl_trust_proxy::rules::{CertificateRule, RuleStore};
use openssl_trust_proxy::validation::{ChainValidator, RootStore};
use openssl_trust_proxy::{APP_NAME, VERSION};

/// Inspect certificates, validate them and manage trust rules
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to SSLTRUST_CONFIG or cryptodefaults.json)
    #[clap(long, env = "SSLTRUST_CONFIG")]
    config_file: Option<PathBuf>,

    /// Log level
    #[clap(long)]
    log_level: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a certificate's attributes as JSON
    Inspect {
        /// PEM or DER certificate
        certificate: PathBuf,
    },

    /// Validate a certificate and apply the rule for a host
    Validate {
        /// PEM or DER certificate
        certificate: PathBuf,

        /// PEM bundle of untrusted intermediates
        #[clap(long)]
        chain: Option<PathBuf>,

        /// Additional trusted roots (PEM)
        #[clap(long)]
        roots: Option<PathBuf>,

        /// Purpose (ssl-server, ssl-client, smime-sign, smime-encrypt, any)
        #[clap(long, default_value = "ssl-server")]
        purpose: Purpose,

        /// Host whose rule applies
        #[clap(long)]
        host: Option<String>,
    },

    /// Accept a certificate for a host despite the given errors
    Accept {
        certificate: PathBuf,

        /// Host name or pattern (`*.example.com`); empty for any host
        #[clap(long, default_value = "")]
        host: String,

        /// Errors to ignore, e.g. SelfSigned
        #[clap(long = "ignore", required = true)]
        ignore: Vec<ValidationError>,

        /// Minutes until the rule lapses; never when omitted
        #[clap(long)]
        expires_in: Option<i64>,
    },

    /// Reject a certificate for a host
    Reject {
        certificate: PathBuf,

        #[clap(long, default_value = "")]
        host: String,

        /// Keep the rejection after the rule lapses
        #[clap(long)]
        permanent: bool,

        #[clap(long)]
        expires_in: Option<i64>,
    },

    /// Remove the rule for a certificate on a host
    Forget {
        certificate: PathBuf,

        #[clap(long, default_value = "")]
        host: String,
    },

    /// List stored rules for a certificate
    Rules { certificate: PathBuf },

    /// List the ciphers the loaded library offers
    Ciphers,
}

fn main() {
    let args = Args::parse();

    let config = match init_config(args.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(2);
        }
    };
    init_logger(args.log_level.as_deref().unwrap_or(&config.log_level));
    debug!("Starting {} v{}", APP_NAME, VERSION);
    log_config(config);

    match run(args.command) {
        Ok(code) => exit(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            exit(2);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Inspect { certificate } => {
            let certificate = Certificate::load(&certificate)?;
            let report = serde_json::json!({
                "identity": certificate.identity(),
                "sha1": certificate.fingerprint(DigestKind::Sha1),
                "sha256": certificate.fingerprint(DigestKind::Sha256),
                "details": certificate.details(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(0)
        }

        Command::Validate {
            certificate,
            chain,
            roots,
            purpose,
            host,
        } => {
            let mut certificate = Certificate::load(&certificate)?;
            if let Some(chain) = chain {
                let text = std::fs::read_to_string(&chain)?;
                certificate.set_chain(CertificateChain::from_pem_bundle(&text)?);
            }

            let store = RootStore::global();
            if let Some(roots) = roots {
                let count = store.add_anchors_from_file(&roots)?;
                info!("Added {} roots from {}", count, roots.display());
            }

            let errors = ChainValidator::new(store).validate(&certificate, purpose);
            let remaining = match host.as_deref() {
                Some(host) => match RuleStore::global().rule(&certificate, host) {
                    Some(rule) => rule.filter_errors(&errors),
                    None => errors.clone(),
                },
                None => errors.clone(),
            };

            if errors.is_empty() {
                println!("{}: valid for {}", certificate.subject(), purpose);
            }
            for error in &errors {
                let note = if remaining.contains(error) { "" } else { " (ignored by rule)" };
                println!("{}: {}{}", error, error.description(), note);
            }
            for error in remaining.iter().filter(|e| !errors.contains(e)) {
                println!("{}: {}", error, error.description());
            }

            Ok(if remaining.is_empty() { 0 } else { 1 })
        }

        Command::Accept {
            certificate,
            host,
            ignore,
            expires_in,
        } => {
            let certificate = Certificate::load(&certificate)?;
            let mut rule = CertificateRule::new(&certificate, &host)?;
            rule.set_ignored_errors(ignore.iter().copied());
            rule.set_expiry(expires_in.map(|minutes| Utc::now() + Duration::minutes(minutes)));

            let dropped: Vec<&ValidationError> = ignore.iter().filter(|e| !e.is_ignorable()).collect();
            if !dropped.is_empty() {
                println!("Not ignorable, left out: {:?}", dropped);
            }
            RuleStore::global().set_rule(rule)?;
            println!("Accepted {} for '{}'", certificate.subject(), host);
            Ok(0)
        }

        Command::Reject {
            certificate,
            host,
            permanent,
            expires_in,
        } => {
            let certificate = Certificate::load(&certificate)?;
            let mut rule = CertificateRule::new(&certificate, &host)?;
            rule.set_rejected(true);
            rule.set_permanent(permanent);
            rule.set_expiry(expires_in.map(|minutes| Utc::now() + Duration::minutes(minutes)));

            RuleStore::global().set_rule(rule)?;
            println!("Rejected {} for '{}'", certificate.subject(), host);
            Ok(0)
        }

        Command::Forget { certificate, host } => {
            let certificate = Certificate::load(&certificate)?;
            if RuleStore::global().clear_rule(&certificate, &host)? {
                println!("Removed rule for '{}'", host);
                Ok(0)
            } else {
                println!("No rule for '{}'", host);
                Ok(1)
            }
        }

        Command::Rules { certificate } => {
            let certificate = Certificate::load(&certificate)?;
            let rules = RuleStore::global().rules_for(&certificate);
            if rules.is_empty() {
                println!("No rules for {}", certificate.subject());
            }
            for rule in rules {
                let expiry = rule
                    .expiry()
                    .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
                println!(
                    "'{}': ignores {:?}, rejected: {}, permanent: {}, expires: {}",
                    rule.host(),
                    rule.ignored_errors(),
                    rule.is_rejected(),
                    rule.is_permanent(),
                    expiry
                );
            }
            Ok(0)
        }

        Command::Ciphers => {
            let ciphers = acquire().supported_ciphers();
            if ciphers.is_empty() {
                println!("No ciphers available; is libssl installed?");
                return Ok(1);
            }
            for cipher in ciphers {
                println!(
                    "{:<40} {:>4}/{:<4} {}",
                    cipher.name, cipher.bits, cipher.algorithm_bits, cipher.version
                );
            }
            Ok(0)
        }
    }
}
