//! Shared fixtures for integration tests
//!
//! Certificates are generated with the `openssl` crate and handed to the
//! crate under test as DER, so both sides only share bytes.

#![allow(dead_code)]

use std::sync::Arc;

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509Builder, X509NameBuilder, X509};

use openssl_trust_proxy::crypto::{acquire, OpenSslProxy};
use openssl_trust_proxy::Certificate;

pub struct Fixture {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl Fixture {
    pub fn der(&self) -> Vec<u8> {
        self.cert.to_der().unwrap()
    }

    pub fn pem(&self) -> String {
        String::from_utf8(self.cert.to_pem().unwrap()).unwrap()
    }

    pub fn load(&self, proxy: &Arc<OpenSslProxy>) -> Certificate {
        Certificate::from_der_with(Arc::clone(proxy), &self.der()).unwrap()
    }
}

/// Initialize logging for test visibility
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The system proxy, or `None` when this host has no usable OpenSSL
pub fn system_proxy() -> Option<Arc<OpenSslProxy>> {
    init_test_logger();
    let proxy = acquire();
    if !proxy.has_crypto_support() || !proxy.supports_verification() {
        println!("Skipping test: no usable system OpenSSL");
        return None;
    }
    Some(proxy)
}

fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

fn builder(subject: &str, key: &PKey<Private>, not_before: &Asn1Time, not_after: &Asn1Time) -> X509Builder {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", subject).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder.set_not_before(not_before).unwrap();
    builder.set_not_after(not_after).unwrap();
    builder
}

/// Self-signed authority, also usable as an SSL server or client certificate
pub fn self_signed_root(subject: &str) -> Fixture {
    let key = ec_key();
    let mut builder = builder(
        subject,
        &key,
        &Asn1Time::days_from_now(0).unwrap(),
        &Asn1Time::days_from_now(365).unwrap(),
    );
    let name = builder_subject(subject);
    builder.set_issuer_name(&name).unwrap();

    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder
        .append_extension(
            KeyUsage::new()
                .critical()
                .digital_signature()
                .key_encipherment()
                .key_cert_sign()
                .build()
                .unwrap(),
        )
        .unwrap();
    builder
        .append_extension(ExtendedKeyUsage::new().server_auth().client_auth().build().unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns("example.com")
        .ip("127.0.0.1")
        .build(&builder.x509v3_context(None, None))
        .unwrap();
    builder.append_extension(san).unwrap();

    builder.sign(&key, MessageDigest::sha256()).unwrap();
    Fixture {
        cert: builder.build(),
        key,
    }
}

/// Server certificate issued by `issuer`
pub fn server_leaf(issuer: &Fixture, host: &str) -> Fixture {
    leaf_with_validity(
        issuer,
        host,
        &Asn1Time::days_from_now(0).unwrap(),
        &Asn1Time::days_from_now(90).unwrap(),
    )
}

/// Server certificate issued by `issuer` that expired a day ago
pub fn expired_leaf(issuer: &Fixture, host: &str) -> Fixture {
    let now = chrono::Utc::now().timestamp();
    leaf_with_validity(
        issuer,
        host,
        &Asn1Time::from_unix(now - 30 * 86_400).unwrap(),
        &Asn1Time::from_unix(now - 86_400).unwrap(),
    )
}

fn leaf_with_validity(issuer: &Fixture, host: &str, not_before: &Asn1Time, not_after: &Asn1Time) -> Fixture {
    let key = ec_key();
    let mut builder = builder(host, &key, not_before, not_after);
    builder.set_issuer_name(issuer.cert.subject_name()).unwrap();

    builder
        .append_extension(KeyUsage::new().critical().digital_signature().build().unwrap())
        .unwrap();
    builder
        .append_extension(ExtendedKeyUsage::new().server_auth().build().unwrap())
        .unwrap();
    let san = SubjectAlternativeName::new()
        .dns(host)
        .build(&builder.x509v3_context(Some(&issuer.cert), None))
        .unwrap();
    builder.append_extension(san).unwrap();

    builder.sign(&issuer.key, MessageDigest::sha256()).unwrap();
    Fixture {
        cert: builder.build(),
        key,
    }
}

fn builder_subject(subject: &str) -> openssl::x509::X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", subject).unwrap();
    name.build()
}
