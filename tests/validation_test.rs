//! Certificate and chain validation tests against the system OpenSSL
//!
//! Each test skips when no usable library is installed.

mod common;

use std::sync::Arc;

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12 as OpenSslPkcs12;
use openssl::pkcs7::{Pkcs7 as OpenSslPkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::X509;

use openssl_trust_proxy::cert::{CertificateChain, KeyAlgorithm, Pkcs12, Pkcs7, SubjectAltName};
use openssl_trust_proxy::crypto::DigestKind;
use openssl_trust_proxy::rules::CertificateRule;
use openssl_trust_proxy::{ChainValidator, Purpose, RootStore, ValidationError};

use common::{expired_leaf, self_signed_root, server_leaf, system_proxy};

#[test]
fn test_no_roots_reports_no_ca_root() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Lonely Root");
    let certificate = root.load(&proxy);

    let roots = RootStore::empty();
    let errors = ChainValidator::new(&roots).validate(&certificate, Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::NoCaRoot]);
}

#[test]
fn test_unreadable_bundles_report_error_reading_root() {
    let Some(proxy) = system_proxy() else { return };
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("broken.pem");
    std::fs::write(&bundle, "not a certificate bundle\n").unwrap();

    let certificate = self_signed_root("Root").load(&proxy);
    let roots = RootStore::with_bundles(vec![bundle]);
    let errors = ChainValidator::new(&roots).validate(&certificate, Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::ErrorReadingRoot]);
}

#[test]
fn test_root_failures_are_not_cached() {
    let Some(proxy) = system_proxy() else { return };
    let dir = tempfile::tempdir().unwrap();
    let bundle = dir.path().join("bundle.pem");
    std::fs::write(&bundle, "not a certificate bundle\n").unwrap();

    let root = self_signed_root("Late Root");
    let certificate = root.load(&proxy);
    let roots = RootStore::with_bundles(vec![bundle.clone()]);
    let validator = ChainValidator::new(&roots);
    let generation = roots.generation();

    assert_eq!(
        validator.validate(&certificate, Purpose::SslServer),
        vec![ValidationError::ErrorReadingRoot]
    );

    // Same store and generation; only the bundle contents change
    std::fs::write(&bundle, root.pem()).unwrap();
    assert_eq!(roots.generation(), generation);
    assert!(validator.validate(&certificate, Purpose::SslServer).is_empty());
}

#[test]
fn test_self_signed_flow_with_rule() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Self Signed Root");
    let unrelated = self_signed_root("Unrelated Root");
    let certificate = root.load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchor(unrelated.load(&proxy));
    let validator = ChainValidator::new(&roots);

    let errors = validator.validate(&certificate, Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::SelfSigned]);

    let mut rule = CertificateRule::new(&certificate, "example.com").unwrap();
    rule.set_ignored_errors([ValidationError::SelfSigned]);
    assert!(rule.filter_errors(&errors).is_empty());
    assert!(rule.is_acceptable(&errors));

    // Trusting the root itself clears the error, despite the cached result
    roots.add_anchor(root.load(&proxy));
    assert!(validator.validate(&certificate, Purpose::SslServer).is_empty());
    assert!(validator.is_valid(&certificate, Purpose::SslServer));
    assert_eq!(validator.validate_single(&certificate, Purpose::SslServer), ValidationError::Ok);
}

#[test]
fn test_leaf_validates_through_installed_root() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Issuing Root");
    let leaf = server_leaf(&root, "www.example.com");
    let certificate = leaf.load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchors_from_pem(&root.pem()).unwrap();
    assert_eq!(roots.anchor_count(), 1);

    let validator = ChainValidator::new(&roots);
    assert!(validator.validate(&certificate, Purpose::SslServer).is_empty());

    // With the real root as the required authority
    let anchor = root.load(&proxy);
    assert!(validator
        .validate_with(&certificate, None, Some(&anchor), Purpose::SslServer)
        .is_empty());

    // An authority that is not in the built chain makes the result irrelevant
    let stranger = self_signed_root("Stranger").load(&proxy);
    assert_eq!(
        validator.validate_with(&certificate, None, Some(&stranger), Purpose::SslServer),
        vec![ValidationError::Irrelevant]
    );
}

#[test]
fn test_leaf_without_its_root() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Missing Root");
    let leaf = server_leaf(&root, "host.example.com");
    let certificate = leaf.load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchor(self_signed_root("Other Root").load(&proxy));

    let errors = ChainValidator::new(&roots).validate(&certificate, Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::GetIssuerCertLocallyFailed]);
}

#[test]
fn test_expired_leaf() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Expiry Root");
    let certificate = expired_leaf(&root, "old.example.com").load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchor(root.load(&proxy));

    let errors = ChainValidator::new(&roots).validate(&certificate, Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::CertificateHasExpired]);
    assert!(!certificate.is_valid_at(chrono::Utc::now()));
}

#[test]
fn test_revalidate_after_anchors_cleared() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Clearable Root");
    let certificate = root.load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchor(root.load(&proxy));
    let validator = ChainValidator::new(&roots);
    assert!(validator.validate(&certificate, Purpose::SslServer).is_empty());

    roots.clear_anchors();
    assert_eq!(roots.anchor_count(), 0);
    assert_eq!(
        validator.revalidate(&certificate, Purpose::SslServer),
        vec![ValidationError::NoCaRoot]
    );
}

#[test]
fn test_certificate_attributes() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Attribute Root");
    let certificate = root.load(&proxy);

    assert!(certificate.subject().contains("CN=Attribute Root"));
    assert_eq!(certificate.subject(), certificate.issuer());
    assert!(certificate.is_self_signed());
    assert!(certificate.is_valid_at(chrono::Utc::now()));

    let key = certificate.public_key().unwrap();
    assert_eq!(key.algorithm, KeyAlgorithm::Ec);
    assert_eq!(key.bits, 256);

    assert!(certificate
        .subject_alt_names()
        .contains(&SubjectAltName::Dns("example.com".to_string())));

    let expected: String = root
        .cert
        .digest(MessageDigest::sha256())
        .unwrap()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    assert_eq!(certificate.identity(), expected);
    assert_eq!(certificate.digest(DigestKind::Sha256).len(), 32);
    let fingerprint = certificate.fingerprint(DigestKind::Sha256);
    assert_eq!(fingerprint.len(), 32 * 3 - 1);
    assert_eq!(fingerprint.replace(':', "").to_lowercase(), expected);

    let purposes = certificate.purposes();
    assert!(purposes.allows(Purpose::SslServer, false));
    assert!(purposes.allows(Purpose::SslClient, false));
}

#[test]
fn test_replicate_is_independent() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Copy Root");
    let leaf = server_leaf(&root, "copy.example.com");

    let mut original = leaf.load(&proxy);
    original.set_chain(CertificateChain::from_certificates(vec![root.load(&proxy)]));

    let copy = original.replicate().unwrap();
    assert_eq!(copy, original);
    assert_eq!(copy.chain().depth(), 1);
    assert_eq!(copy.identity(), original.identity());

    drop(original);
    assert_eq!(copy.to_der().unwrap(), leaf.der());
    assert!(copy.subject().contains("copy.example.com"));
}

#[test]
fn test_pem_and_base64_round_trip() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Encoding Root");
    let certificate = root.load(&proxy);

    let pem = certificate.to_pem().unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
    let from_pem = openssl_trust_proxy::Certificate::from_pem_with(Arc::clone(&proxy), &pem).unwrap();
    assert_eq!(from_pem, certificate);

    let encoded = certificate.to_base64().unwrap();
    let from_base64 = openssl_trust_proxy::Certificate::from_base64_with(Arc::clone(&proxy), &encoded).unwrap();
    assert_eq!(from_base64.identity(), certificate.identity());

    assert!(openssl_trust_proxy::Certificate::from_der_with(proxy, b"garbage").is_err());
}

#[test]
fn test_chain_native_round_trip() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Chain Root");
    let leaf = server_leaf(&root, "chain.example.com");

    let chain = CertificateChain::from_certificates(vec![leaf.load(&proxy), root.load(&proxy)]);
    let native = chain.to_native(&proxy).unwrap();
    assert_eq!(native.len(), 2);

    let back = native.to_chain().unwrap();
    assert_eq!(back.depth(), 2);
    assert!(back.contains(&root.load(&proxy)));
    assert_eq!(back.certificates()[0], leaf.load(&proxy));

    let empty = CertificateChain::new().to_native(&proxy).unwrap();
    assert!(empty.is_empty());
    assert!(empty.to_chain().unwrap().is_empty());
}

#[test]
fn test_explicit_chain_is_used() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Explicit Root");
    let leaf = server_leaf(&root, "explicit.example.com");
    let certificate = leaf.load(&proxy);

    let roots = RootStore::empty();
    roots.add_anchor(root.load(&proxy));
    let chain = CertificateChain::from_certificates(vec![root.load(&proxy)]);

    let errors = ChainValidator::new(&roots).validate_with(&certificate, Some(&chain), None, Purpose::SslServer);
    assert!(errors.is_empty());
}

#[test]
fn test_pkcs12_bundle() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Bundle Root");
    let leaf = server_leaf(&root, "bundle.example.com");

    let mut extras: Stack<X509> = Stack::new().unwrap();
    extras.push(root.cert.clone()).unwrap();
    let der = OpenSslPkcs12::builder()
        .name("bundle")
        .pkey(&leaf.key)
        .cert(&leaf.cert)
        .ca(extras)
        .key_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC)
        .cert_algorithm(Nid::PBE_WITHSHA1AND3_KEY_TRIPLEDES_CBC)
        .build2("secret")
        .unwrap()
        .to_der()
        .unwrap();

    let mut bundle = Pkcs12::from_der_with(Arc::clone(&proxy), &der).unwrap();
    assert!(bundle.verify_mac("secret"));
    assert!(!bundle.verify_mac("wrong"));

    let parsed = bundle.parse("secret").unwrap();
    assert!(parsed.has_private_key);
    assert_eq!(parsed.certificate.to_der().unwrap(), leaf.der());
    assert_eq!(parsed.certificate.chain().depth(), 1);

    bundle.change_password("secret", "changed").unwrap();
    assert!(bundle.verify_mac("changed"));
    assert!(!bundle.verify_mac("secret"));
    assert!(bundle.parse("secret").is_err());

    let reread = Pkcs12::from_der_with(proxy, &bundle.to_der().unwrap()).unwrap();
    assert!(reread.verify_mac("changed"));
}

#[test]
fn test_pkcs7_container() {
    let Some(proxy) = system_proxy() else { return };
    let root = self_signed_root("Signing Root");

    let certs: Stack<X509> = Stack::new().unwrap();
    let signed = OpenSslPkcs7::sign(&root.cert, &root.key, &certs, b"payload", Pkcs7Flags::empty()).unwrap();
    let der = signed.to_der().unwrap();

    let p7 = Pkcs7::from_der_with(Arc::clone(&proxy), &der).unwrap();
    let copy = p7.replicate().unwrap();
    drop(p7);
    assert_eq!(copy.to_der().unwrap(), der);

    assert!(Pkcs7::from_der_with(proxy, b"\x30\x03\x02\x01\x00").is_err());
}
