//! Chain validator tests over a scripted crypto library
//!
//! The fake library accepts a certificate only under the Netscape SSL server
//! purpose, which no real OpenSSL build does, so the purpose fallback and the
//! required-authority check can be driven exactly.

use std::collections::HashMap;
use std::os::raw::{c_int, c_long, c_uchar, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use openssl_trust_proxy::crypto::ffi::X509_PURPOSE_NS_SSL_SERVER;
use openssl_trust_proxy::crypto::{OpenSslProxy, RawSymbol, SharedLibrary};
use openssl_trust_proxy::rules::CertificateRule;
use openssl_trust_proxy::{Certificate, ChainValidator, Purpose, RootStore, RuleStore, ValidationError};

const X509_V_ERR_INVALID_PURPOSE: c_int = 26;

#[allow(clippy::declare_interior_mutable_const)]
const NO_RUNS: AtomicUsize = AtomicUsize::new(0);

/// Verification runs per certificate id
static VERIFICATIONS: [AtomicUsize; 16] = [NO_RUNS; 16];

struct FakeCert {
    id: u8,
}

struct FakeCtx {
    purpose: c_int,
    leaf: u8,
}

unsafe fn cert_id(x509: *const c_void) -> u8 {
    (*(x509 as *const FakeCert)).id
}

fn boxed_cert(id: u8) -> *mut c_void {
    Box::into_raw(Box::new(FakeCert { id })) as *mut c_void
}

extern "C" fn fake_d2i_x509(_out: *mut *mut c_void, input: *mut *const c_uchar, len: c_long) -> *mut c_void {
    if len < 1 {
        return ptr::null_mut();
    }
    // SAFETY: the caller passes `len` readable bytes.
    boxed_cert(unsafe { **input })
}

extern "C" fn fake_x509_free(x509: *mut c_void) {
    // SAFETY: every certificate comes from boxed_cert.
    drop(unsafe { Box::from_raw(x509 as *mut FakeCert) });
}

extern "C" fn fake_x509_cmp(a: *const c_void, b: *const c_void) -> c_int {
    // SAFETY: both are fake certificates.
    unsafe { c_int::from(cert_id(a)) - c_int::from(cert_id(b)) }
}

extern "C" fn fake_sk_new_null() -> *mut c_void {
    Box::into_raw(Box::new(Vec::<*mut c_void>::new())) as *mut c_void
}

extern "C" fn fake_sk_num(stack: *const c_void) -> c_int {
    // SAFETY: stacks come from fake_sk_new_null or fake_get1_chain.
    unsafe { (*(stack as *const Vec<*mut c_void>)).len() as c_int }
}

extern "C" fn fake_sk_value(stack: *const c_void, index: c_int) -> *mut c_void {
    // SAFETY: as above.
    let entries = unsafe { &*(stack as *const Vec<*mut c_void>) };
    entries.get(index as usize).copied().unwrap_or(ptr::null_mut())
}

extern "C" fn fake_sk_pop_free(stack: *mut c_void, free: Option<unsafe extern "C" fn(*mut c_void)>) {
    // SAFETY: as above; the stack is freed once.
    let entries = unsafe { Box::from_raw(stack as *mut Vec<*mut c_void>) };
    if let Some(free) = free {
        for entry in entries.iter() {
            // SAFETY: entries are owned fake certificates.
            unsafe { free(*entry) };
        }
    }
}

extern "C" fn fake_store_new() -> *mut c_void {
    Box::into_raw(Box::new(0u8)) as *mut c_void
}

extern "C" fn fake_store_free(store: *mut c_void) {
    // SAFETY: stores come from fake_store_new.
    drop(unsafe { Box::from_raw(store as *mut u8) });
}

extern "C" fn fake_store_add_cert(_store: *mut c_void, _x509: *mut c_void) -> c_int {
    1
}

extern "C" fn fake_ctx_new() -> *mut c_void {
    Box::into_raw(Box::new(FakeCtx { purpose: 0, leaf: 0 })) as *mut c_void
}

extern "C" fn fake_ctx_free(ctx: *mut c_void) {
    // SAFETY: contexts come from fake_ctx_new.
    drop(unsafe { Box::from_raw(ctx as *mut FakeCtx) });
}

extern "C" fn fake_ctx_init(ctx: *mut c_void, _store: *mut c_void, x509: *mut c_void, _chain: *mut c_void) -> c_int {
    // SAFETY: live fake context and certificate.
    unsafe { (*(ctx as *mut FakeCtx)).leaf = cert_id(x509) };
    1
}

extern "C" fn fake_ctx_set_purpose(ctx: *mut c_void, purpose: c_int) -> c_int {
    // SAFETY: live fake context.
    unsafe { (*(ctx as *mut FakeCtx)).purpose = purpose };
    1
}

extern "C" fn fake_verify_cert(ctx: *mut c_void) -> c_int {
    // SAFETY: live fake context.
    let ctx = unsafe { &*(ctx as *const FakeCtx) };
    VERIFICATIONS[usize::from(ctx.leaf)].fetch_add(1, Ordering::SeqCst);
    c_int::from(ctx.purpose == X509_PURPOSE_NS_SSL_SERVER)
}

extern "C" fn fake_ctx_get_error(ctx: *mut c_void) -> c_int {
    // SAFETY: live fake context.
    let ctx = unsafe { &*(ctx as *const FakeCtx) };
    if ctx.purpose == X509_PURPOSE_NS_SSL_SERVER {
        0
    } else {
        X509_V_ERR_INVALID_PURPOSE
    }
}

/// The built chain holds only a copy of the leaf
extern "C" fn fake_get1_chain(ctx: *mut c_void) -> *mut c_void {
    // SAFETY: live fake context.
    let leaf = unsafe { (*(ctx as *const FakeCtx)).leaf };
    Box::into_raw(Box::new(vec![boxed_cert(leaf)])) as *mut c_void
}

struct ScriptedCrypto {
    exports: HashMap<&'static str, usize>,
}

impl ScriptedCrypto {
    fn new() -> Self {
        let exports: [(&'static str, *const ()); 17] = [
            ("d2i_X509", fake_d2i_x509 as *const ()),
            ("X509_free", fake_x509_free as *const ()),
            ("X509_cmp", fake_x509_cmp as *const ()),
            ("OPENSSL_sk_new_null", fake_sk_new_null as *const ()),
            ("OPENSSL_sk_num", fake_sk_num as *const ()),
            ("OPENSSL_sk_value", fake_sk_value as *const ()),
            ("OPENSSL_sk_pop_free", fake_sk_pop_free as *const ()),
            ("X509_STORE_new", fake_store_new as *const ()),
            ("X509_STORE_free", fake_store_free as *const ()),
            ("X509_STORE_add_cert", fake_store_add_cert as *const ()),
            ("X509_STORE_CTX_new", fake_ctx_new as *const ()),
            ("X509_STORE_CTX_free", fake_ctx_free as *const ()),
            ("X509_STORE_CTX_init", fake_ctx_init as *const ()),
            ("X509_STORE_CTX_set_purpose", fake_ctx_set_purpose as *const ()),
            ("X509_STORE_CTX_get_error", fake_ctx_get_error as *const ()),
            ("X509_STORE_CTX_get1_chain", fake_get1_chain as *const ()),
            ("X509_verify_cert", fake_verify_cert as *const ()),
        ];
        Self {
            exports: exports.iter().map(|(name, f)| (*name, *f as usize)).collect(),
        }
    }
}

impl SharedLibrary for ScriptedCrypto {
    fn symbol(&self, name: &str) -> Option<RawSymbol> {
        self.exports.get(name).and_then(|address| RawSymbol::new(*address as *mut c_void))
    }

    fn origin(&self) -> &str {
        "scripted libcrypto"
    }
}

fn scripted_proxy() -> Arc<OpenSslProxy> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(OpenSslProxy::from_libraries(Some(Box::new(ScriptedCrypto::new())), None))
}

fn certificate(proxy: &Arc<OpenSslProxy>, id: u8) -> Certificate {
    Certificate::from_der_with(Arc::clone(proxy), &[id]).unwrap()
}

#[test]
fn test_server_purpose_falls_back_to_netscape_server() {
    let proxy = scripted_proxy();
    assert!(proxy.supports_verification());
    let leaf = certificate(&proxy, 1);

    let roots = RootStore::empty();
    roots.add_anchor(certificate(&proxy, 2));

    let errors = ChainValidator::new(&roots).validate(&leaf, Purpose::SslServer);
    assert!(errors.is_empty());
    assert_eq!(VERIFICATIONS[1].load(Ordering::SeqCst), 2);
}

#[test]
fn test_other_purposes_do_not_fall_back() {
    let proxy = scripted_proxy();
    let leaf = certificate(&proxy, 3);

    let roots = RootStore::empty();
    roots.add_anchor(certificate(&proxy, 4));

    let errors = ChainValidator::new(&roots).validate(&leaf, Purpose::SslClient);
    assert_eq!(errors, vec![ValidationError::InvalidPurpose]);
    assert_eq!(VERIFICATIONS[3].load(Ordering::SeqCst), 1);
}

#[test]
fn test_foreign_authority_is_irrelevant_without_fallback() {
    let proxy = scripted_proxy();
    let leaf = certificate(&proxy, 5);
    let foreign = certificate(&proxy, 6);

    let roots = RootStore::empty();
    roots.add_anchor(certificate(&proxy, 7));

    // The first run fails on purpose; the missing authority still decides
    let errors = ChainValidator::new(&roots).validate_with(&leaf, None, Some(&foreign), Purpose::SslServer);
    assert_eq!(errors, vec![ValidationError::Irrelevant]);
    assert_eq!(VERIFICATIONS[5].load(Ordering::SeqCst), 1);
}

#[test]
fn test_authority_in_chain_keeps_fallback() {
    let proxy = scripted_proxy();
    let leaf = certificate(&proxy, 8);
    let same = certificate(&proxy, 8);

    let roots = RootStore::empty();
    roots.add_anchor(certificate(&proxy, 9));

    let errors = ChainValidator::new(&roots).validate_with(&leaf, None, Some(&same), Purpose::SslServer);
    assert!(errors.is_empty());
}

#[test]
fn test_unencodable_certificates_get_distinct_identities() {
    // The scripted library cannot encode, so no DER digest is available
    let proxy = scripted_proxy();
    let first = certificate(&proxy, 10);
    let second = certificate(&proxy, 10);

    assert!(first.to_der().is_err());
    assert!(!first.identity().is_empty());
    assert_ne!(first.identity(), second.identity());
    assert_eq!(first.identity(), first.identity());

    let store = RuleStore::in_memory();
    let mut rule = CertificateRule::for_identity("", "example.com");
    rule.set_ignored_errors([ValidationError::SelfSigned]);
    store.set_rule(rule).unwrap();

    assert!(!store.seen_certificate(&first));
    assert!(store.rule(&first, "example.com").is_none());
    assert!(!store.is_acceptable(&first, "example.com", &[ValidationError::SelfSigned]));
}
