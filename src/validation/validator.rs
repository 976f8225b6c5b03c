//! Chain validation against the trusted roots

use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use log::{debug, warn};

use super::cache::CacheKey;
use super::classify::classify;
use super::roots::RootStore;
use crate::cert::{Certificate, CertificateChain, NativeStack, Purpose, ValidationError};
use crate::crypto::ffi::{self, Stack, X509Store, X509StoreCtx};
use crate::crypto::OpenSslProxy;

/// Where a verification attempt takes its trusted roots from
enum RootSource<'a> {
    Anchors(&'a [Certificate]),
    Bundle(&'a Path),
}

impl RootSource<'_> {
    fn describe(&self) -> String {
        match self {
            RootSource::Anchors(anchors) => format!("{} installed anchors", anchors.len()),
            RootSource::Bundle(path) => path.display().to_string(),
        }
    }
}

/// Owned `X509_STORE`
struct TrustStore<'a> {
    store: NonNull<X509Store>,
    proxy: &'a OpenSslProxy,
}

impl<'a> TrustStore<'a> {
    fn new(proxy: &'a OpenSslProxy) -> Option<Self> {
        NonNull::new(proxy.x509_store_new()).map(|store| Self { store, proxy })
    }

    /// Fill from `source`; false when nothing could be loaded
    fn load(&self, source: &RootSource<'_>) -> bool {
        let store = self.store.as_ptr();
        match source {
            RootSource::Anchors(anchors) => anchors.iter().fold(false, |loaded, anchor| {
                // SAFETY: the store and the anchor are live; the store takes its
                // own reference.
                let added = unsafe { self.proxy.x509_store_add_cert(store, anchor.as_ptr()) } == 1;
                loaded || added
            }),
            // SAFETY: the store is live.
            RootSource::Bundle(path) => unsafe { self.proxy.x509_store_load_file(store, path) },
        }
    }
}

impl Drop for TrustStore<'_> {
    fn drop(&mut self) {
        // SAFETY: owned and freed once.
        unsafe { self.proxy.x509_store_free(self.store.as_ptr()) }
    }
}

/// Owned `X509_STORE_CTX`
struct VerifyContext<'a> {
    ctx: NonNull<X509StoreCtx>,
    proxy: &'a OpenSslProxy,
}

impl<'a> VerifyContext<'a> {
    fn new(proxy: &'a OpenSslProxy) -> Option<Self> {
        NonNull::new(proxy.x509_store_ctx_new()).map(|ctx| Self { ctx, proxy })
    }
}

impl Drop for VerifyContext<'_> {
    fn drop(&mut self) {
        // SAFETY: owned and freed once.
        unsafe { self.proxy.x509_store_ctx_free(self.ctx.as_ptr()) }
    }
}

/// Validates certificates against a [`RootStore`]
///
/// Failures are reported as a list of distinct [`ValidationError`]s; an
/// empty list means the certificate is trusted for the purpose.
#[derive(Debug, Clone, Copy)]
pub struct ChainValidator<'a> {
    roots: &'a RootStore,
}

impl Default for ChainValidator<'static> {
    fn default() -> Self {
        Self::new(RootStore::global())
    }
}

impl<'a> ChainValidator<'a> {
    pub fn new(roots: &'a RootStore) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &'a RootStore {
        self.roots
    }

    /// Validate with the certificate's own chain, using cached results
    pub fn validate(&self, certificate: &Certificate, purpose: Purpose) -> Vec<ValidationError> {
        self.validate_with(certificate, None, None, purpose)
    }

    /// Validate with explicit intermediates and an optional authority that
    /// must appear in the built chain
    ///
    /// Results are cached only when neither `chain` nor `ca` is given.
    pub fn validate_with(
        &self,
        certificate: &Certificate,
        chain: Option<&CertificateChain>,
        ca: Option<&Certificate>,
        purpose: Purpose,
    ) -> Vec<ValidationError> {
        let proxy = certificate.proxy();
        if !proxy.has_crypto_support() || !proxy.supports_verification() {
            debug!("Validation unavailable: no usable crypto library");
            return vec![ValidationError::NoSsl];
        }

        let key = CacheKey {
            purpose,
            store: self.roots.id(),
            generation: self.roots.generation(),
        };
        let cacheable = chain.is_none() && ca.is_none();
        if cacheable {
            if let Some(errors) = certificate.cache().get(&key) {
                debug!("Cached result for {}: {:?}", certificate.subject(), errors);
                return errors;
            }
        }

        let chain = chain.unwrap_or_else(|| certificate.chain());
        let untrusted = match chain.to_native(proxy) {
            Ok(stack) => stack,
            Err(e) => {
                warn!("Could not prepare the certificate chain: {}", e);
                return vec![ValidationError::Unknown];
            }
        };

        let errors = self.verify_all(certificate, &untrusted, ca, purpose);
        debug!("Validated {} for {}: {:?}", certificate.subject(), purpose, errors);

        if cacheable && !errors.iter().any(|e| e.is_environmental()) {
            certificate.cache().insert(key, errors.clone());
        }
        errors
    }

    /// First error, or [`ValidationError::Ok`]
    pub fn validate_single(&self, certificate: &Certificate, purpose: Purpose) -> ValidationError {
        self.validate(certificate, purpose)
            .first()
            .copied()
            .unwrap_or(ValidationError::Ok)
    }

    pub fn is_valid(&self, certificate: &Certificate, purpose: Purpose) -> bool {
        self.validate(certificate, purpose).is_empty()
    }

    /// Validate again, ignoring any cached result for `purpose`
    pub fn revalidate(&self, certificate: &Certificate, purpose: Purpose) -> Vec<ValidationError> {
        certificate.cache().forget(purpose);
        self.validate(certificate, purpose)
    }

    fn verify_all(
        &self,
        certificate: &Certificate,
        untrusted: &NativeStack,
        ca: Option<&Certificate>,
        purpose: Purpose,
    ) -> Vec<ValidationError> {
        let proxy = certificate.proxy();
        let anchors = self.roots.anchors();
        let bundles = self.roots.bundles();

        let mut sources = Vec::with_capacity(bundles.len() + 1);
        if !anchors.is_empty() {
            sources.push(RootSource::Anchors(anchors.as_slice()));
        }
        sources.extend(bundles.iter().map(|path| RootSource::Bundle(path.as_path())));

        if sources.is_empty() {
            debug!("No trusted roots available");
            return vec![ValidationError::NoCaRoot];
        }

        let mut errors = Vec::new();
        let mut loaded_any = false;

        for source in &sources {
            let Some(store) = TrustStore::new(proxy) else {
                warn!("Could not allocate a certificate store");
                continue;
            };
            if !store.load(source) {
                debug!("Could not load roots from {}", source.describe());
                continue;
            }
            loaded_any = true;
            debug!("Verifying against {}", source.describe());

            let mut result = verify_once(proxy, &store, certificate, untrusted.as_ptr(), purpose.id(), ca);
            if needs_server_fallback(result, purpose) {
                debug!("Retrying with the Netscape SSL server purpose");
                let retry = verify_once(
                    proxy,
                    &store,
                    certificate,
                    untrusted.as_ptr(),
                    ffi::X509_PURPOSE_NS_SSL_SERVER,
                    ca,
                );
                if retry == ValidationError::Ok {
                    result = retry;
                }
            }

            if result == ValidationError::Ok {
                proxy.clear_errors();
                return Vec::new();
            }
            for message in proxy.drain_errors() {
                debug!("OpenSSL: {}", message);
            }
            if !errors.contains(&result) {
                errors.push(result);
            }
        }

        if !loaded_any {
            return vec![ValidationError::ErrorReadingRoot];
        }
        errors
    }
}

/// Whether a result should be retried with the Netscape SSL server purpose
fn needs_server_fallback(result: ValidationError, purpose: Purpose) -> bool {
    purpose == Purpose::SslServer && !matches!(result, ValidationError::Ok | ValidationError::Irrelevant)
}

/// One verification run in a fresh context
fn verify_once(
    proxy: &Arc<OpenSslProxy>,
    store: &TrustStore<'_>,
    certificate: &Certificate,
    untrusted: *mut Stack,
    purpose: std::os::raw::c_int,
    ca: Option<&Certificate>,
) -> ValidationError {
    let Some(context) = VerifyContext::new(proxy) else {
        return ValidationError::Unknown;
    };
    let ctx = context.ctx.as_ptr();

    // SAFETY: the context, store, certificate and stack all outlive this
    // function; the context is freed before any of them.
    unsafe {
        if proxy.x509_store_ctx_init(ctx, store.store.as_ptr(), certificate.as_ptr(), untrusted) != 1 {
            return ValidationError::Unknown;
        }
        if proxy.x509_store_ctx_set_purpose(ctx, purpose) != 1 {
            debug!("Purpose {} not accepted by the verifier", purpose);
        }

        let verified = proxy.x509_verify_cert(ctx);
        let code = proxy.x509_store_ctx_get_error(ctx);

        // A failed build still leaves the partial chain in the context.
        if let Some(ca) = ca {
            if !built_chain_contains(proxy, ctx, ca) {
                return ValidationError::Irrelevant;
            }
        }
        if verified == 1 && code == ffi::X509_V_OK {
            return ValidationError::Ok;
        }

        match classify(code) {
            ValidationError::Ok => ValidationError::Unknown,
            error => error,
        }
    }
}

/// Whether `ca` is part of the chain the verifier built
///
/// # Safety
///
/// `ctx` must be a live context after verification.
unsafe fn built_chain_contains(proxy: &Arc<OpenSslProxy>, ctx: *mut X509StoreCtx, ca: &Certificate) -> bool {
    let Some(built) = NativeStack::adopt(Arc::clone(proxy), proxy.x509_store_ctx_get1_chain(ctx)) else {
        return false;
    };
    proxy
        .sk_x509_entries(built.as_ptr())
        .into_iter()
        .any(|entry| proxy.x509_cmp(entry, ca.as_ptr()) == Some(std::cmp::Ordering::Equal))
}
