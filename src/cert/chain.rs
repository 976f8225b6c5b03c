//! Ordered certificate chains and their native form

use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use super::certificate::Certificate;
use crate::common::{Result, TrustError};
use crate::crypto::ffi::Stack;
use crate::crypto::OpenSslProxy;

/// Leaf-first sequence of owned certificates
///
/// An empty chain is valid and means "no untrusted intermediates".
#[derive(Debug, Default)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain owning `certificates` as given
    pub fn from_certificates(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    /// Chain of deep copies of `certificates`
    pub fn from_borrowed(certificates: &[Certificate]) -> Result<Self> {
        certificates
            .iter()
            .map(Certificate::replicate)
            .collect::<Result<Vec<_>>>()
            .map(Self::from_certificates)
    }

    /// Chain from a PEM bundle, in file order
    pub fn from_pem_bundle(text: &str) -> Result<Self> {
        Certificate::from_pem_bundle(text).map(Self::from_certificates)
    }

    /// Copy the entries of a native certificate stack
    ///
    /// # Safety
    ///
    /// `stack` must be null or a live stack of certificates allocated by
    /// `proxy`'s library. A null stack yields an empty chain.
    pub unsafe fn from_native(proxy: &Arc<OpenSslProxy>, stack: *const Stack) -> Result<Self> {
        let mut certificates = Vec::new();
        for entry in proxy.sk_x509_entries(stack) {
            let copy = proxy.x509_dup(entry);
            let certificate =
                Certificate::from_raw(Arc::clone(proxy), copy).ok_or(TrustError::Unsupported("X509_dup"))?;
            certificates.push(certificate);
        }
        Ok(Self { certificates })
    }

    /// Number of certificates
    pub fn depth(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn iter(&self) -> slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    pub fn push(&mut self, certificate: Certificate) {
        self.certificates.push(certificate);
    }

    /// Whether an equal certificate is in the chain
    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.certificates.iter().any(|c| c == certificate)
    }

    /// Independent deep copy
    pub fn replicate(&self) -> Result<Self> {
        Self::from_borrowed(&self.certificates)
    }

    /// Owned native stack holding copies of every certificate
    ///
    /// An empty chain gives an empty stack, not a null one.
    pub fn to_native(&self, proxy: &Arc<OpenSslProxy>) -> Result<NativeStack> {
        let stack = NonNull::new(proxy.sk_new_null()).ok_or(TrustError::Unsupported("OPENSSL_sk_new_null"))?;
        let native = NativeStack {
            stack,
            proxy: Arc::clone(proxy),
        };

        for certificate in &self.certificates {
            // SAFETY: the certificate is live; the copy is handed to the stack
            // and freed with it, or freed here if the push fails.
            unsafe {
                let copy = proxy.x509_dup(certificate.as_ptr());
                if copy.is_null() {
                    return Err(TrustError::Unsupported("X509_dup"));
                }
                if proxy.sk_push(native.as_ptr(), copy.cast()) == 0 {
                    proxy.x509_free(copy);
                    return Err(TrustError::Certificate("Failed to build certificate stack".to_string()));
                }
            }
        }

        Ok(native)
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owned `STACK_OF(X509)`; frees the stack and its certificates on drop
pub struct NativeStack {
    stack: NonNull<Stack>,
    proxy: Arc<OpenSslProxy>,
}

impl NativeStack {
    /// Take ownership of a stack of owned certificates; `None` for null
    ///
    /// # Safety
    ///
    /// `stack` must be null or a stack whose certificates hold references the
    /// caller owns, as returned by `X509_STORE_CTX_get1_chain`.
    pub unsafe fn adopt(proxy: Arc<OpenSslProxy>, stack: *mut Stack) -> Option<Self> {
        NonNull::new(stack).map(|stack| Self { stack, proxy })
    }

    pub fn as_ptr(&self) -> *mut Stack {
        self.stack.as_ptr()
    }

    pub fn len(&self) -> usize {
        // SAFETY: the stack is live while `self` is.
        let count = unsafe { self.proxy.sk_num(self.as_ptr()) };
        usize::try_from(count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy back into a [`CertificateChain`]
    pub fn to_chain(&self) -> Result<CertificateChain> {
        // SAFETY: the stack is live and holds certificates.
        unsafe { CertificateChain::from_native(&self.proxy, self.as_ptr()) }
    }
}

impl Drop for NativeStack {
    fn drop(&mut self) {
        // SAFETY: the stack and its entries are ours.
        unsafe { self.proxy.sk_x509_pop_free(self.as_ptr()) }
    }
}
