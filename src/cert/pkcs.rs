//! PKCS#7 and PKCS#12 containers

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use log::debug;

use super::certificate::Certificate;
use super::chain::{CertificateChain, NativeStack};
use crate::common::{Result, TrustError};
use crate::crypto::ffi;
use crate::crypto::{acquire, OpenSslProxy};

/// Owned PKCS#7 structure
pub struct Pkcs7 {
    p7: NonNull<ffi::Pkcs7>,
    proxy: Arc<OpenSslProxy>,
}

// SAFETY: the native object is never mutated after construction.
unsafe impl Send for Pkcs7 {}
unsafe impl Sync for Pkcs7 {}

impl Pkcs7 {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_der_with(acquire(), der)
    }

    pub fn from_der_with(proxy: Arc<OpenSslProxy>, der: &[u8]) -> Result<Self> {
        let p7 = NonNull::new(proxy.d2i_pkcs7(der))
            .ok_or_else(|| TrustError::Pkcs("Failed to decode PKCS#7 structure".to_string()))?;
        Ok(Self { p7, proxy })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        // SAFETY: `self.p7` is live.
        let der = unsafe { self.proxy.i2d_pkcs7(self.p7.as_ptr()) };
        if der.is_empty() {
            return Err(TrustError::Pkcs("Failed to encode PKCS#7 structure".to_string()));
        }
        Ok(der)
    }

    /// Independent deep copy
    pub fn replicate(&self) -> Result<Self> {
        // SAFETY: `self.p7` is live; the duplicate is ours.
        let copy = unsafe { self.proxy.pkcs7_dup(self.p7.as_ptr()) };
        let p7 = NonNull::new(copy).ok_or(TrustError::Unsupported("PKCS7_dup"))?;
        Ok(Self {
            p7,
            proxy: Arc::clone(&self.proxy),
        })
    }
}

impl Drop for Pkcs7 {
    fn drop(&mut self) {
        // SAFETY: owned and freed once.
        unsafe { self.proxy.pkcs7_free(self.p7.as_ptr()) }
    }
}

impl fmt::Debug for Pkcs7 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs7").finish_non_exhaustive()
    }
}

/// Contents of a decrypted PKCS#12 bundle
///
/// The extra certificates are attached to `certificate` as its chain.
#[derive(Debug)]
pub struct ParsedPkcs12 {
    pub certificate: Certificate,
    pub has_private_key: bool,
}

/// Owned PKCS#12 bundle
pub struct Pkcs12 {
    p12: NonNull<ffi::Pkcs12>,
    proxy: Arc<OpenSslProxy>,
}

// SAFETY: mutation only happens through `&mut self`.
unsafe impl Send for Pkcs12 {}
unsafe impl Sync for Pkcs12 {}

impl Pkcs12 {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_der_with(acquire(), der)
    }

    pub fn from_der_with(proxy: Arc<OpenSslProxy>, der: &[u8]) -> Result<Self> {
        let p12 = NonNull::new(proxy.d2i_pkcs12(der))
            .ok_or_else(|| TrustError::Pkcs("Failed to decode PKCS#12 bundle".to_string()))?;
        Ok(Self { p12, proxy })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        // SAFETY: `self.p12` is live.
        let der = unsafe { self.proxy.i2d_pkcs12(self.p12.as_ptr()) };
        if der.is_empty() {
            return Err(TrustError::Pkcs("Failed to encode PKCS#12 bundle".to_string()));
        }
        Ok(der)
    }

    /// Whether `password` matches the bundle's integrity MAC
    pub fn verify_mac(&self, password: &str) -> bool {
        // SAFETY: `self.p12` is live.
        unsafe { self.proxy.pkcs12_verify_mac(self.p12.as_ptr(), password) }
    }

    /// Decrypt the bundle
    pub fn parse(&self, password: &str) -> Result<ParsedPkcs12> {
        // SAFETY: `self.p12` is live.
        let parts = unsafe { self.proxy.pkcs12_parse(self.p12.as_ptr(), password) }
            .ok_or_else(|| TrustError::Pkcs("Failed to decrypt PKCS#12 bundle".to_string()))?;

        // SAFETY: every part is a fresh allocation handed to us by the
        // library; each is adopted or freed exactly once below.
        unsafe {
            let has_private_key = !parts.key.is_null();
            self.proxy.evp_pkey_free(parts.key);

            let extra = NativeStack::adopt(Arc::clone(&self.proxy), parts.ca);
            let mut certificate = Certificate::from_raw(Arc::clone(&self.proxy), parts.cert)
                .ok_or_else(|| TrustError::Pkcs("PKCS#12 bundle holds no certificate".to_string()))?;

            let chain = match extra {
                Some(stack) => stack.to_chain()?,
                None => CertificateChain::new(),
            };
            debug!("PKCS#12 bundle carries {} extra certificates", chain.depth());
            certificate.set_chain(chain);

            Ok(ParsedPkcs12 {
                certificate,
                has_private_key,
            })
        }
    }

    /// Re-encrypt under `new`
    pub fn change_password(&mut self, old: &str, new: &str) -> Result<()> {
        // SAFETY: `self.p12` is live and exclusively borrowed.
        if unsafe { self.proxy.pkcs12_newpass(self.p12.as_ptr(), old, new) } {
            Ok(())
        } else {
            Err(TrustError::Pkcs("Failed to change PKCS#12 password".to_string()))
        }
    }
}

impl Drop for Pkcs12 {
    fn drop(&mut self) {
        // SAFETY: owned and freed once.
        unsafe { self.proxy.pkcs12_free(self.p12.as_ptr()) }
    }
}

impl fmt::Debug for Pkcs12 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs12").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_proxy_rejects_decode() {
        let proxy = Arc::new(OpenSslProxy::unloaded());

        assert!(matches!(Pkcs7::from_der_with(Arc::clone(&proxy), b"\x30\x00"), Err(TrustError::Pkcs(_))));
        assert!(matches!(Pkcs12::from_der_with(proxy, b"\x30\x00"), Err(TrustError::Pkcs(_))));
    }
}
