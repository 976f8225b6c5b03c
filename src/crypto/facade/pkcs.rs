//! PKCS#7 and PKCS#12 primitives

use std::ffi::CString;
use std::os::raw::{c_int, c_long};
use std::ptr;

use crate::crypto::ffi::{EvpPkey, Pkcs12, Pkcs7, Stack, X509};
use crate::crypto::proxy::OpenSslProxy;

/// Pieces of a parsed PKCS#12 bundle, each owned by the caller
#[derive(Debug)]
pub struct Pkcs12Parts {
    pub key: *mut EvpPkey,
    pub cert: *mut X509,
    pub ca: *mut Stack,
}

/// Length of `der` as the library's `long`, or `None` if it does not fit
fn der_len(der: &[u8]) -> Option<c_long> {
    c_long::try_from(der.len()).ok()
}

impl OpenSslProxy {
    /// Decode a DER PKCS#7 structure; null when unavailable or malformed
    pub fn d2i_pkcs7(&self, der: &[u8]) -> *mut Pkcs7 {
        let f = resolve!(self, D2iPkcs7, ptr::null_mut());
        let Some(len) = der_len(der) else {
            return ptr::null_mut();
        };
        let mut input = der.as_ptr();
        // SAFETY: `input` covers exactly `len` readable bytes.
        unsafe { f(ptr::null_mut(), &mut input, len) }
    }

    /// Encode a PKCS#7 structure; empty when unavailable or on failure
    ///
    /// # Safety
    ///
    /// `p7` must be live.
    pub unsafe fn i2d_pkcs7(&self, p7: *mut Pkcs7) -> Vec<u8> {
        let f = resolve!(self, I2dPkcs7, Vec::new());
        if p7.is_null() {
            return Vec::new();
        }
        encode_with(|out| f(p7, out))
    }

    /// Deep copy; null when unavailable
    ///
    /// # Safety
    ///
    /// `p7` must be live.
    pub unsafe fn pkcs7_dup(&self, p7: *mut Pkcs7) -> *mut Pkcs7 {
        let f = resolve!(self, Pkcs7Dup, ptr::null_mut());
        if p7.is_null() {
            return ptr::null_mut();
        }
        f(p7)
    }

    /// Free a PKCS#7 structure
    ///
    /// # Safety
    ///
    /// `p7` must be null or owned by the caller.
    pub unsafe fn pkcs7_free(&self, p7: *mut Pkcs7) {
        let f = resolve!(self, Pkcs7Free, ());
        if !p7.is_null() {
            f(p7);
        }
    }

    /// Decode a DER PKCS#12 bundle; null when unavailable or malformed
    pub fn d2i_pkcs12(&self, der: &[u8]) -> *mut Pkcs12 {
        let f = resolve!(self, D2iPkcs12, ptr::null_mut());
        let Some(len) = der_len(der) else {
            return ptr::null_mut();
        };
        let mut input = der.as_ptr();
        // SAFETY: `input` covers exactly `len` readable bytes.
        unsafe { f(ptr::null_mut(), &mut input, len) }
    }

    /// Encode a PKCS#12 bundle; empty when unavailable or on failure
    ///
    /// # Safety
    ///
    /// `p12` must be live.
    pub unsafe fn i2d_pkcs12(&self, p12: *mut Pkcs12) -> Vec<u8> {
        let f = resolve!(self, I2dPkcs12, Vec::new());
        if p12.is_null() {
            return Vec::new();
        }
        encode_with(|out| f(p12, out))
    }

    /// Free a PKCS#12 bundle
    ///
    /// # Safety
    ///
    /// `p12` must be null or owned by the caller.
    pub unsafe fn pkcs12_free(&self, p12: *mut Pkcs12) {
        let f = resolve!(self, Pkcs12Free, ());
        if !p12.is_null() {
            f(p12);
        }
    }

    /// Check the bundle's integrity MAC against `password`
    ///
    /// # Safety
    ///
    /// `p12` must be live.
    pub unsafe fn pkcs12_verify_mac(&self, p12: *mut Pkcs12, password: &str) -> bool {
        let f = resolve!(self, Pkcs12VerifyMac, false);
        let Ok(pass) = CString::new(password) else {
            return false;
        };
        let Ok(len) = c_int::try_from(password.len()) else {
            return false;
        };
        !p12.is_null() && f(p12, pass.as_ptr(), len) == 1
    }

    /// Decrypt a bundle into its key, certificate and extra certificates
    ///
    /// `None` when unavailable or when the password is wrong. Release the
    /// parts with [`evp_pkey_free`](Self::evp_pkey_free),
    /// [`x509_free`](Self::x509_free) and
    /// [`sk_x509_pop_free`](Self::sk_x509_pop_free).
    ///
    /// # Safety
    ///
    /// `p12` must be live.
    pub unsafe fn pkcs12_parse(&self, p12: *mut Pkcs12, password: &str) -> Option<Pkcs12Parts> {
        let f = resolve!(self, Pkcs12Parse, None);
        let pass = CString::new(password).ok()?;
        if p12.is_null() {
            return None;
        }

        let mut parts = Pkcs12Parts {
            key: ptr::null_mut(),
            cert: ptr::null_mut(),
            ca: ptr::null_mut(),
        };
        if f(p12, pass.as_ptr(), &mut parts.key, &mut parts.cert, &mut parts.ca) != 1 {
            return None;
        }
        Some(parts)
    }

    /// Re-encrypt a bundle under a new password
    ///
    /// # Safety
    ///
    /// `p12` must be live.
    pub unsafe fn pkcs12_newpass(&self, p12: *mut Pkcs12, old: &str, new: &str) -> bool {
        let f = resolve!(self, Pkcs12Newpass, false);
        let (Ok(old), Ok(new)) = (CString::new(old), CString::new(new)) else {
            return false;
        };
        !p12.is_null() && f(p12, old.as_ptr(), new.as_ptr()) == 1
    }

    /// Free a private key
    ///
    /// # Safety
    ///
    /// `key` must be null or owned by the caller.
    pub unsafe fn evp_pkey_free(&self, key: *mut EvpPkey) {
        let f = resolve!(self, EvpPkeyFree, ());
        if !key.is_null() {
            f(key);
        }
    }
}

/// Drive an `i2d_*` function: size query, then encode into a buffer
unsafe fn encode_with<F>(mut encode: F) -> Vec<u8>
where
    F: FnMut(*mut *mut u8) -> c_int,
{
    let len = encode(ptr::null_mut());
    if len <= 0 {
        return Vec::new();
    }
    let mut der = vec![0u8; len as usize];
    let mut out = der.as_mut_ptr();
    if encode(&mut out) != len {
        return Vec::new();
    }
    der
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_sentinels() {
        let proxy = OpenSslProxy::unloaded();
        let p7 = ptr::NonNull::<Pkcs7>::dangling().as_ptr();
        let p12 = ptr::NonNull::<Pkcs12>::dangling().as_ptr();

        assert!(proxy.d2i_pkcs7(&[0x30, 0x00]).is_null());
        assert!(proxy.d2i_pkcs12(&[0x30, 0x00]).is_null());
        // SAFETY: with nothing bound none of these dereference the pointers.
        unsafe {
            assert!(proxy.i2d_pkcs7(p7).is_empty());
            assert!(proxy.pkcs7_dup(p7).is_null());
            assert!(proxy.i2d_pkcs12(p12).is_empty());
            assert!(!proxy.pkcs12_verify_mac(p12, "secret"));
            assert!(proxy.pkcs12_parse(p12, "secret").is_none());
            assert!(!proxy.pkcs12_newpass(p12, "old", "new"));
            proxy.pkcs7_free(p7);
            proxy.pkcs12_free(p12);
            proxy.evp_pkey_free(ptr::null_mut());
        }
    }
}
