//! Crash-safe calls into the resolved library
//!
//! One method on [`OpenSslProxy`] per primitive. Each looks up its symbol and,
//! when the symbol is missing, returns the documented sentinel (null pointer,
//! `-1`, an empty collection, `None` or `false`) without doing anything else.
//! Otherwise the arguments are forwarded unchanged.
//!
//! Methods taking native pointers are `unsafe`: the caller vouches that the
//! pointer is live and of the right type. Every method that hands out a native
//! object the caller owns has a matching `*_free` here, so nothing above this
//! layer touches the library allocator.

use std::ffi::CStr;
use std::os::raw::{c_char, c_long, c_void};
use std::ptr;

use super::proxy::OpenSslProxy;

/// Bind a symbol to its typed function pointer or return `$sentinel`
macro_rules! resolve {
    ($proxy:expr, $sym:ident, $sentinel:expr) => {
        // SAFETY: `ffi::$sym` is declared with the C signature of `Symbol::$sym`.
        match unsafe {
            $proxy.func::<$crate::crypto::ffi::$sym>($crate::crypto::symbols::Symbol::$sym)
        } {
            Some(f) => f,
            None => return $sentinel,
        }
    };
}

mod cipher;
mod pkcs;
mod stack;
mod store;
mod x509;

pub use cipher::CipherInfo;
pub use pkcs::Pkcs12Parts;
pub use x509::{DigestKind, RawGeneralName, RawTime};

/// Copy a NUL-terminated C string; `None` for null
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

impl OpenSslProxy {
    /// Version banner of the loaded crypto library
    pub fn version(&self) -> Option<String> {
        let f = resolve!(self, OpensslVersion, None);
        // SAFETY: returns a pointer to a static string.
        unsafe { c_string(f(crate::crypto::ffi::OPENSSL_VERSION)) }
    }

    /// Release memory the library allocated for us
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from the library allocator and not be used
    /// afterwards.
    pub unsafe fn crypto_free(&self, ptr: *mut c_void) {
        let f = resolve!(self, CryptoFree, ());
        if !ptr.is_null() {
            f(ptr, ptr::null(), 0);
        }
    }

    /// Copy and release a library-allocated C string
    ///
    /// # Safety
    ///
    /// Same as [`crypto_free`](Self::crypto_free).
    pub(crate) unsafe fn take_string(&self, ptr: *mut c_char) -> Option<String> {
        let text = c_string(ptr);
        self.crypto_free(ptr.cast());
        text
    }

    /// Discard the thread's queued library errors
    pub fn clear_errors(&self) {
        let f = resolve!(self, ErrClearError, ());
        // SAFETY: no arguments.
        unsafe { f() }
    }

    /// Drain the thread's queued library errors as text, oldest first
    pub fn drain_errors(&self) -> Vec<String> {
        let get = resolve!(self, ErrGetError, Vec::new());
        let describe = resolve!(self, ErrErrorStringN, Vec::new());

        let mut errors = Vec::new();
        loop {
            // SAFETY: no arguments.
            let code = unsafe { get() };
            if code == 0 {
                break;
            }
            let mut buf = [0 as c_char; 256];
            // SAFETY: the buffer length is passed along and the result is
            // always NUL-terminated.
            let text = unsafe {
                describe(code, buf.as_mut_ptr(), buf.len());
                c_string(buf.as_ptr())
            };
            errors.push(text.unwrap_or_else(|| format!("error:{:08X}", code)));
        }
        errors
    }

    /// Library description of a verification error code
    pub fn verify_error_string(&self, code: i32) -> Option<String> {
        let f = resolve!(self, X509VerifyCertErrorString, None);
        // SAFETY: returns a pointer to a static string.
        unsafe { c_string(f(c_long::from(code))) }
    }
}
