//! Cipher enumeration

use std::os::raw::c_int;

use serde::Serialize;

use super::c_string;
use crate::crypto::ffi::SslCipher;
use crate::crypto::proxy::OpenSslProxy;

/// One cipher suite the protocol library offers by default
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CipherInfo {
    pub name: String,
    /// Effective secret bits
    pub bits: i32,
    /// Bits the algorithm is capable of
    pub algorithm_bits: i32,
    /// Protocol version that introduced the suite, e.g. `TLSv1.2`
    pub version: String,
}

impl OpenSslProxy {
    /// Cipher suites a default client context enables; empty when the
    /// protocol library is unavailable
    pub fn supported_ciphers(&self) -> Vec<CipherInfo> {
        let method = resolve!(self, TlsClientMethod, Vec::new());
        let ctx_new = resolve!(self, SslCtxNew, Vec::new());
        let ctx_free = resolve!(self, SslCtxFree, Vec::new());
        let ssl_new = resolve!(self, SslNew, Vec::new());
        let ssl_free = resolve!(self, SslFree, Vec::new());
        let get_ciphers = resolve!(self, SslGetCiphers, Vec::new());
        let get_name = resolve!(self, SslCipherGetName, Vec::new());
        let get_bits = resolve!(self, SslCipherGetBits, Vec::new());
        let get_version = resolve!(self, SslCipherGetVersion, Vec::new());

        // SAFETY: every object is created here, used while alive and freed in
        // reverse order; the cipher stack is borrowed from `ssl`.
        unsafe {
            let ctx = ctx_new(method());
            if ctx.is_null() {
                return Vec::new();
            }
            let ssl = ssl_new(ctx);
            if ssl.is_null() {
                ctx_free(ctx);
                return Vec::new();
            }

            let stack = get_ciphers(ssl);
            let ciphers = self
                .sk_entries(stack)
                .into_iter()
                .map(|cipher| {
                    let cipher = cipher as *const SslCipher;
                    let mut algorithm_bits: c_int = 0;
                    let bits = get_bits(cipher, &mut algorithm_bits);
                    CipherInfo {
                        name: c_string(get_name(cipher)).unwrap_or_default(),
                        bits,
                        algorithm_bits,
                        version: c_string(get_version(cipher)).unwrap_or_default(),
                    }
                })
                .collect();

            ssl_free(ssl);
            ctx_free(ctx);
            ciphers
        }
    }
}
