//! Trust stores and verification contexts

use std::ffi::CString;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr;

use crate::crypto::ffi::{self, Stack, X509Store, X509StoreCtx, X509};
use crate::crypto::proxy::OpenSslProxy;

impl OpenSslProxy {
    /// New empty trust store; null when unavailable
    pub fn x509_store_new(&self) -> *mut X509Store {
        let f = resolve!(self, X509StoreNew, ptr::null_mut());
        // SAFETY: no arguments.
        unsafe { f() }
    }

    /// Free a trust store
    ///
    /// # Safety
    ///
    /// `store` must be null or owned by the caller.
    pub unsafe fn x509_store_free(&self, store: *mut X509Store) {
        let f = resolve!(self, X509StoreFree, ());
        if !store.is_null() {
            f(store);
        }
    }

    /// Add a trusted certificate; `1` on success, `0` on failure or when
    /// unavailable
    ///
    /// The store takes its own reference, so the caller keeps ownership of
    /// `x509`.
    ///
    /// # Safety
    ///
    /// Both pointers must be live.
    pub unsafe fn x509_store_add_cert(&self, store: *mut X509Store, x509: *mut X509) -> c_int {
        let f = resolve!(self, X509StoreAddCert, 0);
        if store.is_null() || x509.is_null() {
            return 0;
        }
        f(store, x509)
    }

    /// Load every certificate of a PEM bundle into `store`
    ///
    /// `false` when the file cannot be read or holds no certificate, or when
    /// the lookup symbols are unavailable.
    ///
    /// # Safety
    ///
    /// `store` must be a live store.
    pub unsafe fn x509_store_load_file(&self, store: *mut X509Store, path: &Path) -> bool {
        let add_lookup = resolve!(self, X509StoreAddLookup, false);
        let file_method = resolve!(self, X509LookupFile, false);
        let ctrl = resolve!(self, X509LookupCtrl, false);
        if store.is_null() {
            return false;
        }

        let Some(path) = path.to_str().and_then(|p| CString::new(p).ok()) else {
            return false;
        };

        let lookup = add_lookup(store, file_method());
        if lookup.is_null() {
            return false;
        }
        ctrl(
            lookup,
            ffi::X509_L_FILE_LOAD,
            path.as_ptr(),
            ffi::X509_FILETYPE_PEM,
            ptr::null_mut(),
        ) > 0
    }

    /// New verification context; null when unavailable
    pub fn x509_store_ctx_new(&self) -> *mut X509StoreCtx {
        let f = resolve!(self, X509StoreCtxNew, ptr::null_mut());
        // SAFETY: no arguments.
        unsafe { f() }
    }

    /// Free a verification context
    ///
    /// # Safety
    ///
    /// `ctx` must be null or owned by the caller.
    pub unsafe fn x509_store_ctx_free(&self, ctx: *mut X509StoreCtx) {
        let f = resolve!(self, X509StoreCtxFree, ());
        if !ctx.is_null() {
            f(ctx);
        }
    }

    /// Bind a context to a store, a target and optional untrusted
    /// intermediates; `1` on success, `0` otherwise
    ///
    /// # Safety
    ///
    /// `ctx`, `store` and `x509` must be live, and `chain` null or a live
    /// stack, all outliving the context's use.
    pub unsafe fn x509_store_ctx_init(
        &self,
        ctx: *mut X509StoreCtx,
        store: *mut X509Store,
        x509: *mut X509,
        chain: *mut Stack,
    ) -> c_int {
        let f = resolve!(self, X509StoreCtxInit, 0);
        if ctx.is_null() || store.is_null() || x509.is_null() {
            return 0;
        }
        f(ctx, store, x509, chain)
    }

    /// Set the purpose to check; `0` on failure or when unavailable
    ///
    /// # Safety
    ///
    /// `ctx` must be live.
    pub unsafe fn x509_store_ctx_set_purpose(&self, ctx: *mut X509StoreCtx, purpose: c_int) -> c_int {
        let f = resolve!(self, X509StoreCtxSetPurpose, 0);
        f(ctx, purpose)
    }

    /// Error code recorded by the last verification; `-1` when unavailable
    ///
    /// # Safety
    ///
    /// `ctx` must be live.
    pub unsafe fn x509_store_ctx_get_error(&self, ctx: *mut X509StoreCtx) -> c_int {
        let f = resolve!(self, X509StoreCtxGetError, -1);
        f(ctx)
    }

    /// Owned copy of the chain the verifier built; null when unavailable
    ///
    /// Free with [`sk_x509_pop_free`](Self::sk_x509_pop_free).
    ///
    /// # Safety
    ///
    /// `ctx` must be live.
    pub unsafe fn x509_store_ctx_get1_chain(&self, ctx: *mut X509StoreCtx) -> *mut Stack {
        let f = resolve!(self, X509StoreCtxGet1Chain, ptr::null_mut());
        f(ctx)
    }

    /// Run chain verification; `1` verified, `0` failed, `-1` unavailable or
    /// not runnable
    ///
    /// # Safety
    ///
    /// `ctx` must be live and initialized.
    pub unsafe fn x509_verify_cert(&self, ctx: *mut X509StoreCtx) -> c_int {
        let f = resolve!(self, X509VerifyCert, -1);
        f(ctx)
    }
}
