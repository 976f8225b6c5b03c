//! `STACK_OF(...)` primitives

use std::os::raw::{c_int, c_void};
use std::ptr;

use crate::crypto::ffi::{self, Stack, X509};
use crate::crypto::proxy::OpenSslProxy;

impl OpenSslProxy {
    /// New empty stack; null when unavailable
    pub fn sk_new_null(&self) -> *mut Stack {
        let f = resolve!(self, SkNewNull, ptr::null_mut());
        // SAFETY: no arguments.
        unsafe { f() }
    }

    /// Append `item`; returns the new length, or `0` on failure
    ///
    /// # Safety
    ///
    /// `stack` must be a live stack; ownership of `item` moves to it.
    pub unsafe fn sk_push(&self, stack: *mut Stack, item: *mut c_void) -> c_int {
        let f = resolve!(self, SkPush, 0);
        if stack.is_null() {
            return 0;
        }
        f(stack, item)
    }

    /// Number of entries; `-1` when unavailable or for a null stack
    ///
    /// # Safety
    ///
    /// `stack` must be null or a live stack.
    pub unsafe fn sk_num(&self, stack: *const Stack) -> c_int {
        let f = resolve!(self, SkNum, -1);
        if stack.is_null() {
            return -1;
        }
        f(stack)
    }

    /// Borrowed entry at `index`; null when unavailable or out of range
    ///
    /// # Safety
    ///
    /// `stack` must be a live stack.
    pub unsafe fn sk_value(&self, stack: *const Stack, index: c_int) -> *mut c_void {
        let f = resolve!(self, SkValue, ptr::null_mut());
        if stack.is_null() {
            return ptr::null_mut();
        }
        f(stack, index)
    }

    /// Free the stack itself, leaving its entries alone
    ///
    /// # Safety
    ///
    /// `stack` must be null or owned by the caller.
    pub unsafe fn sk_free(&self, stack: *mut Stack) {
        let f = resolve!(self, SkFree, ());
        if !stack.is_null() {
            f(stack);
        }
    }

    /// Free a stack of certificates together with every certificate in it
    ///
    /// # Safety
    ///
    /// `stack` must be null or an owned stack whose entries are owned
    /// `X509` objects.
    pub unsafe fn sk_x509_pop_free(&self, stack: *mut Stack) {
        let pop_free = resolve!(self, SkPopFree, ());
        // The library calls the element destructor without a null check.
        let x509_free = resolve!(self, X509Free, ());
        if stack.is_null() {
            return;
        }
        let x509_free = std::mem::transmute::<ffi::X509Free, unsafe extern "C" fn(*mut c_void)>(x509_free);
        pop_free(stack, Some(x509_free));
    }

    /// Borrowed, non-null entries of a stack in order
    ///
    /// # Safety
    ///
    /// `stack` must be null or a live stack that outlives the returned
    /// pointers.
    pub unsafe fn sk_entries(&self, stack: *const Stack) -> Vec<*mut c_void> {
        let count = self.sk_num(stack);
        (0..count.max(0))
            .map(|i| self.sk_value(stack, i))
            .filter(|entry| !entry.is_null())
            .collect()
    }

    /// Borrowed certificate entries of a stack
    ///
    /// # Safety
    ///
    /// As for [`sk_entries`](Self::sk_entries), and every entry must be an
    /// `X509`.
    pub unsafe fn sk_x509_entries(&self, stack: *const Stack) -> Vec<*mut X509> {
        self.sk_entries(stack)
            .into_iter()
            .map(|entry| entry as *mut X509)
            .collect()
    }
}
