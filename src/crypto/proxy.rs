//! The OpenSSL proxy
//!
//! [`OpenSslProxy`] owns the crypto and protocol libraries found at runtime
//! together with the symbol table bound against them. One instance is shared
//! process-wide through [`acquire`]; [`release`] drops it so the next
//! `acquire` probes again.

use std::fmt;
use std::mem;
use std::os::raw::c_void;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::candidates::{platform_table, Candidate, LibraryKind, SearchTable};
use super::ffi;
use super::library::{LibraryLoader, RawSymbol, SharedLibrary, SystemLoader};
use super::symbols::{Symbol, SymbolTable};
use crate::config::global_config;

/// How a one-time initializer is invoked
#[derive(Debug, Clone, Copy)]
enum InitCall {
    /// `fn()`; any return value is ignored
    Plain,
    /// `fn(u64 opts, const void *settings)`
    WithOptions(u64),
}

/// Initializer groups run after the protocol library loads. Within a group
/// the first exported name is called and the rest are skipped; a group with
/// no exported name is skipped entirely.
const INITIALIZERS: &[&[(&str, InitCall)]] = &[
    &[
        ("SSL_library_init", InitCall::Plain),
        ("OPENSSL_init_ssl", InitCall::WithOptions(0)),
    ],
    &[
        ("OpenSSL_add_all_algorithms", InitCall::Plain),
        ("OPENSSL_add_all_algorithms", InitCall::Plain),
        ("OpenSSL_add_all_algorithms_conf", InitCall::Plain),
        ("OPENSSL_add_all_algorithms_conf", InitCall::Plain),
        ("OpenSSL_add_all_algorithms_noconf", InitCall::Plain),
        ("OPENSSL_add_all_algorithms_noconf", InitCall::Plain),
        ("OPENSSL_init_crypto", InitCall::WithOptions(ffi::OPENSSL_INIT_ADD_ALL)),
    ],
    &[
        ("OpenSSL_add_all_ciphers", InitCall::Plain),
        ("OPENSSL_add_all_ciphers", InitCall::Plain),
    ],
    &[
        ("OpenSSL_add_all_digests", InitCall::Plain),
        ("OPENSSL_add_all_digests", InitCall::Plain),
    ],
];

/// Symbols chain verification cannot run without
pub const VERIFY_SYMBOLS: &[Symbol] = &[
    Symbol::X509StoreNew,
    Symbol::X509StoreFree,
    Symbol::X509StoreCtxNew,
    Symbol::X509StoreCtxFree,
    Symbol::X509StoreCtxInit,
    Symbol::X509StoreCtxSetPurpose,
    Symbol::X509StoreCtxGetError,
    Symbol::X509VerifyCert,
];

/// Runtime handle onto the crypto and protocol libraries
///
/// Field order matters for drop: the table goes first, then the protocol
/// library, then the crypto library it depends on.
pub struct OpenSslProxy {
    symbols: SymbolTable,
    ssl: Option<Box<dyn SharedLibrary>>,
    crypto: Option<Box<dyn SharedLibrary>>,
    initializers: Vec<&'static str>,
}

impl fmt::Debug for OpenSslProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSslProxy")
            .field("crypto", &self.crypto_origin())
            .field("ssl", &self.ssl_origin())
            .field("resolved", &self.symbols.resolved_count())
            .finish()
    }
}

impl OpenSslProxy {
    /// Probe the platform search table and bind everything that was found
    ///
    /// # Arguments
    ///
    /// * `loader` - Opens candidate libraries
    /// * `override_dir` - Directory searched before the built-in list
    pub fn probe<L: LibraryLoader + ?Sized>(loader: &L, override_dir: Option<&Path>) -> Self {
        Self::probe_table(loader, platform_table(), override_dir)
    }

    /// [`probe`](Self::probe) against an explicit search table
    pub fn probe_table<L: LibraryLoader + ?Sized>(
        loader: &L,
        table: &SearchTable,
        override_dir: Option<&Path>,
    ) -> Self {
        let crypto = open_first(loader, table, LibraryKind::Crypto, override_dir);
        let ssl = open_first(loader, table, LibraryKind::Ssl, override_dir);
        Self::from_libraries(crypto, ssl)
    }

    /// Bind symbols against already-open libraries and run initializers
    pub fn from_libraries(
        crypto: Option<Box<dyn SharedLibrary>>,
        ssl: Option<Box<dyn SharedLibrary>>,
    ) -> Self {
        let symbols = SymbolTable::bind(|kind, name| {
            let library = match kind {
                LibraryKind::Crypto => crypto.as_deref(),
                LibraryKind::Ssl => ssl.as_deref(),
            };
            library.and_then(|lib| lib.symbol(name))
        });

        let mut proxy = Self {
            symbols,
            ssl,
            crypto,
            initializers: Vec::new(),
        };

        if proxy.ssl.is_some() {
            proxy.initializers = proxy.run_initializers();
        }

        match proxy.crypto_origin() {
            Some(origin) => info!("Using crypto library {}", origin),
            None => warn!("No usable crypto library found; certificate operations are unavailable"),
        }
        if let Some(origin) = proxy.ssl_origin() {
            info!("Using protocol library {}", origin);
        }

        proxy
    }

    /// A proxy with no libraries; every operation reports itself unavailable
    pub fn unloaded() -> Self {
        Self {
            symbols: SymbolTable::empty(),
            ssl: None,
            crypto: None,
            initializers: Vec::new(),
        }
    }

    /// A proxy over an explicit symbol table and no libraries
    ///
    /// The addresses in `symbols` must stay valid for the proxy's lifetime,
    /// which holds for functions compiled into the current binary.
    pub fn with_symbols(symbols: SymbolTable) -> Self {
        Self {
            symbols,
            ssl: None,
            crypto: None,
            initializers: Vec::new(),
        }
    }

    fn run_initializers(&self) -> Vec<&'static str> {
        let mut called = Vec::new();

        for group in INITIALIZERS {
            let Some((name, call, address)) = group.iter().find_map(|&(name, call)| {
                self.lookup_any(name).map(|address| (name, call, address))
            }) else {
                trace!("No initializer available among {:?}", group);
                continue;
            };

            debug!("Calling initializer {}", name);
            // SAFETY: every name in INITIALIZERS is a documented OpenSSL
            // initializer whose signature matches its InitCall tag.
            unsafe {
                match call {
                    InitCall::Plain => {
                        let f: ffi::InitPlain = mem::transmute_copy(&address.as_ptr());
                        f();
                    }
                    InitCall::WithOptions(opts) => {
                        let f: ffi::InitWithOptions = mem::transmute_copy(&address.as_ptr());
                        f(opts, ptr::null());
                    }
                }
            }
            called.push(name);
        }

        called
    }

    /// Look `name` up in the protocol library, then the crypto library
    fn lookup_any(&self, name: &str) -> Option<RawSymbol> {
        self.ssl
            .as_deref()
            .and_then(|lib| lib.symbol(name))
            .or_else(|| self.crypto.as_deref().and_then(|lib| lib.symbol(name)))
    }

    /// Whether a crypto library is loaded
    pub fn has_crypto_support(&self) -> bool {
        self.crypto.is_some()
    }

    /// Whether a protocol library is loaded
    pub fn has_protocol_support(&self) -> bool {
        self.ssl.is_some()
    }

    /// Whether every symbol chain verification needs is bound
    pub fn supports_verification(&self) -> bool {
        self.symbols.has_all(VERIFY_SYMBOLS)
    }

    /// Where the crypto library was loaded from
    pub fn crypto_origin(&self) -> Option<&str> {
        self.crypto.as_deref().map(|lib| lib.origin())
    }

    /// Where the protocol library was loaded from
    pub fn ssl_origin(&self) -> Option<&str> {
        self.ssl.as_deref().map(|lib| lib.origin())
    }

    /// The bound symbol table
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Initializers that ran, in order
    pub fn initializers(&self) -> &[&'static str] {
        &self.initializers
    }

    /// Typed view of a bound symbol
    ///
    /// # Safety
    ///
    /// `F` must be the function-pointer type matching the symbol's C
    /// signature.
    pub(crate) unsafe fn func<F: Copy>(&self, symbol: Symbol) -> Option<F> {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
        self.symbols
            .get(symbol)
            .map(|raw| mem::transmute_copy::<*mut c_void, F>(&raw.as_ptr()))
    }
}

fn open_first<L: LibraryLoader + ?Sized>(
    loader: &L,
    table: &SearchTable,
    kind: LibraryKind,
    override_dir: Option<&Path>,
) -> Option<Box<dyn SharedLibrary>> {
    for candidate in table.candidates(kind, override_dir) {
        if let Candidate::File(ref path) = candidate {
            if !loader.is_readable(path) {
                continue;
            }
        }

        debug!("Trying {} library {}", kind, candidate);
        if let Some(library) = loader.open(&candidate) {
            return Some(library);
        }
    }

    debug!("No {} library found", kind);
    None
}

/// Process-wide slot holding at most one proxy
///
/// Initialization runs under the write lock and is re-checked after taking
/// it, so concurrent first callers wait for a single probe.
pub struct ProxyCell {
    slot: RwLock<Option<Arc<OpenSslProxy>>>,
    probes: AtomicUsize,
}

impl Default for ProxyCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyCell {
    /// An empty cell
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            probes: AtomicUsize::new(0),
        }
    }

    /// The current proxy, creating it with `init` if the cell is empty
    pub fn acquire_with<F>(&self, init: F) -> Arc<OpenSslProxy>
    where
        F: FnOnce() -> OpenSslProxy,
    {
        if let Some(proxy) = self.slot.read().as_ref() {
            return Arc::clone(proxy);
        }

        let mut slot = self.slot.write();
        if let Some(proxy) = slot.as_ref() {
            return Arc::clone(proxy);
        }

        self.probes.fetch_add(1, Ordering::SeqCst);
        let proxy = Arc::new(init());
        *slot = Some(Arc::clone(&proxy));
        proxy
    }

    /// Empty the cell; returns whether it held a proxy
    ///
    /// Libraries are unloaded once the last outstanding reference is dropped.
    pub fn release(&self) -> bool {
        self.slot.write().take().is_some()
    }

    /// Whether the cell currently holds a proxy
    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }

    /// How many times `init` has run
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

static PROXY: Lazy<ProxyCell> = Lazy::new(ProxyCell::new);

/// The process-wide proxy, probing the system on first use
///
/// The library directory override comes from the `openssl.path` setting.
pub fn acquire() -> Arc<OpenSslProxy> {
    PROXY.acquire_with(|| {
        let override_dir = global_config().openssl.path.as_deref();
        OpenSslProxy::probe(&SystemLoader, override_dir)
    })
}

/// Drop the process-wide proxy so the next [`acquire`] probes again
pub fn release() -> bool {
    let released = PROXY.release();
    if released {
        info!("Released OpenSSL proxy");
    }
    released
}
