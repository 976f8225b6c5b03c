//! Shared-library loading
//!
//! [`LibraryLoader`] turns a [`Candidate`] into an open [`SharedLibrary`].
//! [`SystemLoader`] is the real implementation over `libloading`; tests swap in
//! loaders that hand out in-process fakes.

use std::ffi::{CString, OsStr};
use std::fmt;
use std::os::raw::c_void;
use std::path::Path;
use std::ptr::NonNull;

use log::{debug, trace};

use super::candidates::Candidate;
use crate::common::fs::is_readable;

/// Address of a resolved symbol
///
/// Never null. Only meaningful while the library it came from stays loaded,
/// which [`OpenSslProxy`](super::OpenSslProxy) guarantees by owning both.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

// SAFETY: a code address is immutable and valid from any thread.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    /// Wrap an address, rejecting null
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawSymbol)
    }

    /// The raw address
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for RawSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSymbol({:p})", self.0)
    }
}

/// An open shared library
///
/// Dropping the value closes the OS handle.
pub trait SharedLibrary: Send + Sync {
    /// Look up `name`; `None` when the library does not export it
    fn symbol(&self, name: &str) -> Option<RawSymbol>;

    /// Where the library came from, for diagnostics
    fn origin(&self) -> &str;
}

/// Opens shared libraries on behalf of the proxy
pub trait LibraryLoader: Send + Sync {
    /// Whether `path` is worth handing to [`open`](Self::open)
    fn is_readable(&self, path: &Path) -> bool;

    /// Open `candidate`, or `None` if the OS loader refuses it
    fn open(&self, candidate: &Candidate) -> Option<Box<dyn SharedLibrary>>;
}

/// Loader backed by the operating system's dynamic linker
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl LibraryLoader for SystemLoader {
    fn is_readable(&self, path: &Path) -> bool {
        is_readable(path)
    }

    fn open(&self, candidate: &Candidate) -> Option<Box<dyn SharedLibrary>> {
        let target: &OsStr = match candidate {
            Candidate::File(path) => path.as_os_str(),
            Candidate::SystemName(name) => OsStr::new(name.as_str()),
        };

        match open_library(target) {
            Ok(library) => {
                debug!("Loaded {}", candidate);
                Some(Box::new(LoadedLibrary {
                    origin: candidate.to_string(),
                    library,
                }))
            }
            Err(e) => {
                trace!("Could not load {}: {}", candidate, e);
                None
            }
        }
    }
}

/// Exports symbols globally so libssl can bind against the libcrypto we
/// loaded, mirroring what a link-time dependency would do.
#[cfg(unix)]
fn open_library(target: &OsStr) -> Result<libloading::Library, libloading::Error> {
    use libloading::os::unix::{Library, RTLD_GLOBAL, RTLD_NOW};

    // SAFETY: loading OpenSSL runs its constructors, which have no
    // preconditions on our side.
    unsafe { Library::open(Some(target), RTLD_NOW | RTLD_GLOBAL) }.map(Into::into)
}

#[cfg(not(unix))]
fn open_library(target: &OsStr) -> Result<libloading::Library, libloading::Error> {
    // SAFETY: see the unix variant.
    unsafe { libloading::Library::new(target) }
}

/// A library opened through [`SystemLoader`]
struct LoadedLibrary {
    origin: String,
    library: libloading::Library,
}

impl SharedLibrary for LoadedLibrary {
    fn symbol(&self, name: &str) -> Option<RawSymbol> {
        let name = CString::new(name).ok()?;
        // SAFETY: the symbol is read as an untyped address; nothing is called
        // here, and the typed view is produced later by the facade.
        let symbol = unsafe { self.library.get::<*mut c_void>(name.as_bytes_with_nul()) }.ok()?;
        RawSymbol::new(*symbol)
    }

    fn origin(&self) -> &str {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_raw_symbol_rejects_null() {
        assert!(RawSymbol::new(std::ptr::null_mut()).is_none());

        let mut value = 0u8;
        let symbol = RawSymbol::new(&mut value as *mut u8 as *mut c_void).unwrap();
        assert_eq!(symbol.as_ptr() as *const u8, &value as *const u8);
    }

    #[test]
    fn test_system_loader_refuses_missing_file() {
        let loader = SystemLoader;
        let candidate = Candidate::File(PathBuf::from("/nonexistent/libcrypto.so.3"));

        assert!(!loader.is_readable(Path::new("/nonexistent/libcrypto.so.3")));
        assert!(loader.open(&candidate).is_none());
    }
}
