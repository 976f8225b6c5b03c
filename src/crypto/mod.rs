//! Runtime-resolved OpenSSL
//!
//! The library is located and bound at runtime rather than linked, so one
//! binary works against whichever OpenSSL release the host provides, or
//! degrades gracefully when there is none.
//!
//! - [`candidates`]: where to look
//! - [`library`]: how to open what was found
//! - [`symbols`]: which entry points to bind
//! - [`proxy`]: the process-wide handle tying them together
//! - [`facade`]: typed, null-safe calls through the handle

pub mod candidates;
pub mod environment;
pub mod facade;
pub mod ffi;
pub mod library;
pub mod proxy;
pub mod symbols;

pub use candidates::{Candidate, LibraryKind, SearchTable};
pub use environment::{check_environment, diagnose_environment, EnvironmentInfo, EnvironmentIssue, IssueSeverity};
pub use facade::{CipherInfo, DigestKind, Pkcs12Parts, RawGeneralName, RawTime};
pub use library::{LibraryLoader, RawSymbol, SharedLibrary, SystemLoader};
pub use proxy::{acquire, release, OpenSslProxy, ProxyCell};
pub use symbols::{Symbol, SymbolTable};
