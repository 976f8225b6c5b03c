//! Library search order
//!
//! The directories and file names probed for the crypto and protocol
//! libraries are plain ordered tables per platform. Directories are walked in
//! order and every file name is tried inside each directory before moving on.
//! The empty directory stands for "let the dynamic linker search".

use std::fmt;
use std::path::{Path, PathBuf};

/// Which of the two libraries a symbol or candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryKind {
    /// libcrypto / libeay32
    Crypto,
    /// libssl / ssleay32
    Ssl,
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Crypto => write!(f, "crypto"),
            LibraryKind::Ssl => write!(f, "ssl"),
        }
    }
}

/// One thing to try loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A concrete file, checked for readability first
    File(PathBuf),
    /// A bare file name resolved by the platform's own search rules
    SystemName(String),
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::File(path) => write!(f, "{}", path.display()),
            Candidate::SystemName(name) => write!(f, "{} (system search)", name),
        }
    }
}

/// Directories and file names for one platform
#[derive(Debug, Clone, Copy)]
pub struct SearchTable {
    pub dirs: &'static [&'static str],
    pub crypto_names: &'static [&'static str],
    pub ssl_names: &'static [&'static str],
}

impl SearchTable {
    /// File names for `kind`, most preferred first
    pub fn names(&self, kind: LibraryKind) -> &'static [&'static str] {
        match kind {
            LibraryKind::Crypto => self.crypto_names,
            LibraryKind::Ssl => self.ssl_names,
        }
    }

    /// Expand into the ordered candidate list
    ///
    /// `override_dir` is searched before every built-in directory.
    pub fn candidates(&self, kind: LibraryKind, override_dir: Option<&Path>) -> Vec<Candidate> {
        let names = self.names(kind);
        let mut out = Vec::with_capacity((self.dirs.len() + 1) * names.len());

        if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
            out.extend(names.iter().map(|name| Candidate::File(dir.join(name))));
        }

        for dir in self.dirs {
            for name in names {
                if dir.is_empty() {
                    out.push(Candidate::SystemName((*name).to_string()));
                } else {
                    out.push(Candidate::File(Path::new(dir).join(name)));
                }
            }
        }

        out
    }
}

pub const LINUX: SearchTable = SearchTable {
    dirs: &[
        "/usr/lib64",
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib/aarch64-linux-gnu",
        "/usr/lib",
        "/usr/ssl/lib",
        "/usr/local/lib",
        "/usr/local/openssl/lib",
        "/usr/local/ssl/lib",
        "/opt/openssl/lib",
        "/lib64",
        "/lib/x86_64-linux-gnu",
        "/lib",
        "",
    ],
    crypto_names: &[
        "libcrypto.so.3",
        "libcrypto.so.1.1",
        "libcrypto.so.1.0.0",
        "libcrypto.so",
        "libcrypto.so.0",
    ],
    ssl_names: &[
        "libssl.so.3",
        "libssl.so.1.1",
        "libssl.so.1.0.0",
        "libssl.so",
        "libssl.so.0",
    ],
};

// No /usr/lib: the libcrypto stub there aborts any process that is not one of
// Apple's own binaries.
pub const MACOS: SearchTable = SearchTable {
    dirs: &[
        "/opt/homebrew/opt/openssl@3/lib",
        "/usr/local/opt/openssl@3/lib",
        "/opt/homebrew/opt/openssl@1.1/lib",
        "/usr/local/opt/openssl@1.1/lib",
        "/opt/homebrew/lib",
        "/usr/local/lib",
        "/opt/local/lib",
    ],
    crypto_names: &["libcrypto.3.dylib", "libcrypto.1.1.dylib", "libcrypto.dylib"],
    ssl_names: &["libssl.3.dylib", "libssl.1.1.dylib", "libssl.dylib"],
};

pub const WINDOWS: SearchTable = SearchTable {
    dirs: &[""],
    crypto_names: &[
        "libcrypto-3-x64.dll",
        "libcrypto-3.dll",
        "libcrypto-1_1-x64.dll",
        "libcrypto-1_1.dll",
        "libeay32.dll",
    ],
    ssl_names: &[
        "libssl-3-x64.dll",
        "libssl-3.dll",
        "libssl-1_1-x64.dll",
        "libssl-1_1.dll",
        "ssleay32.dll",
    ],
};

/// Search table for the platform we were built for
pub fn platform_table() -> &'static SearchTable {
    if cfg!(target_os = "macos") {
        &MACOS
    } else if cfg!(windows) {
        &WINDOWS
    } else {
        &LINUX
    }
}
