//! Symbol binding table
//!
//! Every entry point the crate calls is listed once below together with the
//! library that exports it and the names it has carried across releases.
//! Binding walks that table; an entry whose names are all missing stays empty
//! and the operations that need it report themselves unsupported.

use log::{debug, trace};

use super::candidates::LibraryKind;
use super::library::RawSymbol;

macro_rules! symbol_table {
    ($( $variant:ident => $lib:ident [$($name:literal),+ $(,)?] ),* $(,)?) => {
        /// Entry points resolved at runtime
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Symbol {
            $( $variant, )*
        }

        impl Symbol {
            /// Every symbol, in binding order
            pub const ALL: &'static [Symbol] = &[ $( Symbol::$variant, )* ];

            /// Library expected to export this symbol
            pub fn library(self) -> LibraryKind {
                match self {
                    $( Symbol::$variant => LibraryKind::$lib, )*
                }
            }

            /// Export names, newest first
            pub fn names(self) -> &'static [&'static str] {
                match self {
                    $( Symbol::$variant => &[$($name),+], )*
                }
            }
        }
    };
}

symbol_table! {
    X509Free => Crypto ["X509_free"],
    X509Dup => Crypto ["X509_dup"],
    D2iX509 => Crypto ["d2i_X509"],
    I2dX509 => Crypto ["i2d_X509"],
    X509Cmp => Crypto ["X509_cmp"],
    X509GetSubjectName => Crypto ["X509_get_subject_name"],
    X509GetIssuerName => Crypto ["X509_get_issuer_name"],
    X509NameOneline => Crypto ["X509_NAME_oneline"],
    X509GetSerialNumber => Crypto ["X509_get_serialNumber"],
    Asn1IntegerToBn => Crypto ["ASN1_INTEGER_to_BN"],
    BnBn2hex => Crypto ["BN_bn2hex"],
    BnFree => Crypto ["BN_free"],
    X509GetNotBefore => Crypto ["X509_get0_notBefore", "X509_getm_notBefore"],
    X509GetNotAfter => Crypto ["X509_get0_notAfter", "X509_getm_notAfter"],
    Asn1StringData => Crypto ["ASN1_STRING_get0_data", "ASN1_STRING_data"],
    Asn1StringLength => Crypto ["ASN1_STRING_length"],
    Asn1StringType => Crypto ["ASN1_STRING_type"],
    X509GetPubkey => Crypto ["X509_get_pubkey"],
    EvpPkeyFree => Crypto ["EVP_PKEY_free"],
    EvpPkeyBits => Crypto ["EVP_PKEY_get_bits", "EVP_PKEY_bits"],
    EvpPkeyBaseId => Crypto ["EVP_PKEY_get_base_id", "EVP_PKEY_base_id"],
    X509GetSignatureNid => Crypto ["X509_get_signature_nid"],
    ObjNid2ln => Crypto ["OBJ_nid2ln"],
    X509Digest => Crypto ["X509_digest"],
    EvpMd5 => Crypto ["EVP_md5"],
    EvpSha1 => Crypto ["EVP_sha1"],
    EvpSha256 => Crypto ["EVP_sha256"],
    X509CheckPurpose => Crypto ["X509_check_purpose"],
    X509CheckIssued => Crypto ["X509_check_issued"],
    X509GetKeyUsage => Crypto ["X509_get_key_usage"],
    X509GetExtendedKeyUsage => Crypto ["X509_get_extended_key_usage"],
    X509GetExtD2i => Crypto ["X509_get_ext_d2i"],
    GeneralNamesFree => Crypto ["GENERAL_NAMES_free"],

    SkNewNull => Crypto ["OPENSSL_sk_new_null", "sk_new_null"],
    SkPush => Crypto ["OPENSSL_sk_push", "sk_push"],
    SkNum => Crypto ["OPENSSL_sk_num", "sk_num"],
    SkValue => Crypto ["OPENSSL_sk_value", "sk_value"],
    SkFree => Crypto ["OPENSSL_sk_free", "sk_free"],
    SkPopFree => Crypto ["OPENSSL_sk_pop_free", "sk_pop_free"],

    X509StoreNew => Crypto ["X509_STORE_new"],
    X509StoreFree => Crypto ["X509_STORE_free"],
    X509StoreAddCert => Crypto ["X509_STORE_add_cert"],
    X509StoreAddLookup => Crypto ["X509_STORE_add_lookup"],
    X509LookupFile => Crypto ["X509_LOOKUP_file"],
    X509LookupCtrl => Crypto ["X509_LOOKUP_ctrl"],
    X509StoreCtxNew => Crypto ["X509_STORE_CTX_new"],
    X509StoreCtxFree => Crypto ["X509_STORE_CTX_free"],
    X509StoreCtxInit => Crypto ["X509_STORE_CTX_init"],
    X509StoreCtxSetPurpose => Crypto ["X509_STORE_CTX_set_purpose"],
    X509StoreCtxGetError => Crypto ["X509_STORE_CTX_get_error"],
    X509StoreCtxGet1Chain => Crypto ["X509_STORE_CTX_get1_chain"],
    X509VerifyCert => Crypto ["X509_verify_cert"],
    X509VerifyCertErrorString => Crypto ["X509_verify_cert_error_string"],

    D2iPkcs7 => Crypto ["d2i_PKCS7"],
    I2dPkcs7 => Crypto ["i2d_PKCS7"],
    Pkcs7Free => Crypto ["PKCS7_free"],
    Pkcs7Dup => Crypto ["PKCS7_dup"],
    D2iPkcs12 => Crypto ["d2i_PKCS12"],
    I2dPkcs12 => Crypto ["i2d_PKCS12"],
    Pkcs12Free => Crypto ["PKCS12_free"],
    Pkcs12Parse => Crypto ["PKCS12_parse"],
    Pkcs12Newpass => Crypto ["PKCS12_newpass"],
    Pkcs12VerifyMac => Crypto ["PKCS12_verify_mac"],

    ErrGetError => Crypto ["ERR_get_error"],
    ErrErrorStringN => Crypto ["ERR_error_string_n"],
    ErrClearError => Crypto ["ERR_clear_error"],
    CryptoFree => Crypto ["CRYPTO_free"],
    OpensslVersion => Crypto ["OpenSSL_version", "SSLeay_version"],

    TlsClientMethod => Ssl ["TLS_client_method", "SSLv23_client_method", "TLS_method", "SSLv23_method"],
    SslCtxNew => Ssl ["SSL_CTX_new"],
    SslCtxFree => Ssl ["SSL_CTX_free"],
    SslNew => Ssl ["SSL_new"],
    SslFree => Ssl ["SSL_free"],
    SslGetCiphers => Ssl ["SSL_get_ciphers"],
    SslCipherGetName => Ssl ["SSL_CIPHER_get_name"],
    SslCipherGetBits => Ssl ["SSL_CIPHER_get_bits"],
    SslCipherGetVersion => Ssl ["SSL_CIPHER_get_version"],
}

impl Symbol {
    /// Preferred export name
    pub fn name(self) -> &'static str {
        self.names()[0]
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// A bound entry: its address and the export name that matched
#[derive(Debug, Clone, Copy)]
struct Slot {
    address: RawSymbol,
    name: &'static str,
}

/// Resolved addresses for every [`Symbol`]
///
/// Immutable once bound.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    slots: Vec<Option<Slot>>,
}

impl SymbolTable {
    /// A table with nothing resolved
    pub fn empty() -> Self {
        Self {
            slots: vec![None; Symbol::ALL.len()],
        }
    }

    /// Bind every symbol through `resolve`
    ///
    /// `resolve` is asked for each export name of a symbol in order, within
    /// the symbol's library, until one answers.
    pub fn bind<F>(mut resolve: F) -> Self
    where
        F: FnMut(LibraryKind, &str) -> Option<RawSymbol>,
    {
        let mut table = Self::empty();

        for &symbol in Symbol::ALL {
            let library = symbol.library();
            let found = symbol
                .names()
                .iter()
                .find_map(|&name| resolve(library, name).map(|address| Slot { address, name }));

            match found {
                Some(slot) => {
                    if slot.name != symbol.name() {
                        trace!("{:?} bound through alternate name {}", symbol, slot.name);
                    }
                    table.slots[symbol.index()] = Some(slot);
                }
                None => trace!("{} not found in {} library", symbol.name(), library),
            }
        }

        debug!(
            "Bound {} of {} symbols",
            table.resolved_count(),
            Symbol::ALL.len()
        );
        table
    }

    /// Address of `symbol`, if bound
    pub fn get(&self, symbol: Symbol) -> Option<RawSymbol> {
        self.slots[symbol.index()].map(|slot| slot.address)
    }

    /// Export name `symbol` was bound through
    pub fn bound_name(&self, symbol: Symbol) -> Option<&'static str> {
        self.slots[symbol.index()].map(|slot| slot.name)
    }

    /// Whether every one of `symbols` is bound
    pub fn has_all(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|&s| self.get(s).is_some())
    }

    /// Number of bound symbols
    pub fn resolved_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Symbols that could not be bound
    pub fn missing(&self) -> Vec<Symbol> {
        Symbol::ALL
            .iter()
            .copied()
            .filter(|&s| self.get(s).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::os::raw::c_void;

    fn fake_address(seed: usize) -> RawSymbol {
        RawSymbol::new((0x1000 + seed * 16) as *mut c_void).unwrap()
    }

    #[test]
    fn test_symbol_names_are_unique() {
        let mut seen = HashSet::new();
        for symbol in Symbol::ALL {
            for name in symbol.names() {
                assert!(seen.insert(*name), "{} listed twice", name);
            }
        }
    }

    #[test]
    fn test_bind_everything() {
        let table = SymbolTable::bind(|_, name| Some(fake_address(name.len())));
        assert_eq!(table.resolved_count(), Symbol::ALL.len());
        assert!(table.missing().is_empty());
    }

    #[test]
    fn test_bind_nothing() {
        let table = SymbolTable::bind(|_, _| None);
        assert_eq!(table.resolved_count(), 0);
        assert_eq!(table.missing().len(), Symbol::ALL.len());
        assert!(table.get(Symbol::X509Free).is_none());
    }

    #[test]
    fn test_alternate_names_are_probed_in_order() {
        // An OpenSSL 1.0 style library only knows the legacy names.
        let legacy = ["sk_num", "EVP_PKEY_bits", "ASN1_STRING_data", "SSLv23_client_method"];
        let table = SymbolTable::bind(|_, name| {
            legacy.contains(&name).then(|| fake_address(name.len()))
        });

        assert_eq!(table.bound_name(Symbol::SkNum), Some("sk_num"));
        assert_eq!(table.bound_name(Symbol::EvpPkeyBits), Some("EVP_PKEY_bits"));
        assert_eq!(table.bound_name(Symbol::Asn1StringData), Some("ASN1_STRING_data"));
        assert_eq!(table.bound_name(Symbol::TlsClientMethod), Some("SSLv23_client_method"));
        assert_eq!(table.resolved_count(), legacy.len());
    }

    #[test]
    fn test_newest_name_wins() {
        let table = SymbolTable::bind(|_, name| Some(fake_address(name.len())));
        assert_eq!(table.bound_name(Symbol::SkNum), Some("OPENSSL_sk_num"));
        assert_eq!(table.bound_name(Symbol::X509GetNotBefore), Some("X509_get0_notBefore"));
    }

    #[test]
    fn test_symbols_only_resolved_in_their_library() {
        let table = SymbolTable::bind(|kind, name| {
            (kind == LibraryKind::Ssl).then(|| fake_address(name.len()))
        });

        assert!(table.get(Symbol::SslCtxNew).is_some());
        assert!(table.get(Symbol::X509Free).is_none());
        assert!(Symbol::ALL
            .iter()
            .filter(|s| s.library() == LibraryKind::Ssl)
            .all(|&s| table.get(s).is_some()));
    }

    #[test]
    fn test_has_all() {
        let table = SymbolTable::bind(|_, name| {
            (name == "X509_free" || name == "X509_dup").then(|| fake_address(1))
        });
        assert!(table.has_all(&[Symbol::X509Free, Symbol::X509Dup]));
        assert!(!table.has_all(&[Symbol::X509Free, Symbol::D2iX509]));
    }
}
