//! Native declarations for the runtime-resolved library
//!
//! Opaque handle types, the numeric constants the crate relies on, and one
//! function-pointer alias per entry in [`Symbol`](super::symbols::Symbol).
//! Each alias carries the same name as the symbol variant it is called
//! through, which is what the facade's `resolve!` macro relies on.

#![allow(missing_docs)]

use std::os::raw::{c_char, c_int, c_long, c_uchar, c_uint, c_ulong, c_void};

macro_rules! opaque {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            pub struct $name {
                _private: [u8; 0],
            }
        )*
    };
}

opaque!(
    X509, X509Name, X509Store, X509StoreCtx, X509Lookup, X509LookupMethod, Asn1String, BigNum,
    EvpPkey, EvpMd, Stack, Pkcs7, Pkcs12, SslMethod, SslCtx, Ssl, SslCipher,
);

/// `GENERAL_NAME`: a type tag followed by a union of pointers
#[repr(C)]
pub struct GeneralName {
    pub kind: c_int,
    pub value: *mut c_void,
}

pub const X509_V_OK: c_int = 0;
pub const X509_V_ERR_HOSTNAME_MISMATCH: c_int = 62;

pub const X509_PURPOSE_SSL_CLIENT: c_int = 1;
pub const X509_PURPOSE_SSL_SERVER: c_int = 2;
pub const X509_PURPOSE_NS_SSL_SERVER: c_int = 3;
pub const X509_PURPOSE_SMIME_SIGN: c_int = 4;
pub const X509_PURPOSE_SMIME_ENCRYPT: c_int = 5;
pub const X509_PURPOSE_ANY: c_int = 7;

pub const X509_L_FILE_LOAD: c_int = 1;
pub const X509_FILETYPE_PEM: c_long = 1;

pub const NID_SUBJECT_ALT_NAME: c_int = 85;

pub const GEN_EMAIL: c_int = 1;
pub const GEN_DNS: c_int = 2;
pub const GEN_URI: c_int = 6;
pub const GEN_IPADD: c_int = 7;

pub const V_ASN1_UTCTIME: c_int = 23;
pub const V_ASN1_GENERALIZEDTIME: c_int = 24;

pub const EVP_PKEY_RSA: c_int = 6;
pub const EVP_PKEY_DSA: c_int = 116;
pub const EVP_PKEY_DH: c_int = 28;
pub const EVP_PKEY_EC: c_int = 408;
pub const EVP_PKEY_RSA_PSS: c_int = 912;
pub const EVP_PKEY_ED25519: c_int = 1087;
pub const EVP_PKEY_ED448: c_int = 1088;

/// `OPENSSL_VERSION` / `SSLEAY_VERSION` selector for the version string
pub const OPENSSL_VERSION: c_int = 0;

/// `OPENSSL_INIT_ADD_ALL_CIPHERS | OPENSSL_INIT_ADD_ALL_DIGESTS`
pub const OPENSSL_INIT_ADD_ALL: u64 = 0x0000_0004 | 0x0000_0008;

pub const EVP_MAX_MD_SIZE: usize = 64;

// crypto: certificates
pub type X509Free = unsafe extern "C" fn(*mut X509);
pub type X509Dup = unsafe extern "C" fn(*mut X509) -> *mut X509;
pub type D2iX509 = unsafe extern "C" fn(*mut *mut X509, *mut *const c_uchar, c_long) -> *mut X509;
pub type I2dX509 = unsafe extern "C" fn(*mut X509, *mut *mut c_uchar) -> c_int;
pub type X509Cmp = unsafe extern "C" fn(*const X509, *const X509) -> c_int;
pub type X509GetSubjectName = unsafe extern "C" fn(*const X509) -> *mut X509Name;
pub type X509GetIssuerName = unsafe extern "C" fn(*const X509) -> *mut X509Name;
pub type X509NameOneline = unsafe extern "C" fn(*const X509Name, *mut c_char, c_int) -> *mut c_char;
pub type X509GetSerialNumber = unsafe extern "C" fn(*mut X509) -> *mut Asn1String;
pub type Asn1IntegerToBn = unsafe extern "C" fn(*const Asn1String, *mut BigNum) -> *mut BigNum;
pub type BnBn2hex = unsafe extern "C" fn(*const BigNum) -> *mut c_char;
pub type BnFree = unsafe extern "C" fn(*mut BigNum);
pub type X509GetNotBefore = unsafe extern "C" fn(*const X509) -> *const Asn1String;
pub type X509GetNotAfter = unsafe extern "C" fn(*const X509) -> *const Asn1String;
pub type Asn1StringData = unsafe extern "C" fn(*const Asn1String) -> *const c_uchar;
pub type Asn1StringLength = unsafe extern "C" fn(*const Asn1String) -> c_int;
pub type Asn1StringType = unsafe extern "C" fn(*const Asn1String) -> c_int;
pub type X509GetPubkey = unsafe extern "C" fn(*mut X509) -> *mut EvpPkey;
pub type EvpPkeyFree = unsafe extern "C" fn(*mut EvpPkey);
pub type EvpPkeyBits = unsafe extern "C" fn(*const EvpPkey) -> c_int;
pub type EvpPkeyBaseId = unsafe extern "C" fn(*const EvpPkey) -> c_int;
pub type X509GetSignatureNid = unsafe extern "C" fn(*const X509) -> c_int;
pub type ObjNid2ln = unsafe extern "C" fn(c_int) -> *const c_char;
pub type X509Digest = unsafe extern "C" fn(*const X509, *const EvpMd, *mut c_uchar, *mut c_uint) -> c_int;
pub type EvpMd5 = unsafe extern "C" fn() -> *const EvpMd;
pub type EvpSha1 = unsafe extern "C" fn() -> *const EvpMd;
pub type EvpSha256 = unsafe extern "C" fn() -> *const EvpMd;
pub type X509CheckPurpose = unsafe extern "C" fn(*mut X509, c_int, c_int) -> c_int;
pub type X509CheckIssued = unsafe extern "C" fn(*mut X509, *mut X509) -> c_int;
pub type X509GetKeyUsage = unsafe extern "C" fn(*mut X509) -> u32;
pub type X509GetExtendedKeyUsage = unsafe extern "C" fn(*mut X509) -> u32;
pub type X509GetExtD2i = unsafe extern "C" fn(*const X509, c_int, *mut c_int, *mut c_int) -> *mut c_void;
pub type GeneralNamesFree = unsafe extern "C" fn(*mut Stack);

// crypto: stacks
pub type SkNewNull = unsafe extern "C" fn() -> *mut Stack;
pub type SkPush = unsafe extern "C" fn(*mut Stack, *const c_void) -> c_int;
pub type SkNum = unsafe extern "C" fn(*const Stack) -> c_int;
pub type SkValue = unsafe extern "C" fn(*const Stack, c_int) -> *mut c_void;
pub type SkFree = unsafe extern "C" fn(*mut Stack);
pub type SkPopFree = unsafe extern "C" fn(*mut Stack, Option<unsafe extern "C" fn(*mut c_void)>);

// crypto: stores and verification
pub type X509StoreNew = unsafe extern "C" fn() -> *mut X509Store;
pub type X509StoreFree = unsafe extern "C" fn(*mut X509Store);
pub type X509StoreAddCert = unsafe extern "C" fn(*mut X509Store, *mut X509) -> c_int;
pub type X509StoreAddLookup = unsafe extern "C" fn(*mut X509Store, *mut X509LookupMethod) -> *mut X509Lookup;
pub type X509LookupFile = unsafe extern "C" fn() -> *mut X509LookupMethod;
pub type X509LookupCtrl =
    unsafe extern "C" fn(*mut X509Lookup, c_int, *const c_char, c_long, *mut *mut c_char) -> c_int;
pub type X509StoreCtxNew = unsafe extern "C" fn() -> *mut X509StoreCtx;
pub type X509StoreCtxFree = unsafe extern "C" fn(*mut X509StoreCtx);
pub type X509StoreCtxInit = unsafe extern "C" fn(*mut X509StoreCtx, *mut X509Store, *mut X509, *mut Stack) -> c_int;
pub type X509StoreCtxSetPurpose = unsafe extern "C" fn(*mut X509StoreCtx, c_int) -> c_int;
pub type X509StoreCtxGetError = unsafe extern "C" fn(*mut X509StoreCtx) -> c_int;
pub type X509StoreCtxGet1Chain = unsafe extern "C" fn(*mut X509StoreCtx) -> *mut Stack;
pub type X509VerifyCert = unsafe extern "C" fn(*mut X509StoreCtx) -> c_int;
pub type X509VerifyCertErrorString = unsafe extern "C" fn(c_long) -> *const c_char;

// crypto: PKCS#7 / PKCS#12
pub type D2iPkcs7 = unsafe extern "C" fn(*mut *mut Pkcs7, *mut *const c_uchar, c_long) -> *mut Pkcs7;
pub type I2dPkcs7 = unsafe extern "C" fn(*mut Pkcs7, *mut *mut c_uchar) -> c_int;
pub type Pkcs7Free = unsafe extern "C" fn(*mut Pkcs7);
pub type Pkcs7Dup = unsafe extern "C" fn(*mut Pkcs7) -> *mut Pkcs7;
pub type D2iPkcs12 = unsafe extern "C" fn(*mut *mut Pkcs12, *mut *const c_uchar, c_long) -> *mut Pkcs12;
pub type I2dPkcs12 = unsafe extern "C" fn(*mut Pkcs12, *mut *mut c_uchar) -> c_int;
pub type Pkcs12Free = unsafe extern "C" fn(*mut Pkcs12);
pub type Pkcs12Parse = unsafe extern "C" fn(
    *mut Pkcs12,
    *const c_char,
    *mut *mut EvpPkey,
    *mut *mut X509,
    *mut *mut Stack,
) -> c_int;
pub type Pkcs12Newpass = unsafe extern "C" fn(*mut Pkcs12, *const c_char, *const c_char) -> c_int;
pub type Pkcs12VerifyMac = unsafe extern "C" fn(*mut Pkcs12, *const c_char, c_int) -> c_int;

// crypto: error queue, allocator, version
pub type ErrGetError = unsafe extern "C" fn() -> c_ulong;
pub type ErrErrorStringN = unsafe extern "C" fn(c_ulong, *mut c_char, usize);
pub type ErrClearError = unsafe extern "C" fn();
pub type CryptoFree = unsafe extern "C" fn(*mut c_void, *const c_char, c_int);
pub type OpensslVersion = unsafe extern "C" fn(c_int) -> *const c_char;

// ssl
pub type TlsClientMethod = unsafe extern "C" fn() -> *const SslMethod;
pub type SslCtxNew = unsafe extern "C" fn(*const SslMethod) -> *mut SslCtx;
pub type SslCtxFree = unsafe extern "C" fn(*mut SslCtx);
pub type SslNew = unsafe extern "C" fn(*mut SslCtx) -> *mut Ssl;
pub type SslFree = unsafe extern "C" fn(*mut Ssl);
pub type SslGetCiphers = unsafe extern "C" fn(*const Ssl) -> *mut Stack;
pub type SslCipherGetName = unsafe extern "C" fn(*const SslCipher) -> *const c_char;
pub type SslCipherGetBits = unsafe extern "C" fn(*const SslCipher, *mut c_int) -> c_int;
pub type SslCipherGetVersion = unsafe extern "C" fn(*const SslCipher) -> *const c_char;

// one-time initializers, probed by name rather than bound into the table
pub type InitPlain = unsafe extern "C" fn();
pub type InitWithOptions = unsafe extern "C" fn(u64, *const c_void) -> c_int;
