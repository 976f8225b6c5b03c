//! Certificate purposes and key usage

use std::fmt;
use std::os::raw::c_int;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::TrustError;
use crate::crypto::ffi;

/// What a certificate is being validated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    SslServer,
    SslClient,
    SmimeSign,
    SmimeEncrypt,
    Any,
}

impl Purpose {
    pub const ALL: &'static [Purpose] = &[
        Purpose::SslServer,
        Purpose::SslClient,
        Purpose::SmimeSign,
        Purpose::SmimeEncrypt,
        Purpose::Any,
    ];

    /// Library purpose id
    pub fn id(self) -> c_int {
        match self {
            Purpose::SslServer => ffi::X509_PURPOSE_SSL_SERVER,
            Purpose::SslClient => ffi::X509_PURPOSE_SSL_CLIENT,
            Purpose::SmimeSign => ffi::X509_PURPOSE_SMIME_SIGN,
            Purpose::SmimeEncrypt => ffi::X509_PURPOSE_SMIME_ENCRYPT,
            Purpose::Any => ffi::X509_PURPOSE_ANY,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::SslServer => write!(f, "ssl-server"),
            Purpose::SslClient => write!(f, "ssl-client"),
            Purpose::SmimeSign => write!(f, "smime-sign"),
            Purpose::SmimeEncrypt => write!(f, "smime-encrypt"),
            Purpose::Any => write!(f, "any"),
        }
    }
}

impl FromStr for Purpose {
    type Err = TrustError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ssl-server" | "server" => Ok(Self::SslServer),
            "ssl-client" | "client" => Ok(Self::SslClient),
            "smime-sign" => Ok(Self::SmimeSign),
            "smime-encrypt" => Ok(Self::SmimeEncrypt),
            "any" => Ok(Self::Any),
            _ => Err(TrustError::Certificate(format!(
                "Invalid purpose: {}. Valid values are: ssl-server, ssl-client, smime-sign, smime-encrypt, any",
                s
            ))),
        }
    }
}

/// keyUsage bits as the library reports them
pub mod key_usage {
    pub const DIGITAL_SIGNATURE: u32 = 0x0080;
    pub const NON_REPUDIATION: u32 = 0x0040;
    pub const KEY_ENCIPHERMENT: u32 = 0x0020;
    pub const DATA_ENCIPHERMENT: u32 = 0x0010;
    pub const KEY_AGREEMENT: u32 = 0x0008;
    pub const KEY_CERT_SIGN: u32 = 0x0004;
    pub const CRL_SIGN: u32 = 0x0002;
}

/// extendedKeyUsage bits as the library reports them
pub mod extended_key_usage {
    pub const SSL_SERVER: u32 = 0x0001;
    pub const SSL_CLIENT: u32 = 0x0002;
    pub const SMIME: u32 = 0x0004;
    pub const CODE_SIGN: u32 = 0x0008;
    pub const SGC: u32 = 0x0010;
    pub const ANY: u32 = 0x0100;
}

/// Usage restrictions carried by a certificate
///
/// `u32::MAX` in either field means the extension is absent, which places no
/// restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    pub key_usage: u32,
    pub extended_key_usage: u32,
}

impl Default for Extensions {
    fn default() -> Self {
        Self::UNRESTRICTED
    }
}

impl Extensions {
    pub const UNRESTRICTED: Extensions = Extensions {
        key_usage: u32::MAX,
        extended_key_usage: u32::MAX,
    };

    fn allows_key(&self, bits: u32) -> bool {
        self.key_usage == u32::MAX || self.key_usage & bits != 0
    }

    fn allows_extended(&self, bits: u32) -> bool {
        self.extended_key_usage == u32::MAX
            || self.extended_key_usage & (bits | extended_key_usage::ANY) != 0
    }
}

/// Whether a leaf with `extensions` may be used for `purpose`
///
/// Pure: looks only at keyUsage and extendedKeyUsage, never at the chain.
pub fn purpose_satisfied_by(extensions: &Extensions, purpose: Purpose) -> bool {
    use extended_key_usage as eku;
    use key_usage as ku;

    match purpose {
        Purpose::SslServer => {
            extensions.allows_extended(eku::SSL_SERVER | eku::SGC)
                && extensions.allows_key(ku::DIGITAL_SIGNATURE | ku::KEY_ENCIPHERMENT | ku::KEY_AGREEMENT)
        }
        Purpose::SslClient => {
            extensions.allows_extended(eku::SSL_CLIENT)
                && extensions.allows_key(ku::DIGITAL_SIGNATURE | ku::KEY_AGREEMENT)
        }
        Purpose::SmimeSign => {
            extensions.allows_extended(eku::SMIME)
                && extensions.allows_key(ku::DIGITAL_SIGNATURE | ku::NON_REPUDIATION)
        }
        Purpose::SmimeEncrypt => {
            extensions.allows_extended(eku::SMIME) && extensions.allows_key(ku::KEY_ENCIPHERMENT)
        }
        Purpose::Any => true,
    }
}

/// Which purposes a certificate qualifies for, as leaf and as authority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedPurposes {
    pub ssl_server: bool,
    pub ssl_server_ca: bool,
    pub ssl_client: bool,
    pub ssl_client_ca: bool,
    pub smime_sign: bool,
    pub smime_sign_ca: bool,
    pub smime_encrypt: bool,
    pub smime_encrypt_ca: bool,
    pub any: bool,
    pub any_ca: bool,
}

impl ExtendedPurposes {
    /// Build from a `check(purpose, ca)` probe
    pub fn probe<F>(mut check: F) -> Self
    where
        F: FnMut(Purpose, bool) -> bool,
    {
        Self {
            ssl_server: check(Purpose::SslServer, false),
            ssl_server_ca: check(Purpose::SslServer, true),
            ssl_client: check(Purpose::SslClient, false),
            ssl_client_ca: check(Purpose::SslClient, true),
            smime_sign: check(Purpose::SmimeSign, false),
            smime_sign_ca: check(Purpose::SmimeSign, true),
            smime_encrypt: check(Purpose::SmimeEncrypt, false),
            smime_encrypt_ca: check(Purpose::SmimeEncrypt, true),
            any: check(Purpose::Any, false),
            any_ca: check(Purpose::Any, true),
        }
    }

    /// Whether the certificate qualifies for `purpose`
    pub fn allows(&self, purpose: Purpose, ca: bool) -> bool {
        match (purpose, ca) {
            (Purpose::SslServer, false) => self.ssl_server,
            (Purpose::SslServer, true) => self.ssl_server_ca,
            (Purpose::SslClient, false) => self.ssl_client,
            (Purpose::SslClient, true) => self.ssl_client_ca,
            (Purpose::SmimeSign, false) => self.smime_sign,
            (Purpose::SmimeSign, true) => self.smime_sign_ca,
            (Purpose::SmimeEncrypt, false) => self.smime_encrypt,
            (Purpose::SmimeEncrypt, true) => self.smime_encrypt_ca,
            (Purpose::Any, false) => self.any,
            (Purpose::Any, true) => self.any_ca,
        }
    }
}
