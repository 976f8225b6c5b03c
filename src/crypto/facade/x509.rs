//! Certificate primitives

use std::cmp::Ordering;
use std::os::raw::{c_int, c_long, c_uint};
use std::ptr;
use std::slice;

use crate::crypto::ffi::{self, Asn1String, GeneralName, X509};
use crate::crypto::proxy::OpenSslProxy;

/// Digest algorithms the facade can compute over a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    Md5,
    Sha1,
    Sha256,
}

/// An ASN.1 time as the library stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTime {
    /// `V_ASN1_UTCTIME` or `V_ASN1_GENERALIZEDTIME`
    pub kind: c_int,
    pub text: String,
}

/// One subjectAltName entry: the `GEN_*` tag and its payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGeneralName {
    pub kind: c_int,
    pub data: Vec<u8>,
}

impl OpenSslProxy {
    /// Decode a DER certificate; null when unavailable or malformed
    pub fn d2i_x509(&self, der: &[u8]) -> *mut X509 {
        let f = resolve!(self, D2iX509, ptr::null_mut());
        let Ok(len) = c_long::try_from(der.len()) else {
            return ptr::null_mut();
        };
        let mut input = der.as_ptr();
        // SAFETY: `input` covers exactly `len` readable bytes.
        unsafe { f(ptr::null_mut(), &mut input, len) }
    }

    /// Encode a certificate as DER; empty when unavailable or on failure
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn i2d_x509(&self, x509: *mut X509) -> Vec<u8> {
        let f = resolve!(self, I2dX509, Vec::new());
        if x509.is_null() {
            return Vec::new();
        }

        let len = f(x509, ptr::null_mut());
        if len <= 0 {
            return Vec::new();
        }

        let mut der = vec![0u8; len as usize];
        let mut out = der.as_mut_ptr();
        let written = f(x509, &mut out);
        if written != len {
            return Vec::new();
        }
        der
    }

    /// Free a certificate
    ///
    /// # Safety
    ///
    /// `x509` must be null or owned by the caller; it is invalid afterwards.
    pub unsafe fn x509_free(&self, x509: *mut X509) {
        let f = resolve!(self, X509Free, ());
        if !x509.is_null() {
            f(x509);
        }
    }

    /// Deep copy of a certificate; null when unavailable
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_dup(&self, x509: *mut X509) -> *mut X509 {
        let f = resolve!(self, X509Dup, ptr::null_mut());
        if x509.is_null() {
            return ptr::null_mut();
        }
        f(x509)
    }

    /// Library ordering of two certificates; `None` when unavailable
    ///
    /// # Safety
    ///
    /// Both pointers must be live certificates.
    pub unsafe fn x509_cmp(&self, a: *const X509, b: *const X509) -> Option<Ordering> {
        let f = resolve!(self, X509Cmp, None);
        if a.is_null() || b.is_null() {
            return None;
        }
        Some(f(a, b).cmp(&0))
    }

    /// One-line subject name
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_subject(&self, x509: *const X509) -> Option<String> {
        let get = resolve!(self, X509GetSubjectName, None);
        self.name_oneline(get(x509))
    }

    /// One-line issuer name
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_issuer(&self, x509: *const X509) -> Option<String> {
        let get = resolve!(self, X509GetIssuerName, None);
        self.name_oneline(get(x509))
    }

    unsafe fn name_oneline(&self, name: *mut ffi::X509Name) -> Option<String> {
        let oneline = resolve!(self, X509NameOneline, None);
        if name.is_null() {
            return None;
        }
        self.take_string(oneline(name, ptr::null_mut(), 0))
    }

    /// Serial number in upper-case hex
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_serial_hex(&self, x509: *mut X509) -> Option<String> {
        let get = resolve!(self, X509GetSerialNumber, None);
        let to_bn = resolve!(self, Asn1IntegerToBn, None);
        let to_hex = resolve!(self, BnBn2hex, None);
        let bn_free = resolve!(self, BnFree, None);

        let serial = get(x509);
        if serial.is_null() {
            return None;
        }
        let bn = to_bn(serial, ptr::null_mut());
        if bn.is_null() {
            return None;
        }
        let hex = self.take_string(to_hex(bn));
        bn_free(bn);
        hex
    }

    /// Start of the validity window as stored
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_not_before(&self, x509: *const X509) -> Option<RawTime> {
        let get = resolve!(self, X509GetNotBefore, None);
        self.asn1_time(get(x509))
    }

    /// End of the validity window as stored
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_not_after(&self, x509: *const X509) -> Option<RawTime> {
        let get = resolve!(self, X509GetNotAfter, None);
        self.asn1_time(get(x509))
    }

    unsafe fn asn1_time(&self, time: *const Asn1String) -> Option<RawTime> {
        let kind = resolve!(self, Asn1StringType, None);
        let bytes = self.asn1_bytes(time)?;
        Some(RawTime {
            kind: kind(time),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    unsafe fn asn1_bytes(&self, string: *const Asn1String) -> Option<Vec<u8>> {
        let data = resolve!(self, Asn1StringData, None);
        let length = resolve!(self, Asn1StringLength, None);
        if string.is_null() {
            return None;
        }

        let ptr = data(string);
        let len = length(string);
        if len < 0 || (ptr.is_null() && len > 0) {
            return None;
        }
        if len == 0 {
            return Some(Vec::new());
        }
        Some(slice::from_raw_parts(ptr, len as usize).to_vec())
    }

    /// Public key type id and size in bits
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_public_key(&self, x509: *mut X509) -> Option<(c_int, c_int)> {
        let get = resolve!(self, X509GetPubkey, None);
        let free = resolve!(self, EvpPkeyFree, None);
        let bits = resolve!(self, EvpPkeyBits, None);
        let base_id = resolve!(self, EvpPkeyBaseId, None);

        let key = get(x509);
        if key.is_null() {
            return None;
        }
        let summary = (base_id(key), bits(key));
        free(key);
        Some(summary)
    }

    /// Long name of the signature algorithm
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_signature_algorithm(&self, x509: *const X509) -> Option<String> {
        let nid = resolve!(self, X509GetSignatureNid, None);
        let long_name = resolve!(self, ObjNid2ln, None);
        super::c_string(long_name(nid(x509)))
    }

    /// Digest over the DER encoding; empty when unavailable
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_digest(&self, x509: *const X509, kind: DigestKind) -> Vec<u8> {
        let digest = resolve!(self, X509Digest, Vec::new());
        let md = match kind {
            DigestKind::Md5 => {
                let f = resolve!(self, EvpMd5, Vec::new());
                f()
            }
            DigestKind::Sha1 => {
                let f = resolve!(self, EvpSha1, Vec::new());
                f()
            }
            DigestKind::Sha256 => {
                let f = resolve!(self, EvpSha256, Vec::new());
                f()
            }
        };
        if md.is_null() || x509.is_null() {
            return Vec::new();
        }

        let mut out = [0u8; ffi::EVP_MAX_MD_SIZE];
        let mut len: c_uint = 0;
        if digest(x509, md, out.as_mut_ptr(), &mut len) != 1 {
            return Vec::new();
        }
        out[..(len as usize).min(out.len())].to_vec()
    }

    /// `X509_check_purpose`; `-1` when unavailable
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_check_purpose(&self, x509: *mut X509, purpose: c_int, ca: bool) -> c_int {
        let f = resolve!(self, X509CheckPurpose, -1);
        f(x509, purpose, c_int::from(ca))
    }

    /// `X509_check_issued`: `0` when `issuer` issued `subject`; `-1` when
    /// unavailable
    ///
    /// # Safety
    ///
    /// Both pointers must be live certificates.
    pub unsafe fn x509_check_issued(&self, issuer: *mut X509, subject: *mut X509) -> c_int {
        let f = resolve!(self, X509CheckIssued, -1);
        f(issuer, subject)
    }

    /// Key usage bits; `u32::MAX` means the extension is absent
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_key_usage(&self, x509: *mut X509) -> Option<u32> {
        let f = resolve!(self, X509GetKeyUsage, None);
        Some(f(x509))
    }

    /// Extended key usage bits; `u32::MAX` means the extension is absent
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_extended_key_usage(&self, x509: *mut X509) -> Option<u32> {
        let f = resolve!(self, X509GetExtendedKeyUsage, None);
        Some(f(x509))
    }

    /// Entries of the subjectAltName extension
    ///
    /// # Safety
    ///
    /// `x509` must be a live certificate.
    pub unsafe fn x509_subject_alt_names(&self, x509: *const X509) -> Vec<RawGeneralName> {
        let get_ext = resolve!(self, X509GetExtD2i, Vec::new());
        let names_free = resolve!(self, GeneralNamesFree, Vec::new());

        let names = get_ext(x509, ffi::NID_SUBJECT_ALT_NAME, ptr::null_mut(), ptr::null_mut())
            as *mut ffi::Stack;
        if names.is_null() {
            return Vec::new();
        }

        let mut out = Vec::new();
        for i in 0..self.sk_num(names).max(0) {
            let entry = self.sk_value(names, i) as *const GeneralName;
            if entry.is_null() {
                continue;
            }
            let kind = (*entry).kind;
            if matches!(kind, ffi::GEN_DNS | ffi::GEN_EMAIL | ffi::GEN_URI | ffi::GEN_IPADD) {
                if let Some(data) = self.asn1_bytes((*entry).value as *const Asn1String) {
                    out.push(RawGeneralName { kind, data });
                }
            }
        }

        names_free(names);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unloaded_sentinels() {
        let proxy = OpenSslProxy::unloaded();
        let bogus = ptr::NonNull::<X509>::dangling().as_ptr();

        assert!(proxy.d2i_x509(&[0x30, 0x00]).is_null());
        // SAFETY: with nothing bound none of these dereference the pointer.
        unsafe {
            assert!(proxy.i2d_x509(bogus).is_empty());
            assert!(proxy.x509_dup(bogus).is_null());
            assert_eq!(proxy.x509_cmp(bogus, bogus), None);
            assert_eq!(proxy.x509_subject(bogus), None);
            assert_eq!(proxy.x509_issuer(bogus), None);
            assert_eq!(proxy.x509_serial_hex(bogus), None);
            assert_eq!(proxy.x509_not_before(bogus), None);
            assert_eq!(proxy.x509_not_after(bogus), None);
            assert_eq!(proxy.x509_public_key(bogus), None);
            assert_eq!(proxy.x509_signature_algorithm(bogus), None);
            assert!(proxy.x509_digest(bogus, DigestKind::Sha256).is_empty());
            assert_eq!(proxy.x509_check_purpose(bogus, ffi::X509_PURPOSE_ANY, false), -1);
            assert_eq!(proxy.x509_check_issued(bogus, bogus), -1);
            assert_eq!(proxy.x509_key_usage(bogus), None);
            assert_eq!(proxy.x509_extended_key_usage(bogus), None);
            assert!(proxy.x509_subject_alt_names(bogus).is_empty());
            proxy.x509_free(bogus);
        }
    }
}
