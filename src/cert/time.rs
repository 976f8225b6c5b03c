//! ASN.1 time parsing

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::crypto::ffi;
use crate::crypto::RawTime;

/// Parse a library time into UTC
///
/// Accepts UTCTime (`YYMMDDHHMM[SS]Z`, years 50-99 map to the 1900s) and
/// GeneralizedTime (`YYYYMMDDHHMM[SS][.fff]Z`). Offsets other than `Z` are
/// rejected.
pub fn parse_asn1_time(raw: &RawTime) -> Option<DateTime<Utc>> {
    if !raw.text.is_ascii() {
        return None;
    }
    let text = raw.text.strip_suffix('Z')?;

    let (year, rest) = match raw.kind {
        ffi::V_ASN1_UTCTIME => {
            let yy: i32 = digits(text.get(0..2)?)?;
            (if yy >= 50 { 1900 + yy } else { 2000 + yy }, text.get(2..)?)
        }
        ffi::V_ASN1_GENERALIZEDTIME => (digits(text.get(0..4)?)?, text.get(4..)?),
        _ => return None,
    };

    // fractional seconds are ignored
    let rest = rest.split('.').next()?;
    if rest.len() != 8 && rest.len() != 10 {
        return None;
    }

    let month = digits(rest.get(0..2)?)?;
    let day = digits(rest.get(2..4)?)?;
    let hour = digits(rest.get(4..6)?)?;
    let minute = digits(rest.get(6..8)?)?;
    let second = match rest.get(8..10) {
        Some(seconds) => digits(seconds)?,
        None => 0,
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}
