//! PEM armor

use ::pem::{EncodeConfig, LineEnding, Pem};

use crate::common::{Result, TrustError};

/// Decode every `label` block in `text`, in order
///
/// Text outside the armor lines is ignored, as are blocks with other labels.
pub fn decode_all(label: &str, text: &str) -> Result<Vec<Vec<u8>>> {
    let blocks = ::pem::parse_many(text)
        .map_err(|e| TrustError::Certificate(format!("Failed to parse PEM: {}", e)))?;

    Ok(blocks
        .into_iter()
        .filter(|block| block.tag() == label)
        .map(Pem::into_contents)
        .collect())
}

/// Wrap DER in `label` armor with 64-column lines
pub fn encode(label: &str, der: &[u8]) -> String {
    let block = Pem::new(label, der.to_vec());
    ::pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wraps_lines() {
        let pem = encode("CERTIFICATE", &[0u8; 100]);
        let lines: Vec<&str> = pem.lines().collect();

        assert_eq!(lines[0], "-----BEGIN CERTIFICATE-----");
        assert_eq!(lines[1].len(), 64);
        assert!(!pem.contains('\r'));
        assert_eq!(lines.last().copied(), Some("-----END CERTIFICATE-----"));
        assert_eq!(decode_all("CERTIFICATE", &pem).unwrap(), vec![vec![0u8; 100]]);
    }

    #[test]
    fn test_decode_skips_other_labels() {
        let text = format!(
            "comment\n{}{}\n{}",
            encode("CERTIFICATE", b"one"),
            encode("PRIVATE KEY", b"key"),
            encode("CERTIFICATE", b"two")
        );

        let blocks = decode_all("CERTIFICATE", &text).unwrap();
        assert_eq!(blocks, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode_all("CERTIFICATE", "-----BEGIN CERTIFICATE-----\n!!!\n-----END CERTIFICATE-----\n").is_err());
        assert!(decode_all("CERTIFICATE", "-----BEGIN CERTIFICATE-----\nAAAA\n-----END PRIVATE KEY-----\n").is_err());
        assert!(decode_all("CERTIFICATE", "no armor here").unwrap().is_empty());
    }
}
