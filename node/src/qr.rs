//! # Verification QR Codes
//!
//! Every sealed record gets a QR code for the physical label. Scanning it
//! yields a small JSON document with the block hash and a ready-to-open
//! verification URL, so a buyer standing in a shop can check provenance
//! without typing 64 hex characters.
//!
//! The code is rendered as an SVG and wrapped in a base64 `data:` URL,
//! which embeds directly into API responses and web pages with no file
//! storage on the node.

use qrcodegen::{QrCode, QrCodeEcc};
use serde::Serialize;

const QR_CODE_BORDER: i32 = 2;
const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

/// Why a QR code could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("verification payload too large for a QR code: {0}")]
    TooLong(#[from] qrcodegen::DataTooLong),

    #[error("failed to encode verification payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a scanner sees: enough to identify the record and a URL that
/// answers whether the ledger still vouches for it.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationQr {
    pub block_hash: String,
    pub herb: String,
    pub farmer: String,
    pub verify_url: String,
}

/// Renders the verification payload as an SVG QR code wrapped in a
/// base64 `data:` URL.
pub fn verification_qr_data_url(payload: &VerificationQr) -> Result<String, QrError> {
    let json = serde_json::to_string(payload)?;
    let code = QrCode::encode_text(&json, QrCodeEcc::Medium)?;
    let svg = code.to_svg_string(QR_CODE_BORDER);
    Ok(format!("{SVG_DATA_URL_PREFIX}{}", base64::encode(&svg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VerificationQr {
        VerificationQr {
            block_hash: "ab".repeat(32),
            herb: "Tulsi".to_string(),
            farmer: "Asha Kulkarni".to_string(),
            verify_url: format!("http://127.0.0.1:8373/api/verify/{}", "ab".repeat(32)),
        }
    }

    #[test]
    fn data_url_wraps_an_svg() {
        let url = verification_qr_data_url(&sample()).unwrap();
        assert!(url.starts_with(SVG_DATA_URL_PREFIX));

        let encoded = &url[SVG_DATA_URL_PREFIX.len()..];
        let svg_bytes = base64::decode(encoded).expect("valid base64");
        let svg = String::from_utf8(svg_bytes).expect("valid utf-8");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("http://www.w3.org/2000/svg"));
    }

    #[test]
    fn same_payload_renders_the_same_code() {
        let a = verification_qr_data_url(&sample()).unwrap();
        let b = verification_qr_data_url(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut payload = sample();
        payload.herb = "x".repeat(10_000);
        assert!(matches!(
            verification_qr_data_url(&payload),
            Err(QrError::TooLong(_))
        ));
    }
}
