//! Compact text encoding for sealed messages.
//!
//! # Format
//!
//! A sealed message travels as one opaque string of five base64url
//! (unpadded) segments joined by `.`:
//!
//! ```text
//! b64url(header JSON) . b64url(wrapped key) . b64url(nonce) . b64url(ciphertext) . b64url(tag)
//! ```
//!
//! The header records which algorithms produced the envelope:
//!
//! ```json
//! {"v":1,"alg":"RSA-OAEP-256","enc":"A256GCM"}
//! ```
//!
//! The encoding is stable and versioned by the header, so envelopes
//! round-trip exactly between conforming implementations. An envelope
//! is immutable once produced; any modification is caught when it is
//! opened.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoResult, OpenError};

/// Current envelope format version.
pub const FORMAT_VERSION: u8 = 1;

/// Identifier of the asymmetric key wrap algorithm.
pub const WRAP_ALG: &str = "RSA-OAEP-256";

/// Identifier of the symmetric content encryption algorithm.
pub const CONTENT_ALG: &str = "A256GCM";

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Envelope header recording the wrap and content algorithms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Format version.
    pub v: u8,
    /// Key wrap algorithm identifier.
    pub alg: String,
    /// Content encryption algorithm identifier.
    pub enc: String,
}

impl Default for EnvelopeHeader {
    fn default() -> Self {
        Self {
            v: FORMAT_VERSION,
            alg: WRAP_ALG.to_string(),
            enc: CONTENT_ALG.to_string(),
        }
    }
}

/// A sealed message envelope.
///
/// Carries everything needed to open it with the right private key:
/// the algorithm header, the content key wrapped for the recipient,
/// the nonce, the ciphertext, and the authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Algorithm header.
    pub header: EnvelopeHeader,
    /// Content encryption key wrapped under the recipient's public key.
    pub wrapped_key: Vec<u8>,
    /// Single-use AES-GCM nonce.
    pub nonce: [u8; NONCE_LEN],
    /// AES-GCM ciphertext (without tag).
    pub ciphertext: Vec<u8>,
    /// AES-GCM authentication tag.
    pub tag: [u8; TAG_LEN],
}

impl Envelope {
    /// Encode as the compact dot-separated text form.
    pub fn encode(&self) -> CryptoResult<String> {
        let header_json = serde_json::to_vec(&self.header)?;

        let segments = [
            URL_SAFE_NO_PAD.encode(&header_json),
            URL_SAFE_NO_PAD.encode(&self.wrapped_key),
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
            URL_SAFE_NO_PAD.encode(self.tag),
        ];
        Ok(segments.join("."))
    }

    /// Decode from the compact text form.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::MalformedEnvelope`] if the segment count,
    /// base64, header JSON, version, algorithm identifiers, or
    /// nonce/tag lengths are wrong.
    pub fn decode(text: &str) -> Result<Self, OpenError> {
        let segments: Vec<&str> = text.split('.').collect();
        if segments.len() != 5 {
            return Err(OpenError::MalformedEnvelope(format!(
                "expected 5 segments, got {}",
                segments.len()
            )));
        }

        let header_json = decode_segment(segments[0], "header")?;
        let header: EnvelopeHeader = serde_json::from_slice(&header_json)
            .map_err(|e| OpenError::MalformedEnvelope(format!("invalid header JSON: {}", e)))?;

        if header.v != FORMAT_VERSION {
            return Err(OpenError::MalformedEnvelope(format!(
                "unsupported format version: {}",
                header.v
            )));
        }
        if header.alg != WRAP_ALG {
            return Err(OpenError::MalformedEnvelope(format!(
                "unsupported wrap algorithm: {}",
                header.alg
            )));
        }
        if header.enc != CONTENT_ALG {
            return Err(OpenError::MalformedEnvelope(format!(
                "unsupported content algorithm: {}",
                header.enc
            )));
        }

        let wrapped_key = decode_segment(segments[1], "wrapped key")?;
        if wrapped_key.is_empty() {
            return Err(OpenError::MalformedEnvelope("empty wrapped key".to_string()));
        }

        let nonce = fixed_segment::<NONCE_LEN>(segments[2], "nonce")?;
        let ciphertext = decode_segment(segments[3], "ciphertext")?;
        let tag = fixed_segment::<TAG_LEN>(segments[4], "tag")?;

        Ok(Self {
            header,
            wrapped_key,
            nonce,
            ciphertext,
            tag,
        })
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, OpenError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| OpenError::MalformedEnvelope(format!("invalid base64 in {}: {}", what, e)))
}

fn fixed_segment<const N: usize>(segment: &str, what: &str) -> Result<[u8; N], OpenError> {
    let bytes = decode_segment(segment, what)?;
    bytes.try_into().map_err(|_| {
        OpenError::MalformedEnvelope(format!("invalid {} length, expected {} bytes", what, N))
    })
}
