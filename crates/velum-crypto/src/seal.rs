//! Hybrid seal and open operations.
//!
//! # Sealing flow
//!
//! 1. Generate a fresh random 32-byte content encryption key (CEK) and
//!    a fresh 12-byte nonce
//! 2. Encrypt the plaintext with AES-256-GCM under the CEK
//! 3. Wrap the CEK with RSA-OAEP-SHA256 under the recipient's public key
//! 4. Assemble header + wrapped key + nonce + ciphertext + tag into an
//!    [`Envelope`]
//!
//! The asymmetric primitive alone cannot carry arbitrary-length bodies;
//! the symmetric step carries the data while the wrap step solves key
//! distribution. CEK and nonce are single-use: reuse across envelopes
//! would void the AEAD guarantees, so both are drawn fresh per call.
//!
//! Opening reverses the steps and fails closed: a wrong private key
//! surfaces as [`OpenError::UnwrapFailure`], any tamper or truncation
//! as [`OpenError::AuthenticationFailure`]. The caller never receives
//! unauthenticated plaintext.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::envelope::{Envelope, EnvelopeHeader, NONCE_LEN, TAG_LEN};
use crate::error::{CryptoError, CryptoResult, OpenError};
use crate::keys::{PrivateKey, PublicKey};

/// Content encryption key length in bytes (AES-256).
const CEK_LEN: usize = 32;

/// Seal plaintext for a recipient.
///
/// # Errors
///
/// Returns [`CryptoError::Seal`] if the recipient key is unusable for
/// the wrap or a primitive step fails.
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<Envelope> {
    let mut rng = rand::thread_rng();

    let mut cek = Zeroizing::new([0u8; CEK_LEN]);
    rng.fill_bytes(cek.as_mut());

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(cek.as_ref())
        .map_err(|e| CryptoError::Seal(e.to_string()))?;
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Seal("AES-GCM encryption failed".to_string()))?;

    let wrapped_key = recipient
        .inner()
        .encrypt(&mut rng, Oaep::new::<Sha256>(), cek.as_ref())
        .map_err(|e| CryptoError::Seal(format!("key wrap failed: {}", e)))?;

    // encrypt() appends the 16-byte tag; carry it as its own segment
    let tag_vec = sealed.split_off(sealed.len() - TAG_LEN);
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&tag_vec);

    Ok(Envelope {
        header: EnvelopeHeader::default(),
        wrapped_key,
        nonce,
        ciphertext: sealed,
        tag,
    })
}

/// Open an envelope with the holder's private key.
///
/// # Errors
///
/// - [`OpenError::UnwrapFailure`] if the content key cannot be
///   unwrapped (wrong or incompatible private key)
/// - [`OpenError::AuthenticationFailure`] if tag verification fails
///   (tampered or corrupted ciphertext)
pub fn open(private: &PrivateKey, envelope: &Envelope) -> CryptoResult<Vec<u8>> {
    let cek = Zeroizing::new(
        private
            .inner()
            .decrypt(Oaep::new::<Sha256>(), &envelope.wrapped_key)
            .map_err(|_| OpenError::UnwrapFailure)?,
    );

    if cek.len() != CEK_LEN {
        return Err(OpenError::UnwrapFailure.into());
    }

    let cipher =
        Aes256Gcm::new_from_slice(cek.as_ref()).map_err(|_| OpenError::UnwrapFailure)?;

    let mut sealed = Vec::with_capacity(envelope.ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(&envelope.ciphertext);
    sealed.extend_from_slice(&envelope.tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.nonce), sealed.as_slice())
        .map_err(|_| OpenError::AuthenticationFailure)?;

    Ok(plaintext)
}

/// Seal and encode to the compact text form in one step.
pub fn seal_to_text(recipient: &PublicKey, plaintext: &[u8]) -> CryptoResult<String> {
    seal(recipient, plaintext)?.encode()
}

/// Decode from the compact text form and open in one step.
pub fn open_from_text(private: &PrivateKey, text: &str) -> CryptoResult<Vec<u8>> {
    let envelope = Envelope::decode(text)?;
    open(private, &envelope)
}
