//! Error types for cryptographic operations.

use thiserror::Error;

/// Reasons an envelope can fail to open.
///
/// Distinguishing these matters to callers: a malformed envelope is a
/// data problem, an unwrap failure points at the wrong private key, and
/// an authentication failure means the ciphertext was tampered with or
/// corrupted in transit. None of them ever yields partial plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    /// The envelope text is not a valid velum envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The content key could not be unwrapped - wrong or incompatible private key.
    #[error("Key unwrap failed - wrong or incompatible private key")]
    UnwrapFailure,

    /// Tag verification failed - ciphertext or tag tampered or corrupted.
    #[error("Authentication failed - message may be tampered")]
    AuthenticationFailure,
}

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key pair generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Serialized key is malformed or uses an unsupported algorithm.
    #[error("Key import failed: {0}")]
    KeyImport(String),

    /// Key serialization failed.
    #[error("Key export failed: {0}")]
    KeyExport(String),

    /// Sealing failed - bad recipient key or primitive failure.
    #[error("Seal failed: {0}")]
    Seal(String),

    /// Opening failed, see [`OpenError`] for the reason.
    #[error("Open failed: {0}")]
    Open(#[from] OpenError),

    /// Passphrase key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Passphrase too short.
    #[error("Passphrase too short (minimum {0} characters required)")]
    PassphraseTooShort(usize),

    /// Invalid magic bytes - not a velum key file.
    #[error("Invalid magic bytes - not a velum key file")]
    InvalidMagic,

    /// Key file is structurally invalid.
    #[error("Invalid keyfile: {0}")]
    InvalidKeyfile(String),

    /// Key file decryption failed - wrong passphrase or corrupted file.
    #[error("Keyfile decryption failed - wrong passphrase or corrupted file")]
    KeyfileDecryption,

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
