//! Passphrase-protected storage for private keys.
//!
//! A serialized private key is a secret at rest, so it is never
//! written to disk in the clear. This module wraps the PKCS#8 PEM in
//! an encrypted container using Argon2id key derivation and
//! AES-256-GCM.
//!
//! # Format: VELKEY01
//!
//! ```text
//! +------------------+
//! | Magic: VELKEY01  | 8 bytes
//! +------------------+
//! | Header Length    | 4 bytes (little-endian)
//! +------------------+
//! | Header (JSON)    | Variable
//! +------------------+
//! | Encrypted PEM    | Variable (ciphertext + 16-byte auth tag)
//! +------------------+
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::PrivateKey;

/// Magic bytes for the encrypted key file format.
pub const MAGIC_KEYFILE: &[u8; 8] = b"VELKEY01";

/// Minimum passphrase length.
pub const MIN_PASSPHRASE_LENGTH: usize = 12;

/// Argon2id parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB.
    pub memory_kib: u32,
    /// Time iterations.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Header for encrypted private key files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyFileHeader {
    version: u8,
    kdf: String,
    kdf_params: KdfParams,
    salt: String,
    nonce: String,
    created_at: DateTime<Utc>,
}

/// Derived key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey([u8; 32]);

fn derive_key(passphrase: &str, salt: &[u8; 32], params: &KdfParams) -> CryptoResult<DerivedKey> {
    if passphrase.len() < MIN_PASSPHRASE_LENGTH {
        return Err(CryptoError::PassphraseTooShort(MIN_PASSPHRASE_LENGTH));
    }

    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(DerivedKey(key))
}

/// Encrypt a private key with a passphrase.
///
/// Returns the encrypted data in VELKEY01 format.
///
/// # Errors
///
/// Returns [`CryptoError::PassphraseTooShort`] if the passphrase has
/// fewer than [`MIN_PASSPHRASE_LENGTH`] characters.
pub fn encrypt_private_key(key: &PrivateKey, passphrase: &str) -> CryptoResult<Vec<u8>> {
    let mut rng = rand::thread_rng();

    let mut salt = [0u8; 32];
    rng.fill_bytes(&mut salt);
    let mut nonce = [0u8; 12];
    rng.fill_bytes(&mut nonce);

    let kdf_params = KdfParams::default();
    let derived = derive_key(passphrase, &salt, &kdf_params)?;

    let pem = Zeroizing::new(key.to_pem()?);
    let cipher = Aes256Gcm::new_from_slice(&derived.0)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), pem.as_bytes())
        .map_err(|_| CryptoError::KeyDerivation("key encryption failed".to_string()))?;

    let header = KeyFileHeader {
        version: 1,
        kdf: "argon2id".to_string(),
        kdf_params,
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce),
        created_at: Utc::now(),
    };
    let header_json = serde_json::to_vec(&header)?;
    let header_len = (header_json.len() as u32).to_le_bytes();

    let mut output = Vec::with_capacity(8 + 4 + header_json.len() + ciphertext.len());
    output.extend_from_slice(MAGIC_KEYFILE);
    output.extend_from_slice(&header_len);
    output.extend_from_slice(&header_json);
    output.extend_from_slice(&ciphertext);

    Ok(output)
}

/// Decrypt a private key from VELKEY01 format.
///
/// # Errors
///
/// - [`CryptoError::InvalidMagic`] if the data is not a velum key file
/// - [`CryptoError::InvalidKeyfile`] if the container is truncated or
///   its header is unreadable
/// - [`CryptoError::KeyfileDecryption`] on a wrong passphrase or
///   tampered ciphertext
pub fn decrypt_private_key(encrypted: &[u8], passphrase: &str) -> CryptoResult<PrivateKey> {
    if encrypted.len() < 12 {
        return Err(CryptoError::InvalidKeyfile("file too short".to_string()));
    }
    if &encrypted[0..8] != MAGIC_KEYFILE {
        return Err(CryptoError::InvalidMagic);
    }

    let header_len = u32::from_le_bytes(
        encrypted[8..12]
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyfile("invalid header length".to_string()))?,
    ) as usize;

    if encrypted.len() < 12 + header_len {
        return Err(CryptoError::InvalidKeyfile("file truncated".to_string()));
    }

    let header: KeyFileHeader = serde_json::from_slice(&encrypted[12..12 + header_len])
        .map_err(|e| CryptoError::InvalidKeyfile(format!("invalid header: {}", e)))?;

    if header.version != 1 {
        return Err(CryptoError::InvalidKeyfile(format!(
            "unsupported version: {}",
            header.version
        )));
    }

    let salt: [u8; 32] = decode_field(&header.salt, "salt")?;
    let nonce: [u8; 12] = decode_field(&header.nonce, "nonce")?;

    let derived = derive_key(passphrase, &salt, &header.kdf_params)?;

    let ciphertext = &encrypted[12 + header_len..];
    let cipher = Aes256Gcm::new_from_slice(&derived.0)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let pem_bytes = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| CryptoError::KeyfileDecryption)?,
    );

    let pem = std::str::from_utf8(&pem_bytes)
        .map_err(|_| CryptoError::InvalidKeyfile("decrypted key is not UTF-8".to_string()))?;
    PrivateKey::from_pem(pem)
}

fn decode_field<const N: usize>(value: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = BASE64
        .decode(value)
        .map_err(|e| CryptoError::InvalidKeyfile(format!("invalid base64 in {}: {}", what, e)))?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyfile(format!("invalid {} length", what)))
}

/// Save a private key to a file, encrypted with a passphrase.
pub fn save_private_key(key: &PrivateKey, path: &Path, passphrase: &str) -> CryptoResult<()> {
    let encrypted = encrypt_private_key(key, passphrase)?;
    std::fs::write(path, encrypted)?;
    Ok(())
}

/// Load a private key from an encrypted file.
pub fn load_private_key(path: &Path, passphrase: &str) -> CryptoResult<PrivateKey> {
    let encrypted = std::fs::read(path)?;
    decrypt_private_key(&encrypted, passphrase)
}

/// Check if data is a velum key file (starts with VELKEY01 magic).
pub fn is_key_file(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..8] == MAGIC_KEYFILE
}
