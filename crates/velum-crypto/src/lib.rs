//! # velum-crypto
//!
//! End-to-end encryption primitives for velum messaging.
//!
//! This crate provides the cryptographic core: key lifecycle, hybrid
//! envelope encryption, and passphrase-protected key storage. The
//! relay that stores and forwards messages only ever sees envelope
//! text; plaintext and private keys never leave the client.
//!
//! ## Cryptographic Primitives
//!
//! - **Key wrap**: RSA-OAEP with SHA-256 (2048-bit keys)
//! - **Symmetric cipher**: AES-256-GCM (AEAD)
//! - **Key serialization**: SPKI PEM (public), PKCS#8 PEM (private)
//! - **Key storage at rest**: Argon2id + AES-256-GCM (VELKEY01)
//!
//! ## Envelope Format
//!
//! One opaque text token of five base64url segments joined by `.`:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ header JSON: {"v":1,"alg":"RSA-OAEP-256","enc":"A256GCM"}    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ content key wrapped under the recipient's public key         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ nonce (12 bytes)                                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │ AES-256-GCM ciphertext                                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ authentication tag (16 bytes)                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ### Generate a Keypair
//!
//! ```rust
//! use velum_crypto::Keypair;
//!
//! let keypair = Keypair::generate().unwrap();
//! let shareable = keypair.public.to_pem().unwrap();
//! assert!(shareable.starts_with("-----BEGIN PUBLIC KEY-----"));
//! ```
//!
//! ### Seal and Open
//!
//! ```rust
//! use velum_crypto::{seal_to_text, open_from_text, Keypair};
//!
//! let bob = Keypair::generate().unwrap();
//!
//! let envelope = seal_to_text(&bob.public, b"hi bob").unwrap();
//! let plaintext = open_from_text(&bob.private, &envelope).unwrap();
//! assert_eq!(plaintext, b"hi bob");
//! ```

pub mod envelope;
pub mod error;
pub mod key_storage;
pub mod keys;
pub mod seal;

// Re-export commonly used types
pub use envelope::{Envelope, EnvelopeHeader, CONTENT_ALG, FORMAT_VERSION, WRAP_ALG};
pub use error::{CryptoError, CryptoResult, OpenError};
pub use key_storage::{
    decrypt_private_key, encrypt_private_key, is_key_file, load_private_key, save_private_key,
};
pub use keys::{Keypair, PrivateKey, PublicKey, MIN_MODULUS_BITS};
pub use seal::{open, open_from_text, seal, seal_to_text};
