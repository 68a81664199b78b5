//! Error types for the messaging client.

use thiserror::Error;
use velum_crypto::CryptoError;

/// Client operation errors.
///
/// Every variant is recoverable: boundary failures can be retried,
/// crypto failures point at bad input. Per-message decryption
/// failures never surface here at all - the reconciler degrades them
/// to undecryptable display entries instead of failing the pass.
#[derive(Error, Debug)]
pub enum ClientError {
    /// A cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The directory could not resolve an identity's public key.
    #[error("Directory lookup failed: {0}")]
    Directory(String),

    /// The relay rejected or could not accept a send.
    #[error("Relay send failed: {0}")]
    Send(String),

    /// The relay history could not be fetched.
    #[error("Relay fetch failed: {0}")]
    Fetch(String),

    /// No private key is available for this session.
    #[error("No private key available for this session")]
    MissingPrivateKey,
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;
    use velum_crypto::OpenError;

    #[test]
    fn test_crypto_error_passthrough() {
        let err: ClientError = CryptoError::Open(OpenError::UnwrapFailure).into();
        assert!(matches!(err, ClientError::Crypto(_)));
        assert!(err.to_string().contains("unwrap"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = ClientError::Fetch("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
