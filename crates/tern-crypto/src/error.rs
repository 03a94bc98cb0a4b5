//! Crypto error types.

/// Errors from cryptographic operations.
///
/// Variants carry high-level reason strings only; key material, shared
/// secrets, and plaintext never appear in error messages.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid peer public key: expected {expected} bytes, got {actual}")]
    InvalidPeerKey { expected: usize, actual: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}
