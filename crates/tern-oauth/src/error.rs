//! Exchange error types.

use tern_crypto::CryptoError;

/// Errors from the relayed request-token exchange.
///
/// Every variant is terminal for its session. The only safe recovery is a
/// brand-new session with a fresh keypair, except for Phase-1 transport
/// failures (`RelayUnreachable`, `RelayRejected`) where no host ephemeral
/// key was consumed and the same session may retry `start()`.
///
/// Messages never carry key bytes, shared secrets, or decrypted payloads.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Peer public key bytes did not decode to a 32-byte curve point.
    #[error("Invalid peer public key")]
    InvalidPeerKey,

    /// AEAD tag mismatch: wrong key, transport corruption, or tampering.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Relay response violated the JSON wire schema.
    #[error("Malformed relay response: {0}")]
    MalformedResponse(String),

    /// Callback URL was missing or carried unusable query parameters.
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// Transport-level failure before any relay response arrived.
    #[error("Relay unreachable: {0}")]
    RelayUnreachable(String),

    /// The relay answered with a non-2xx status.
    #[error("Relay rejected the request (HTTP {status})")]
    RelayRejected { status: u16 },

    /// A phase was invoked out of order.
    #[error("Invalid session state: expected {expected}, session is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Local crypto operation failed (key derivation or sealing).
    #[error("Crypto operation failed: {0}")]
    Crypto(String),
}

impl From<CryptoError> for ExchangeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidPeerKey { .. } => Self::InvalidPeerKey,
            CryptoError::DecryptionFailed(_) => Self::DecryptionFailed,
            other => Self::Crypto(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_peer_key_maps_across_the_crate_seam() {
        let err = CryptoError::InvalidPeerKey {
            expected: 32,
            actual: 31,
        };
        assert!(matches!(ExchangeError::from(err), ExchangeError::InvalidPeerKey));
    }

    #[test]
    fn decryption_failure_maps_without_detail() {
        let err = CryptoError::DecryptionFailed("aead::Error".into());
        let mapped = ExchangeError::from(err);
        assert!(matches!(mapped, ExchangeError::DecryptionFailed));
        assert_eq!(mapped.to_string(), "Decryption failed");
    }
}
