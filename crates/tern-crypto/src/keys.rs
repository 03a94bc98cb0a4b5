//! Ephemeral key agreement.
//!
//! Each relayed sign-in session generates one X25519 keypair that lives for
//! the whole three-step exchange and is dropped afterwards. The host side
//! uses a fresh ephemeral key per response, so every ECDH here combines the
//! session's private key with a different peer public key.

use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Raw length of an X25519 public key on the wire.
pub const PUBLIC_KEY_LEN: usize = 32;

/// An X25519 keypair generated for a single exchange session.
///
/// The private half never leaves this struct: it is not serializable and the
/// `Debug` impl redacts it.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl EphemeralKeyPair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Raw public key bytes to place in the `exchange_public_key` field.
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        *self.public.as_bytes()
    }

    /// Perform X25519 ECDH against a peer's raw public key bytes.
    ///
    /// Fails with [`CryptoError::InvalidPeerKey`] when the peer bytes are not
    /// exactly 32 bytes long.
    pub fn agree(&self, peer_public_bytes: &[u8]) -> Result<SharedSecret, CryptoError> {
        if peer_public_bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidPeerKey {
                expected: PUBLIC_KEY_LEN,
                actual: peer_public_bytes.len(),
            });
        }
        let mut arr = [0u8; PUBLIC_KEY_LEN];
        arr.copy_from_slice(peer_public_bytes);
        let peer_public = PublicKey::from(arr);

        let shared = self.secret.diffie_hellman(&peer_public);
        Ok(SharedSecret(*shared.as_bytes()))
    }
}

/// An ECDH output, consumed immediately by key derivation.
///
/// Zeroized on drop; never stored across protocol steps.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Raw shared-secret bytes (HKDF input keying material).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SharedSecret {}

/// Short hex fingerprint of a public key, for log-safe identification.
pub fn fingerprint_of(pubkey_bytes: &[u8; PUBLIC_KEY_LEN]) -> String {
    let digest = Sha256::digest(pubkey_bytes);
    hex::encode(&digest[..8])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn agree_is_symmetric() {
        let a = EphemeralKeyPair::generate();
        let b = EphemeralKeyPair::generate();

        let shared_ab = a.agree(&b.public_bytes()).unwrap();
        let shared_ba = b.agree(&a.public_bytes()).unwrap();

        assert_eq!(shared_ab, shared_ba);
    }

    #[test]
    fn agree_rejects_short_peer_key() {
        let kp = EphemeralKeyPair::generate();
        let result = kp.agree(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidPeerKey { expected: 32, actual: 16 })
        ));
    }

    #[test]
    fn agree_rejects_long_peer_key() {
        let kp = EphemeralKeyPair::generate();
        let result = kp.agree(&[0u8; 33]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidPeerKey { expected: 32, actual: 33 })
        ));
    }

    #[test]
    fn fresh_keypairs_differ() {
        let a = EphemeralKeyPair::generate();
        let b = EphemeralKeyPair::generate();
        assert_ne!(a.public_bytes(), b.public_bytes());
    }

    #[test]
    fn debug_redacts_secret() {
        let kp = EphemeralKeyPair::generate();
        let rendered = format!("{kp:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains(&hex::encode(kp.public_bytes())));
    }

    #[test]
    fn shared_secret_debug_is_redacted() {
        let a = EphemeralKeyPair::generate();
        let b = EphemeralKeyPair::generate();
        let shared = a.agree(&b.public_bytes()).unwrap();
        assert_eq!(format!("{shared:?}"), "SharedSecret([REDACTED])");
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let kp = EphemeralKeyPair::generate();
        let fp1 = fingerprint_of(&kp.public_bytes());
        let fp2 = fingerprint_of(&kp.public_bytes());
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 16);
    }
}
