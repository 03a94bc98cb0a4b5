//! Sealed-box codec for exchange payloads.
//!
//! Payloads travel as ChaCha20-Poly1305 "combined" blobs: a fresh random
//! 12-byte nonce, then the ciphertext, then the 16-byte auth tag. The blob
//! is opaque to the transport and base64-encoded (standard alphabet) into a
//! JSON string field or URL query parameter.
//!
//! The Poly1305 tag is the protocol's only integrity check; there is no
//! separate MAC layer.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::CryptoError;
use crate::kdf::StepKey;

/// Nonce size for ChaCha20-Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size.
pub const TAG_SIZE: usize = 16;

/// A combined AEAD blob: nonce ‖ ciphertext ‖ tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox(Vec<u8>);

impl SealedBox {
    /// Wrap raw combined bytes received from the wire.
    ///
    /// Rejects blobs too short to contain a nonce and a tag.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::InvalidEncoding(format!(
                "sealed box too short: {} bytes",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// The combined bytes (nonce ‖ ciphertext ‖ tag).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 (standard alphabet) of the combined bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Decode a base64 wire field into a sealed box.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        Self::from_bytes(bytes)
    }
}

/// Seal a plaintext under a step key with a fresh random nonce.
///
/// `aad` is authenticated but not encrypted. The relay wire contract uses an
/// empty `aad`; the parameter exists so callers can bind outer context when
/// both ends agree to.
pub fn seal(key: &StepKey, plaintext: &[u8], aad: &[u8]) -> Result<SealedBox, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(SealedBox(combined))
}

/// Open a sealed box, verifying the Poly1305 tag.
///
/// Fails with [`CryptoError::DecryptionFailed`] on any tag mismatch: wrong
/// key, tampered bytes, or a salt/info mismatch upstream all look identical
/// here.
pub fn open(key: &StepKey, sealed: &SealedBox, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let (nonce_bytes, ciphertext) = sealed.as_bytes().split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
