//! Per-step key derivation.
//!
//! Every protocol step derives its own 32-byte sealing key via HKDF-SHA256.
//! The `info` string differs per step so a key derived for one step can
//! never open an envelope sealed for another, even when the underlying
//! shared secret is identical.

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::keys::{PUBLIC_KEY_LEN, SharedSecret};

/// Length of a derived sealing key.
pub const STEP_KEY_LEN: usize = 32;

/// The three steps of the relayed request-token exchange.
///
/// Each carries a fixed ASCII HKDF `info` string. These strings are part of
/// the wire contract with the relay host; changing one produces keys that
/// silently fail to open the peer's envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStep {
    /// Client → relay: the sealed consumer key.
    RequestToken,
    /// Relay → client: the sealed OAuth request token.
    RequestTokenResponse,
    /// Relay → client (via browser redirect): the sealed credentials.
    Authentication,
}

impl ExchangeStep {
    /// HKDF `info` context string for this step.
    pub const fn info(self) -> &'static [u8] {
        match self {
            Self::RequestToken => b"request token exchange",
            Self::RequestTokenResponse => b"request token response exchange",
            Self::Authentication => b"authentication exchange",
        }
    }
}

/// A 32-byte symmetric key bound to one exchange step.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StepKey([u8; STEP_KEY_LEN]);

impl StepKey {
    pub(crate) fn as_bytes(&self) -> &[u8; STEP_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StepKey([REDACTED])")
    }
}

impl PartialEq for StepKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for StepKey {}

/// Derive the sealing key for one exchange step.
///
/// The salt is the raw bytes of the *newer* ephemeral public key (the one
/// introduced by whichever side moved last) followed by the raw shared
/// secret, in that order. Both ends must construct this byte sequence
/// identically; a mismatch produces a different key with no explicit error,
/// surfacing only as `DecryptionFailed` downstream.
pub fn derive_step_key(
    shared: &SharedSecret,
    newer_public: &[u8; PUBLIC_KEY_LEN],
    step: ExchangeStep,
) -> Result<StepKey, CryptoError> {
    let mut salt = [0u8; PUBLIC_KEY_LEN + 32];
    salt[..PUBLIC_KEY_LEN].copy_from_slice(newer_public);
    salt[PUBLIC_KEY_LEN..].copy_from_slice(shared.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());
    let mut key = [0u8; STEP_KEY_LEN];
    let result = hk
        .expand(step.info(), &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()));
    salt.zeroize();
    result?;

    Ok(StepKey(key))
}
