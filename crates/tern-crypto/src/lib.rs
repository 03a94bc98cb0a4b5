//! Tern exchange crypto library
//!
//! Primitives for the relayed OAuth request-token exchange: the client talks
//! to a relay host that holds the real OAuth consumer secret, and every
//! payload crossing the wire is sealed end-to-end so the relay's transport
//! never sees plaintext credentials.
//!
//! ## Crypto primitives
//!
//! - **Keys**: one X25519 ephemeral keypair per sign-in session
//! - **Derivation**: ECDH shared secret → HKDF-SHA256 with a per-step info
//!   string and a `newer_public ‖ shared_secret` salt
//! - **Sealing**: ChaCha20-Poly1305 AEAD, combined nonce ‖ ciphertext ‖ tag
//!   blobs, base64 on the wire

pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;

pub use envelope::{NONCE_SIZE, SealedBox, TAG_SIZE, open, seal};
pub use error::CryptoError;
pub use kdf::{ExchangeStep, STEP_KEY_LEN, StepKey, derive_step_key};
pub use keys::{EphemeralKeyPair, PUBLIC_KEY_LEN, SharedSecret, fingerprint_of};
