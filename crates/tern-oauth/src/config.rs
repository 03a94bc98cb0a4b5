//! Sign-in configuration.
//!
//! The relay's static public key and base URL form the trust anchor for the
//! relayed exchange. Both are pinned out-of-band and passed into the session
//! constructor explicitly, so sessions stay independently testable against
//! mock trust anchors instead of reading process-wide state.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tern_crypto::{PUBLIC_KEY_LEN, fingerprint_of};
use url::Url;

use crate::error::ExchangeError;

/// Trust anchor for a relay host.
#[derive(Clone)]
pub struct RelayConfig {
    base_url: String,
    host_public_key: [u8; PUBLIC_KEY_LEN],
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("base_url", &self.base_url)
            .field("host_key", &self.host_key_fingerprint())
            .finish()
    }
}

impl RelayConfig {
    /// Pin a relay by base URL and raw static public key.
    pub fn new(base_url: impl Into<String>, host_public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            host_public_key,
        }
    }

    /// Pin a relay from a base64-encoded static public key.
    pub fn from_base64_key(
        base_url: impl Into<String>,
        encoded_key: &str,
    ) -> Result<Self, ExchangeError> {
        let bytes = BASE64
            .decode(encoded_key)
            .map_err(|e| ExchangeError::Config(format!("host public key is not valid base64: {e}")))?;
        let host_public_key: [u8; PUBLIC_KEY_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ExchangeError::Config(format!(
                "host public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )))?;
        Ok(Self::new(base_url, host_public_key))
    }

    /// The pinned static public key of the relay host.
    pub const fn host_public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.host_public_key
    }

    /// Log-safe fingerprint of the pinned host key.
    pub fn host_key_fingerprint(&self) -> String {
        fingerprint_of(&self.host_public_key)
    }

    /// Endpoint for the Phase-1 POST.
    pub fn request_token_url(&self) -> String {
        format!("{}/oauth/request_token", self.base_url)
    }

    /// Browser URL where the user authorizes the recovered request token.
    pub fn authorize_url(&self, request_token: &str) -> Result<Url, ExchangeError> {
        let mut url = Url::parse(&format!("{}/oauth/authorize", self.base_url))
            .map_err(|e| ExchangeError::Config(format!("invalid relay base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("oauth_token", request_token);
        Ok(url)
    }
}

/// How sign-in obtains OAuth credentials.
///
/// The two flows share nothing structurally: the standard flow embeds the
/// consumer secret in the client and signs requests directly, while the
/// relayed flow smuggles only the consumer key through the encrypted
/// exchange and recovers the secret from the relay.
#[derive(Debug, Clone)]
pub enum SignInFlow {
    /// Conventional PIN-based OAuth 1.0a with embedded credentials.
    Standard(StandardOAuthConfig),
    /// Relayed exchange; the consumer secret never enters the client binary.
    Relayed(RelayConfig),
}

/// Credentials for the standard (non-relayed) flow.
#[derive(Clone)]
pub struct StandardOAuthConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for StandardOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardOAuthConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}
