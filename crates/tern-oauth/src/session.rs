//! Exchange session state machine.
//!
//! One session drives the three-step relayed exchange with a single client
//! ephemeral keypair:
//!
//! 1. seal the consumer key to the relay's pinned static key and POST it,
//! 2. open the relay's response (fresh host ephemeral) to recover the OAuth
//!    request token and build the browser authorize URL,
//! 3. much later, open the browser redirect (second fresh host ephemeral) to
//!    recover the full credentials.
//!
//! Host ephemeral keys are single-use, so nothing past Phase 1 is retryable;
//! a failed session can only be replaced by a new one. The machine is
//! single-writer: callers run `start` and `handle_callback` from one logical
//! task and never concurrently.

use tracing::{debug, info, warn};
use url::Url;

use tern_crypto::{EphemeralKeyPair, ExchangeStep, derive_step_key, open, seal};

use crate::config::RelayConfig;
use crate::error::ExchangeError;
use crate::relay::RelayTransport;
use crate::wire::{
    self, Authentication, RequestTokenRequest, RequestTokenResponse, WireContext,
};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    RequestSent,
    TokenReceived,
    AwaitingCallback,
    Authenticated,
    /// Terminal unless the failure happened before any host ephemeral key
    /// was consumed (Phase-1 transport errors), in which case `start` may
    /// run again with the same keypair.
    Failed { retryable: bool },
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::RequestSent => "RequestSent",
            Self::TokenReceived => "TokenReceived",
            Self::AwaitingCallback => "AwaitingCallback",
            Self::Authenticated => "Authenticated",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// One relayed sign-in attempt.
///
/// Owns the client ephemeral keypair exclusively. Sessions are never pooled
/// or reused across sign-in attempts; dropping one discards its key material
/// with no network-side cleanup.
pub struct RelayedExchange<T> {
    transport: T,
    config: RelayConfig,
    consumer_key: String,
    /// Dropped as soon as the session reaches a terminal phase.
    keys: Option<EphemeralKeyPair>,
    request_token: Option<String>,
    phase: Phase,
}

impl<T> std::fmt::Debug for RelayedExchange<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayedExchange")
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl<T: RelayTransport> RelayedExchange<T> {
    /// Create a session for one sign-in attempt.
    ///
    /// The keypair is generated here so a Phase-1 retry reuses it instead of
    /// regenerating.
    pub fn new(config: RelayConfig, transport: T, consumer_key: impl Into<String>) -> Self {
        Self {
            transport,
            config,
            consumer_key: consumer_key.into(),
            keys: Some(EphemeralKeyPair::generate()),
            request_token: None,
            phase: Phase::Created,
        }
    }

    /// Current lifecycle phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The request token recovered in Phase 2, while the session holds one.
    pub fn request_token(&self) -> Option<&str> {
        self.request_token.as_deref()
    }

    /// Run Phases 1 and 2: exchange the sealed consumer key for a request
    /// token and return the authorize URL to open in the user's browser.
    pub async fn start(&mut self) -> Result<Url, ExchangeError> {
        match self.phase {
            Phase::Created | Phase::Failed { retryable: true } => {}
            other => {
                return Err(ExchangeError::InvalidState {
                    expected: "Created",
                    actual: other.name(),
                });
            }
        }

        let body = match self.build_request() {
            Ok(body) => body,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };
        self.phase = Phase::RequestSent;
        debug!(
            host = %self.config.host_key_fingerprint(),
            "request-token exchange sent"
        );

        let response = match self.transport.request_token(&body).await {
            Ok(response) => response,
            Err(e @ (ExchangeError::RelayUnreachable(_) | ExchangeError::RelayRejected { .. })) => {
                // No host ephemeral key was consumed; the same session may
                // retry with its existing keypair.
                warn!("relay transport failed before any host key was used");
                self.phase = Phase::Failed { retryable: true };
                return Err(e);
            }
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };

        let token = match self.open_response(&response) {
            Ok(token) => token,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };
        self.phase = Phase::TokenReceived;

        let authorize = match self.config.authorize_url(&token) {
            Ok(url) => url,
            Err(e) => {
                self.fail();
                return Err(e);
            }
        };
        self.request_token = Some(token);
        self.phase = Phase::AwaitingCallback;
        info!("request token received; awaiting browser authorization");
        Ok(authorize)
    }

    /// Run Phase 3: open the redirect URL delivered back to the app and
    /// recover the full credentials.
    ///
    /// Terminal either way; the client private key is discarded before this
    /// returns.
    pub fn handle_callback(&mut self, url: &Url) -> Result<Authentication, ExchangeError> {
        if self.phase != Phase::AwaitingCallback {
            return Err(ExchangeError::InvalidState {
                expected: "AwaitingCallback",
                actual: self.phase.name(),
            });
        }

        let result = self.open_callback(url);
        match &result {
            Ok(_) => {
                self.phase = Phase::Authenticated;
                info!("authentication exchange complete");
            }
            Err(_) => self.fail(),
        }
        // Third and final use of the session keypair either way. The token
        // has served its purpose once the callback arrives.
        self.keys = None;
        self.request_token = None;
        result
    }

    /// Phase 1: seal the consumer key to the pinned host static key.
    fn build_request(&self) -> Result<RequestTokenRequest, ExchangeError> {
        let keys = self.keys()?;
        let client_public = keys.public_bytes();

        let shared = keys.agree(self.config.host_public_key())?;
        // The client key is the newer one in this direction.
        let key = derive_step_key(&shared, &client_public, ExchangeStep::RequestToken)?;
        let sealed = seal(&key, self.consumer_key.as_bytes(), b"")?;

        Ok(RequestTokenRequest {
            exchange_public_key: wire::encode_public_key(&client_public),
            consumer_key_box: sealed.to_base64(),
        })
    }

    /// Phase 2: open the relay's response under its fresh ephemeral key.
    fn open_response(&self, response: &RequestTokenResponse) -> Result<String, ExchangeError> {
        let keys = self.keys()?;
        let host_public = wire::decode_peer_key(&response.exchange_public_key, WireContext::Response)?;
        let sealed = wire::decode_sealed_box(
            &response.request_token_box,
            "request_token_box",
            WireContext::Response,
        )?;

        let shared = keys.agree(&host_public)?;
        // The host ephemeral is the newer key in this direction.
        let key = derive_step_key(&shared, &host_public, ExchangeStep::RequestTokenResponse)?;
        let plaintext = open(&key, &sealed, b"")?;

        String::from_utf8(plaintext)
            .map_err(|_| ExchangeError::MalformedResponse("request token is not valid UTF-8".into()))
    }

    /// Phase 3: open the redirect's sealed credentials.
    fn open_callback(&self, url: &Url) -> Result<Authentication, ExchangeError> {
        let keys = self.keys()?;
        let (peer_key_param, auth_box_param) = wire::callback_params(url)?;
        let host_public = wire::decode_peer_key(&peer_key_param, WireContext::Callback)?;
        let sealed =
            wire::decode_sealed_box(&auth_box_param, "authentication_box", WireContext::Callback)?;

        let shared = keys.agree(&host_public)?;
        let key = derive_step_key(&shared, &host_public, ExchangeStep::Authentication)?;
        let plaintext = open(&key, &sealed, b"")?;

        serde_json::from_slice(&plaintext).map_err(|_| {
            ExchangeError::InvalidCallback("authentication payload failed schema validation".into())
        })
    }

    fn keys(&self) -> Result<&EphemeralKeyPair, ExchangeError> {
        self.keys.as_ref().ok_or(ExchangeError::InvalidState {
            expected: "a live session keypair",
            actual: self.phase.name(),
        })
    }

    fn fail(&mut self) {
        self.phase = Phase::Failed { retryable: false };
        // Key material has no further use once the session is dead.
        self.keys = None;
        self.request_token = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::MockRelay;

    fn session(relay: &MockRelay) -> RelayedExchange<&MockRelay> {
        RelayedExchange::new(relay.config(), relay, "abc123")
    }

    #[test]
    fn new_session_starts_in_created() {
        let relay = MockRelay::new("tok_789");
        let exchange = session(&relay);
        assert_eq!(exchange.phase(), Phase::Created);
        assert!(exchange.request_token().is_none());
    }

    #[test]
    fn callback_before_start_is_invalid_state() {
        let relay = MockRelay::new("tok_789");
        let mut exchange = session(&relay);
        let url = Url::parse("tern://callback?exchange_public_key=a&authentication_box=b")
            .unwrap();

        let result = exchange.handle_callback(&url);
        assert!(matches!(
            result,
            Err(ExchangeError::InvalidState {
                expected: "AwaitingCallback",
                actual: "Created",
            })
        ));
        // The failed precondition must not have advanced or killed the session.
        assert_eq!(exchange.phase(), Phase::Created);
    }

    #[tokio::test]
    async fn start_twice_is_invalid_state() {
        let relay = MockRelay::new("tok_789");
        let mut exchange = session(&relay);

        exchange.start().await.unwrap();
        let result = exchange.start().await;
        assert!(matches!(
            result,
            Err(ExchangeError::InvalidState {
                expected: "Created",
                actual: "AwaitingCallback",
            })
        ));
    }

    #[tokio::test]
    async fn debug_output_never_contains_token_material() {
        let relay = MockRelay::new("tok_789");
        let mut exchange = session(&relay);
        exchange.start().await.unwrap();

        let rendered = format!("{exchange:?}");
        assert!(!rendered.contains("tok_789"));
        assert!(rendered.contains("AwaitingCallback"));
    }
}
