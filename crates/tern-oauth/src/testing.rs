//! In-process mock relay for driving sessions in tests.
//!
//! Performs the genuine host side of all three steps with a static keypair
//! standing in for the pinned trust anchor, plus fault injection for the
//! failure scenarios.

use std::sync::Mutex;

use url::Url;

use tern_crypto::{
    EphemeralKeyPair, ExchangeStep, PUBLIC_KEY_LEN, SealedBox, derive_step_key, open, seal,
};

use crate::config::RelayConfig;
use crate::error::ExchangeError;
use crate::relay::RelayTransport;
use crate::wire::{self, Authentication, RequestTokenRequest, RequestTokenResponse, WireContext};

/// How the mock answers the Phase-1 POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehaviour {
    /// Perform the real host-side exchange.
    Honest,
    /// Return a body whose `exchange_public_key` is not base64.
    GarbageResponse,
    /// Answer with the given non-2xx status.
    Reject(u16),
    /// Fail at the transport level before any response.
    Unreachable,
}

/// A relay host living inside the test process.
pub struct MockRelay {
    host: EphemeralKeyPair,
    request_token: String,
    behaviour: Mutex<MockBehaviour>,
    requests: Mutex<Vec<RequestTokenRequest>>,
    seen: Mutex<Option<SeenRequest>>,
}

struct SeenRequest {
    client_public: [u8; PUBLIC_KEY_LEN],
    consumer_key: String,
}

impl MockRelay {
    /// A relay that will echo back `request_token` in Phase 2.
    pub fn new(request_token: impl Into<String>) -> Self {
        Self {
            host: EphemeralKeyPair::generate(),
            request_token: request_token.into(),
            behaviour: Mutex::new(MockBehaviour::Honest),
            requests: Mutex::new(Vec::new()),
            seen: Mutex::new(None),
        }
    }

    /// Trust-anchor config pointing sessions at this mock.
    pub fn config(&self) -> RelayConfig {
        RelayConfig::new("https://relay.test", self.host.public_bytes())
    }

    /// Change how subsequent Phase-1 requests are answered.
    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        *lock(&self.behaviour) = behaviour;
    }

    /// The consumer key recovered from the most recent honest request.
    pub fn seen_consumer_key(&self) -> Option<String> {
        lock(&self.seen).as_ref().map(|s| s.consumer_key.clone())
    }

    /// The client ephemeral public key from the most recent honest request.
    pub fn seen_client_public(&self) -> Option<[u8; PUBLIC_KEY_LEN]> {
        lock(&self.seen).as_ref().map(|s| s.client_public)
    }

    /// Raw Phase-1 bodies received, in order, regardless of behaviour.
    pub fn requests(&self) -> Vec<RequestTokenRequest> {
        lock(&self.requests).clone()
    }

    /// Build the Phase-3 redirect URL for the most recently seen session,
    /// carrying `authentication` sealed under a fresh host ephemeral key.
    pub fn callback_url(&self, authentication: &Authentication) -> Result<Url, ExchangeError> {
        let client_public = self
            .seen_client_public()
            .ok_or_else(|| ExchangeError::Config("mock relay has seen no request".into()))?;

        let ephemeral = EphemeralKeyPair::generate();
        let shared = ephemeral.agree(&client_public)?;
        let key = derive_step_key(
            &shared,
            &ephemeral.public_bytes(),
            ExchangeStep::Authentication,
        )?;
        let payload = serde_json::to_vec(authentication)
            .map_err(|e| ExchangeError::Config(e.to_string()))?;
        let sealed = seal(&key, &payload, b"")?;

        Url::parse_with_params(
            "tern://callback",
            [
                (
                    "exchange_public_key",
                    wire::encode_public_key(&ephemeral.public_bytes()),
                ),
                ("authentication_box", sealed.to_base64()),
            ],
        )
        .map_err(|e| ExchangeError::Config(e.to_string()))
    }

    fn answer_honestly(
        &self,
        body: &RequestTokenRequest,
    ) -> Result<RequestTokenResponse, ExchangeError> {
        let client_public = wire::decode_peer_key(&body.exchange_public_key, WireContext::Response)?;
        let sealed = wire::decode_sealed_box(
            &body.consumer_key_box,
            "consumer_key_box",
            WireContext::Response,
        )?;

        let shared = self.host.agree(&client_public)?;
        let key = derive_step_key(&shared, &client_public, ExchangeStep::RequestToken)?;
        let consumer_key = String::from_utf8(open(&key, &sealed, b"")?)
            .map_err(|_| ExchangeError::MalformedResponse("consumer key is not UTF-8".into()))?;

        *lock(&self.seen) = Some(SeenRequest {
            client_public,
            consumer_key,
        });

        let ephemeral = EphemeralKeyPair::generate();
        let shared = ephemeral.agree(&client_public)?;
        let key = derive_step_key(
            &shared,
            &ephemeral.public_bytes(),
            ExchangeStep::RequestTokenResponse,
        )?;
        let sealed = seal(&key, self.request_token.as_bytes(), b"")?;

        Ok(RequestTokenResponse {
            exchange_public_key: wire::encode_public_key(&ephemeral.public_bytes()),
            request_token_box: sealed.to_base64(),
        })
    }
}

impl RelayTransport for MockRelay {
    async fn request_token(
        &self,
        body: &RequestTokenRequest,
    ) -> Result<RequestTokenResponse, ExchangeError> {
        lock(&self.requests).push(body.clone());
        match *lock(&self.behaviour) {
            MockBehaviour::Honest => self.answer_honestly(body),
            MockBehaviour::GarbageResponse => Ok(RequestTokenResponse {
                exchange_public_key: "not-base64".into(),
                request_token_box: String::new(),
            }),
            MockBehaviour::Reject(status) => Err(ExchangeError::RelayRejected { status }),
            MockBehaviour::Unreachable => Err(ExchangeError::RelayUnreachable(
                "connection refused".into(),
            )),
        }
    }
}

/// Seal arbitrary bytes to a client public key under the given step, with a
/// throwaway host ephemeral. Returns the host public key and the box, for
/// tests that need to hand-craft messages.
pub fn seal_to_client(
    client_public: &[u8; PUBLIC_KEY_LEN],
    step: ExchangeStep,
    plaintext: &[u8],
) -> Result<(String, SealedBox), ExchangeError> {
    let ephemeral = EphemeralKeyPair::generate();
    let shared = ephemeral.agree(client_public)?;
    let key = derive_step_key(&shared, &ephemeral.public_bytes(), step)?;
    let sealed = seal(&key, plaintext, b"")?;
    Ok((wire::encode_public_key(&ephemeral.public_bytes()), sealed))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
