//! Relay transport adapter.
//!
//! The session only needs one network call: the Phase-1 POST. It goes behind
//! a trait so the state machine can be driven by an in-process mock relay in
//! tests. Phase 3 arrives out-of-band as a browser redirect and never touches
//! this adapter.

use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::config::RelayConfig;
use crate::error::ExchangeError;
use crate::wire::{RequestTokenRequest, RequestTokenResponse};

/// Delivers the Phase-1 request body to the relay and returns its response.
pub trait RelayTransport {
    fn request_token(
        &self,
        body: &RequestTokenRequest,
    ) -> impl Future<Output = Result<RequestTokenResponse, ExchangeError>>;
}

impl<T: RelayTransport + Sync> RelayTransport for &T {
    async fn request_token(
        &self,
        body: &RequestTokenRequest,
    ) -> Result<RequestTokenResponse, ExchangeError> {
        (**self).request_token(body).await
    }
}

/// HTTPS transport to a real relay host.
#[derive(Debug)]
pub struct HttpRelay {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRelay {
    /// Build a client for the configured relay.
    pub fn new(config: &RelayConfig) -> Result<Self, ExchangeError> {
        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExchangeError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.request_token_url(),
        })
    }
}

impl RelayTransport for HttpRelay {
    /// POST the Phase-1 body as JSON.
    ///
    /// No OAuth signing header goes on this request; the sealed payload is
    /// the authentication. Non-2xx statuses map to `RelayRejected` before
    /// any attempt to parse the body.
    async fn request_token(
        &self,
        body: &RequestTokenRequest,
    ) -> Result<RequestTokenResponse, ExchangeError> {
        debug!(endpoint = %self.endpoint, "posting request-token exchange");
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .json(body)
            .send()
            .await
            .map_err(|e| ExchangeError::RelayUnreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::RelayRejected {
                status: status.as_u16(),
            });
        }

        response
            .json::<RequestTokenResponse>()
            .await
            .map_err(|e| ExchangeError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn http_relay_targets_the_request_token_endpoint() {
        let config = RelayConfig::new("https://relay.example.com", [7u8; 32]);
        let relay = HttpRelay::new(&config).unwrap();
        assert_eq!(
            relay.endpoint,
            "https://relay.example.com/oauth/request_token"
        );
    }
}
