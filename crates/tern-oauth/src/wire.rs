//! Wire schema for the three exchange messages.
//!
//! All three messages share one shape: a base64 ephemeral public key plus a
//! base64 combined-AEAD blob. Only the payload field name differs per step
//! (`consumer_key_box`, `request_token_box`, `authentication_box`). Phases 1
//! and 2 travel as JSON bodies; Phase 3 arrives as query parameters on a
//! browser redirect.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tern_crypto::{PUBLIC_KEY_LEN, SealedBox};
use url::Url;

use crate::error::ExchangeError;

/// Phase-1 request body: client ephemeral key + sealed consumer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTokenRequest {
    pub exchange_public_key: String,
    pub consumer_key_box: String,
}

/// Phase-2 response body: host ephemeral key + sealed request token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTokenResponse {
    pub exchange_public_key: String,
    pub request_token_box: String,
}

/// Final output of a successful exchange.
///
/// The consumer key and secret come back *from the relay*; they are never
/// hardcoded in the client for the relayed flow. This is the only artifact
/// the caller may persist.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authentication {
    pub access_token: String,
    pub access_token_secret: String,
    pub user_id: String,
    pub screen_name: String,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authentication")
            .field("user_id", &self.user_id)
            .field("screen_name", &self.screen_name)
            .field("consumer_key", &self.consumer_key)
            .field("access_token", &"[REDACTED]")
            .field("access_token_secret", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

/// Which message a decoded field came from; picks the schema error kind.
#[derive(Clone, Copy)]
pub(crate) enum WireContext {
    Response,
    Callback,
}

impl WireContext {
    pub(crate) fn schema_error(self, message: String) -> ExchangeError {
        match self {
            Self::Response => ExchangeError::MalformedResponse(message),
            Self::Callback => ExchangeError::InvalidCallback(message),
        }
    }
}

/// Base64-encode a raw public key for the `exchange_public_key` field.
pub(crate) fn encode_public_key(bytes: &[u8; PUBLIC_KEY_LEN]) -> String {
    BASE64.encode(bytes)
}

/// Decode a peer's `exchange_public_key` field.
///
/// Bad base64 is a schema violation of the surrounding message; a decoded
/// value of the wrong length is an invalid curve point.
pub(crate) fn decode_peer_key(
    encoded: &str,
    ctx: WireContext,
) -> Result<[u8; PUBLIC_KEY_LEN], ExchangeError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| ctx.schema_error(format!("exchange_public_key: {e}")))?;
    <[u8; PUBLIC_KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| ExchangeError::InvalidPeerKey)
}

/// Decode a base64 payload box field.
pub(crate) fn decode_sealed_box(
    encoded: &str,
    field: &str,
    ctx: WireContext,
) -> Result<SealedBox, ExchangeError> {
    SealedBox::from_base64(encoded).map_err(|e| ctx.schema_error(format!("{field}: {e}")))
}

/// Extract the two logical fields from a Phase-3 redirect URL.
pub(crate) fn callback_params(url: &Url) -> Result<(String, String), ExchangeError> {
    let mut peer_key = None;
    let mut auth_box = None;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "exchange_public_key" => peer_key = Some(value.into_owned()),
            "authentication_box" => auth_box = Some(value.into_owned()),
            _ => {}
        }
    }
    let peer_key = peer_key.ok_or_else(|| {
        ExchangeError::InvalidCallback("missing exchange_public_key parameter".into())
    })?;
    let auth_box = auth_box.ok_or_else(|| {
        ExchangeError::InvalidCallback("missing authentication_box parameter".into())
    })?;
    Ok((peer_key, auth_box))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_body_serializes_to_wire_field_names() {
        let body = RequestTokenRequest {
            exchange_public_key: "cGsK".into(),
            consumer_key_box: "Ym94Cg==".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["exchange_public_key"], "cGsK");
        assert_eq!(json["consumer_key_box"], "Ym94Cg==");
    }

    #[test]
    fn response_missing_field_fails_to_parse() {
        let result: Result<RequestTokenResponse, _> =
            serde_json::from_str(r#"{"exchange_public_key":"not-base64"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn decode_peer_key_maps_bad_base64_per_context() {
        let response = decode_peer_key("not-base64", WireContext::Response);
        assert!(matches!(response, Err(ExchangeError::MalformedResponse(_))));

        let callback = decode_peer_key("not-base64", WireContext::Callback);
        assert!(matches!(callback, Err(ExchangeError::InvalidCallback(_))));
    }

    #[test]
    fn decode_peer_key_rejects_wrong_length_as_invalid_key() {
        let short = BASE64.encode([1u8; 16]);
        let result = decode_peer_key(&short, WireContext::Response);
        assert!(matches!(result, Err(ExchangeError::InvalidPeerKey)));
    }

    #[test]
    fn callback_params_requires_both_fields() {
        let url = Url::parse("tern://callback?exchange_public_key=abc").unwrap();
        assert!(matches!(
            callback_params(&url),
            Err(ExchangeError::InvalidCallback(_))
        ));

        let url = Url::parse("tern://callback").unwrap();
        assert!(matches!(
            callback_params(&url),
            Err(ExchangeError::InvalidCallback(_))
        ));
    }

    #[test]
    fn callback_params_ignores_extra_parameters() {
        let url =
            Url::parse("tern://callback?foo=1&exchange_public_key=abc&authentication_box=def")
                .unwrap();
        let (key, auth) = callback_params(&url).unwrap();
        assert_eq!(key, "abc");
        assert_eq!(auth, "def");
    }

    #[test]
    fn authentication_debug_redacts_secrets() {
        let auth = Authentication {
            access_token: "AT1".into(),
            access_token_secret: "ATS1".into(),
            user_id: "42".into(),
            screen_name: "tern_user".into(),
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("tern_user"));
        assert!(!rendered.contains("AT1"));
        assert!(!rendered.contains("ATS1"));
        assert!(!rendered.contains("\"cs\""));
    }

    #[test]
    fn authentication_json_roundtrip() {
        let auth = Authentication {
            access_token: "AT1".into(),
            access_token_secret: "ATS1".into(),
            user_id: "42".into(),
            screen_name: "tern_user".into(),
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
        };
        let json = serde_json::to_vec(&auth).unwrap();
        let parsed: Authentication = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed, auth);
    }
}
