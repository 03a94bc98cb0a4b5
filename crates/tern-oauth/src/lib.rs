//! Tern relayed OAuth exchange
//!
//! Obtains Twitter-style OAuth 1.0a credentials through an intermediary
//! relay host without ever embedding the application's consumer secret in
//! the client. Three messages cross the wire, each sealed end-to-end:
//!
//! 1. client → relay: consumer key, sealed to the relay's pinned static key
//! 2. relay → client: request token, sealed under a fresh host ephemeral
//! 3. relay → client (browser redirect): full credentials, sealed under a
//!    second fresh host ephemeral
//!
//! The public surface is two calls on [`RelayedExchange`]: `start()` returns
//! the browser authorize URL, `handle_callback()` turns the redirect back
//! into an [`Authentication`] record. Everything else is plumbing.

pub mod config;
pub mod error;
pub mod relay;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod wire;

pub use config::{RelayConfig, SignInFlow, StandardOAuthConfig};
pub use error::ExchangeError;
pub use relay::{HttpRelay, RelayTransport};
pub use session::{Phase, RelayedExchange};
pub use wire::{Authentication, RequestTokenRequest, RequestTokenResponse};
