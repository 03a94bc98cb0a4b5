//! Tern sign-in CLI
//!
//! Terminal stand-in for the mobile sign-in screen: runs the relayed
//! exchange, prints the authorize URL, and accepts the redirect URL pasted
//! back from the browser.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not
//! debug output).

use std::io::{self, BufRead, Write};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use tern_oauth::{HttpRelay, RelayConfig, RelayedExchange};

#[derive(Parser, Debug)]
#[command(name = "tern-signin")]
#[command(version, about = "Sign in to Tern through the relay host", long_about = None)]
struct Cli {
    /// Relay base URL
    #[arg(long, default_value = "https://relay.tern.app")]
    relay_url: String,

    /// Relay static public key (base64, 32 bytes)
    #[arg(long)]
    host_key: String,

    /// OAuth consumer key to exchange
    #[arg(long)]
    consumer_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tern=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting tern sign-in");

    let config = RelayConfig::from_base64_key(&cli.relay_url, &cli.host_key)?;
    info!(host = %config.host_key_fingerprint(), "pinned relay trust anchor");
    let transport = HttpRelay::new(&config)?;
    let mut exchange = RelayedExchange::new(config, transport, cli.consumer_key);

    let authorize = exchange.start().await?;

    let mut stdout = io::stdout();
    writeln!(stdout, "Open this URL in your browser and authorize the app:")?;
    writeln!(stdout)?;
    writeln!(stdout, "    {authorize}")?;
    writeln!(stdout)?;
    writeln!(stdout, "Paste the redirect URL the browser sent you back to:")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let redirect = Url::parse(line.trim())?;

    let authentication = exchange.handle_callback(&redirect)?;

    writeln!(
        stdout,
        "Signed in as @{} (user id {}).",
        authentication.screen_name, authentication.user_id
    )?;
    writeln!(
        stdout,
        "Access token received; hand the credentials to the account store."
    )?;
    Ok(())
}
