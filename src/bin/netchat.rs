//! netchat - terminal client for the netchat relay
//!
//! # Usage
//!
//! ```text
//! netchat                       # connect to $NETCHAT_ADDR or localhost:8080
//! netchat --addr host:9000      # connect to a specific server
//! ```

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use netchat_client::{ChatClient, ExitReason};
use netchatd::config::{ADDRESS_ENV, DEFAULT_ADDRESS};

// ============================================================================
// CLI Arguments
// ============================================================================

/// netchat - chat with up to two other people over TCP
#[derive(Parser, Debug)]
#[command(name = "netchat", version, about)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, env = ADDRESS_ENV, default_value = DEFAULT_ADDRESS)]
    addr: String,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    // stdout belongs to the conversation; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("netchat_client=warn".parse()?),
        )
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));

    // A blocking stdin read may still be pending; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let client = ChatClient::connect(&args.addr).await?;

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let reason = client
        .run(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            cancel_token,
        )
        .await?;

    debug!(?reason, "Client exiting");
    if reason == ExitReason::ServerClosed {
        eprintln!("\nDisconnected from server.");
    }

    Ok(())
}
