//! Courier chat server: prints received messages to stdout in order.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use courier_protocol::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "courier-server", about = "Receive Courier messages on stdout")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:4433")]
    bind: SocketAddr,

    /// Receive reorder window size.
    #[arg(long, default_value_t = 5)]
    window: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = ServerConfig {
        window_size: args.window,
        ..ServerConfig::new(args.bind)
    };

    let shutdown = ShutdownToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            interrupt.trigger();
        }
    });

    match run_server(config, WriteSink(std::io::stdout()), shutdown).await {
        Ok(summary) => {
            info!(
                delivered = summary.packets_delivered,
                acks = summary.acks_sent,
                "server finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}
