//! Courier chat client: reads lines from stdin and sends them reliably.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use courier_protocol::core::constants::MAX_PAYLOAD_SIZE;
use courier_protocol::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "courier-client", about = "Send stdin lines over Courier")]
struct Args {
    /// Address of the Courier server.
    #[arg(long)]
    peer: SocketAddr,

    /// Local address to bind.
    #[arg(long, default_value = "0.0.0.0:0")]
    bind: SocketAddr,

    /// Sliding window size.
    #[arg(long, default_value_t = 5)]
    window: usize,

    /// File receiving one `seq,millis` line per acknowledged packet.
    #[arg(long, default_value = "output.txt")]
    stats: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let stats = match FileStats::create(&args.stats) {
        Ok(stats) => stats,
        Err(e) => {
            error!(path = %args.stats.display(), error = %e, "cannot open stats file");
            return ExitCode::FAILURE;
        }
    };

    let config = ClientConfig::builder(args.peer)
        .bind_addr(args.bind)
        .window_size(args.window)
        .build();

    let shutdown = ShutdownToken::new();
    let (tx, rx) = mpsc::channel(32);

    // Long lines are split into payload-sized chunks; each chunk rides one
    // packet.
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            for chunk in line.as_bytes().chunks(MAX_PAYLOAD_SIZE) {
                if tx.send(chunk.to_vec()).await.is_err() {
                    return;
                }
            }
        }
        // Dropping the channel signals end of input to the session.
    });

    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            interrupt.trigger();
        }
    });

    let result = run_client(config, rx, stats, shutdown).await;
    reader.abort();

    match result {
        Ok(()) => {
            info!(stats = %args.stats.display(), "session finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "session failed");
            ExitCode::FAILURE
        }
    }
}
