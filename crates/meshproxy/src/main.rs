use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use meshproxy::DealerTransport;
use meshproxy::Dispatcher;
use meshproxy::ProxyConfig;
use meshproxy::Worker;
use meshproxy::logging;
use meshproxy::registry;
use tokio::io::BufReader;
use tracing::info;

/// Mesh controller and aggregator RPC proxy.
///
/// Reads JSON instructions from stdin, one per line, and writes results to stdout.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file. Defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verify the message registry and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init("info");

    let config = match &args.config {
        Some(path) => ProxyConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ProxyConfig::default(),
    };

    let routes = registry::verify()?;
    info!(routes, "message registry verified");
    if args.check {
        return Ok(());
    }

    info!(
        controller_port = config.backend.controller_port,
        aggregator_port = config.backend.aggregator_port,
        exchange_timeout_ms = config.backend.exchange_timeout_ms,
        "proxy ready"
    );

    let dispatcher = Arc::new(Dispatcher::new(Arc::new(DealerTransport::new()), Arc::new(config)));
    let worker = Arc::new(Worker::new(dispatcher));
    worker
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("IPC channel failed")?;

    info!("input closed, exiting");
    Ok(())
}
