use std::sync::Arc;

use clap::Parser;
use meetbridge_google::Session;
use meetbridge_mcp::config::{arg_defaults, Args};
use meetbridge_mcp::{Dispatcher, Server, ToolRegistry};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries the protocol; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if args.transport != "stdio" {
        anyhow::bail!("only stdio transport is supported");
    }

    let config = args.google_config()?;
    info!(
        "meetbridge-mcp {} starting (credentials: {})",
        env!("CARGO_PKG_VERSION"),
        config.credentials_path.display()
    );

    let defaults = arg_defaults(&config);
    let session = Session::from_config(config)?;
    let dispatcher = Dispatcher::new(Arc::new(session), defaults);
    let server = Server::new(ToolRegistry::new()?, dispatcher);

    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    info!("meetbridge-mcp shutting down");
    Ok(())
}
