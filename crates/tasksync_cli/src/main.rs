//! tasksync-server
//!
//! Serves the sync protocol for one data directory on one port.
//!
//! Exits 0 after a graceful shutdown (SIGINT or SIGTERM) and 1 if the data
//! directory or the port cannot be used, or serving fails.

mod cli;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tasksync_server::{shutdown_signal, ServerResult, SyncServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tasksync-server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> ServerResult<()> {
    let config = cli.server_config();
    tracing::info!(
        data_dir = %config.data_dir.display(),
        listen = %config.listen_addr,
        allow_list = config.allowed_clients.as_ref().map_or(0, |c| c.len()),
        sync_on_write = config.store.sync_on_write,
        "starting tasksync-server {}",
        env!("CARGO_PKG_VERSION")
    );

    let server = SyncServer::open(config)?;
    let handle = server.start_with_shutdown(shutdown_signal()).await?;
    handle.wait().await
}
