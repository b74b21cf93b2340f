//! Command-line arguments.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tasksync_core::{ClientId, SnapshotPolicy, StoreConfig};
use tasksync_server::ServerConfig;

/// Sync server for local-first task databases.
#[derive(Debug, Parser)]
#[command(name = "tasksync-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding all client data
    #[arg(long, env = "DATA_DIR", default_value = "/var/lib/tasksync")]
    pub data_dir: PathBuf,

    /// TCP port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub listen: IpAddr,

    /// Only accept these client ids (repeat or comma-separate)
    #[arg(long = "allow-client-id", env = "CLIENT_ID", value_delimiter = ',')]
    pub allow_client_id: Vec<ClientId>,

    /// Versions after which clients are asked for a snapshot; urgency is
    /// high at twice this
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    pub snapshot_versions: u64,

    /// Do not fsync each version before acknowledging it
    #[arg(long)]
    pub no_sync: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Builds the server configuration.
    pub fn server_config(&self) -> ServerConfig {
        let store = StoreConfig::default()
            .with_sync_on_write(!self.no_sync)
            .with_snapshot_policy(SnapshotPolicy::new(
                self.snapshot_versions,
                self.snapshot_versions.saturating_mul(2),
            ));

        let config = ServerConfig::new(SocketAddr::new(self.listen, self.port), &self.data_dir)
            .with_store(store);
        if self.allow_client_id.is_empty() {
            config
        } else {
            config.with_allowed_clients(self.allow_client_id.iter().copied())
        }
    }
}
