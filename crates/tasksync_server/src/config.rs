//! Server configuration.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tasksync_core::{ClientId, StoreConfig};
use tasksync_protocol::PageLimits;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub listen_addr: SocketAddr,
    /// Directory holding all client data.
    pub data_dir: PathBuf,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Page sizes for get-child-versions.
    pub page_limits: PageLimits,
    /// Clients allowed to sync. `None` admits every client.
    pub allowed_clients: Option<HashSet<ClientId>>,
    /// Store settings.
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Creates a configuration serving `data_dir` on `listen_addr`.
    pub fn new(listen_addr: SocketAddr, data_dir: impl Into<PathBuf>) -> Self {
        let store = StoreConfig::default();
        Self {
            listen_addr,
            data_dir: data_dir.into(),
            request_timeout: Duration::from_secs(30),
            max_body_bytes: store.max_payload_bytes,
            page_limits: PageLimits::default(),
            allowed_clients: None,
            store,
        }
    }

    /// Sets the listen address.
    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the body limit, for requests and for the store.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self.store.max_payload_bytes = max;
        self
    }

    /// Sets the get-child-versions page sizes.
    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.page_limits = limits;
        self
    }

    /// Restricts syncing to the given clients.
    pub fn with_allowed_clients(mut self, clients: impl IntoIterator<Item = ClientId>) -> Self {
        self.allowed_clients = Some(clients.into_iter().collect());
        self
    }

    /// Sets the store configuration.
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Returns true if `client` may sync.
    pub fn is_allowed(&self, client: &ClientId) -> bool {
        self.allowed_clients
            .as_ref()
            .map_or(true, |allowed| allowed.contains(client))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)), "/var/lib/tasksync")
    }
}
