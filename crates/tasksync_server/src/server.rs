//! Server lifecycle.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::routes;
use axum::Router;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tasksync_core::SyncStore;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle state of a [`SyncServer`].
///
/// States only move forward: `Starting -> Serving -> ShuttingDown -> Stopped`.
/// A failed start goes straight from `Starting` to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServerState {
    /// Opening storage and binding the listener.
    Starting,
    /// Accepting requests.
    Serving,
    /// No new connections; in-flight requests are draining.
    ShuttingDown,
    /// Storage is closed.
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Starting => "starting",
            ServerState::Serving => "serving",
            ServerState::ShuttingDown => "shutting down",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// The sync server.
///
/// ```no_run
/// # async fn run() -> tasksync_server::ServerResult<()> {
/// use tasksync_server::{shutdown_signal, ServerConfig, SyncServer};
///
/// let config = ServerConfig::new("0.0.0.0:8080".parse().unwrap(), "/var/lib/tasksync");
/// let server = SyncServer::open(config)?;
/// server.start_with_shutdown(shutdown_signal()).await?.wait().await
/// # }
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    state: watch::Sender<ServerState>,
}

impl SyncServer {
    /// Opens the configured data directory.
    ///
    /// Fails if the directory cannot be created, is not writable or is in use
    /// by another server. Nothing is bound yet.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = SyncStore::open_dir(&config.data_dir, config.store.clone())?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Creates a server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<SyncStore>) -> Self {
        let handler = RequestHandler::new(Arc::new(HandlerContext::new(config, store)));
        let (state, _) = watch::channel(ServerState::Starting);
        Self { handler, state }
    }

    /// Returns the current state.
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Builds the HTTP router without binding anything.
    pub fn router(&self) -> Router {
        routes::router(self.handler.clone())
    }

    /// Binds the listener and serves until [`ServerHandle::shutdown`].
    pub async fn start(self) -> ServerResult<ServerHandle> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Binds the listener and serves until `signal` resolves or
    /// [`ServerHandle::shutdown`] is called.
    pub async fn start_with_shutdown<F>(self, signal: F) -> ServerResult<ServerHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.handler.context().config.listen_addr;
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.state.send_replace(ServerState::Stopped);
                return Err(ServerError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;

        let router = self.router();
        let store = Arc::clone(&self.handler.context().store);
        let state = Arc::new(self.state);
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        state.send_replace(ServerState::Serving);
        tracing::info!(%local_addr, "serving");

        let requested = async move {
            // A dropped handle never requests shutdown.
            if shutdown_rx.wait_for(|requested| *requested).await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let draining = Arc::clone(&state);
        let graceful = async move {
            tokio::select! {
                () = signal => {}
                () = requested => {}
            }
            draining.send_replace(ServerState::ShuttingDown);
            tracing::info!("shutting down, draining in-flight requests");
        };

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
                .map_err(ServerError::from);
            let closed = tokio::task::spawn_blocking(move || store.close())
                .await
                .map_err(|e| ServerError::Internal(format!("close task failed: {e}")))
                .and_then(|r| r.map_err(ServerError::from));
            state.send_replace(ServerState::Stopped);
            tracing::info!("stopped");
            served.and(closed)
        });

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<ServerResult<()>>,
}

impl ServerHandle {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Waits until the server has stopped.
    pub async fn wait(self) -> ServerResult<()> {
        self.task
            .await
            .map_err(|e| ServerError::Internal(format!("server task failed: {e}")))?
    }
}

/// Resolves on SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksync_core::StoreConfig;

    #[test]
    fn states_are_ordered() {
        assert!(ServerState::Starting < ServerState::Serving);
        assert!(ServerState::Serving < ServerState::ShuttingDown);
        assert!(ServerState::ShuttingDown < ServerState::Stopped);
        assert_eq!(ServerState::ShuttingDown.to_string(), "shutting down");
    }

    #[test]
    fn new_server_is_starting() {
        let server = SyncServer::with_store(
            ServerConfig::default(),
            Arc::new(SyncStore::in_memory(StoreConfig::default())),
        );
        assert_eq!(server.state(), ServerState::Starting);
    }
}
