//! Request handlers for the sync operations.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use std::sync::Arc;
use tasksync_core::{Batch, ClientId, CoreError, CoreResult, Snapshot, SnapshotOutcome, SyncStore};
use tasksync_protocol::{
    AddSnapshotRequest, AddSnapshotResponse, AddVersionRequest, AddVersionResponse,
    ChildVersions, GetChildVersionRequest, GetChildVersionsRequest, GetSnapshotRequest,
};

/// Context shared by all request handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The sync store.
    pub store: Arc<SyncStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<SyncStore>) -> Self {
        Self { config, store }
    }
}

/// Handler for sync requests.
///
/// Store calls block on disk I/O and run on tokio's blocking pool.
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Returns the handler context.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Handles AddVersion.
    ///
    /// A conflict is a normal response, not an error.
    pub async fn add_version(&self, request: AddVersionRequest) -> ServerResult<AddVersionResponse> {
        let AddVersionRequest {
            client,
            parent,
            payload,
        } = request;
        self.authorize(client)?;

        match self
            .blocking(move |store| store.append_batch(client, parent, payload))
            .await
        {
            Ok(outcome) => Ok(AddVersionResponse::Accepted {
                version: outcome.version,
                snapshot_urgency: outcome.snapshot_urgency,
            }),
            Err(ServerError::Store(CoreError::Conflict(conflict))) => {
                tracing::info!(
                    %client,
                    latest = %conflict.latest,
                    parent = %conflict.parent,
                    kind = ?conflict.kind(),
                    "rejected version with stale parent"
                );
                Ok(AddVersionResponse::Conflict {
                    latest: conflict.latest,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Handles GetChildVersions.
    pub async fn get_child_versions(
        &self,
        request: GetChildVersionsRequest,
    ) -> ServerResult<ChildVersions> {
        let GetChildVersionsRequest {
            client,
            since,
            limit,
        } = request;
        self.authorize(client)?;

        let limit = self.context.config.page_limits.resolve(limit);
        let (batches, latest) = self
            .blocking(move |store| {
                // Batches first: the latest version read afterwards covers all of them.
                let batches = store.read_batches(client, since, Some(limit + 1))?;
                let latest = store.latest_version(client)?;
                Ok((batches, latest))
            })
            .await?;

        Ok(ChildVersions::page(batches, limit, latest))
    }

    /// Handles the single-child lookup.
    pub async fn get_child_version(
        &self,
        request: GetChildVersionRequest,
    ) -> ServerResult<Option<Batch>> {
        let GetChildVersionRequest { client, parent } = request;
        self.authorize(client)?;
        self.blocking(move |store| store.read_child(client, parent))
            .await
    }

    /// Handles AddSnapshot.
    pub async fn add_snapshot(&self, request: AddSnapshotRequest) -> ServerResult<AddSnapshotResponse> {
        let AddSnapshotRequest {
            client,
            version,
            payload,
        } = request;
        self.authorize(client)?;

        let outcome = self
            .blocking(move |store| store.store_snapshot(client, version, payload))
            .await?;
        Ok(match outcome {
            SnapshotOutcome::Stored => AddSnapshotResponse::Stored,
            SnapshotOutcome::Superseded { current } => AddSnapshotResponse::Superseded { current },
        })
    }

    /// Handles GetSnapshot.
    pub async fn get_snapshot(&self, request: GetSnapshotRequest) -> ServerResult<Option<Snapshot>> {
        let client = request.client;
        self.authorize(client)?;
        self.blocking(move |store| store.read_latest_snapshot(client))
            .await
    }

    fn authorize(&self, client: ClientId) -> ServerResult<()> {
        if self.context.config.is_allowed(&client) {
            Ok(())
        } else {
            tracing::warn!(%client, "client not on the allow-list");
            Err(ServerError::NotAllowed(client))
        }
    }

    async fn blocking<T, F>(&self, f: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SyncStore) -> CoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.context.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ServerError::Internal(format!("storage task failed: {e}")))?
            .map_err(ServerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tasksync_core::{SnapshotUrgency, StoreConfig, VersionId};

    fn create_handler(config: ServerConfig) -> RequestHandler {
        let store = Arc::new(SyncStore::in_memory(config.store.clone()));
        RequestHandler::new(Arc::new(HandlerContext::new(config, store)))
    }

    fn add(client: ClientId, parent: u64, payload: &'static [u8]) -> AddVersionRequest {
        AddVersionRequest {
            client,
            parent: VersionId::new(parent),
            payload: Bytes::from_static(payload),
        }
    }

    #[tokio::test]
    async fn add_and_pull() {
        let handler = create_handler(ServerConfig::default());
        let client = ClientId::generate();

        let response = handler.add_version(add(client, 0, b"first")).await.unwrap();
        assert_eq!(
            response,
            AddVersionResponse::Accepted {
                version: VersionId::new(1),
                snapshot_urgency: SnapshotUrgency::None,
            }
        );

        let page = handler
            .get_child_versions(GetChildVersionsRequest {
                client,
                since: VersionId::NIL,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(page.latest, 1);
        assert_eq!(page.versions.len(), 1);
        assert_eq!(page.versions[0].payload, Bytes::from_static(b"first"));
    }

    #[tokio::test]
    async fn conflict_is_a_response() {
        let handler = create_handler(ServerConfig::default());
        let client = ClientId::generate();
        handler.add_version(add(client, 0, b"a")).await.unwrap();
        handler.add_version(add(client, 1, b"b")).await.unwrap();

        let response = handler.add_version(add(client, 1, b"late")).await.unwrap();
        assert_eq!(
            response,
            AddVersionResponse::Conflict {
                latest: VersionId::new(2)
            }
        );
    }

    #[tokio::test]
    async fn pull_pagination() {
        let handler = create_handler(ServerConfig::default());
        let client = ClientId::generate();
        for parent in 0..5 {
            handler.add_version(add(client, parent, b"x")).await.unwrap();
        }

        let mut since = VersionId::NIL;
        let mut pages = Vec::new();
        loop {
            let page = handler
                .get_child_versions(GetChildVersionsRequest {
                    client,
                    since,
                    limit: Some(2),
                })
                .await
                .unwrap();
            pages.push(page.versions.len());
            match page.versions.last() {
                Some(last) if page.has_more => since = VersionId::new(last.version),
                _ => break,
            }
        }
        assert_eq!(pages, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn allow_list() {
        let allowed = ClientId::generate();
        let handler = create_handler(ServerConfig::default().with_allowed_clients([allowed]));

        assert!(handler.add_version(add(allowed, 0, b"ok")).await.is_ok());
        let err = handler
            .add_version(add(ClientId::generate(), 0, b"no"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotAllowed(_)));
    }

    #[tokio::test]
    async fn snapshots() {
        let handler = create_handler(
            ServerConfig::default().with_store(StoreConfig::default().with_sync_on_write(false)),
        );
        let client = ClientId::generate();
        assert!(handler
            .get_snapshot(GetSnapshotRequest { client })
            .await
            .unwrap()
            .is_none());

        handler.add_version(add(client, 0, b"a")).await.unwrap();
        let stored = handler
            .add_snapshot(AddSnapshotRequest {
                client,
                version: VersionId::new(1),
                payload: Bytes::from_static(b"state"),
            })
            .await
            .unwrap();
        assert_eq!(stored, AddSnapshotResponse::Stored);

        let snapshot = handler
            .get_snapshot(GetSnapshotRequest { client })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.version, VersionId::new(1));
        assert_eq!(snapshot.payload, Bytes::from_static(b"state"));

        let err = handler
            .add_snapshot(AddSnapshotRequest {
                client,
                version: VersionId::new(9),
                payload: Bytes::from_static(b"future"),
            })
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
