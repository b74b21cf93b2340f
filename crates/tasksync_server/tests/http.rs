//! In-process HTTP tests of the sync routes.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tasksync_core::{ClientId, SnapshotUrgency, StoreConfig, SyncStore, VersionId};
use tasksync_protocol::{
    add_snapshot_path, add_version_path, get_child_version_path, get_child_versions_path,
    parse_snapshot_request, snapshot_path, ChildVersions, HEADER_CLIENT_ID,
    HEADER_PARENT_VERSION_ID, HEADER_SNAPSHOT_REQUEST, HEADER_VERSION_ID,
};
use tasksync_server::{ServerConfig, SyncServer};
use tower::ServiceExt;

fn app(config: ServerConfig) -> Router {
    let store = Arc::new(SyncStore::in_memory(config.store.clone()));
    SyncServer::with_store(config, store).router()
}

fn post(path: &str, client: ClientId, body: &'static [u8]) -> Request<Body> {
    Request::post(path)
        .header(HEADER_CLIENT_ID, client.to_string())
        .body(Body::from(body))
        .unwrap()
}

fn get(path: &str, client: ClientId) -> Request<Body> {
    Request::get(path)
        .header(HEADER_CLIENT_ID, client.to_string())
        .body(Body::empty())
        .unwrap()
}

fn header(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
}

async fn body(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

#[tokio::test]
async fn banner() {
    let response = app(ServerConfig::default())
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(String::from_utf8(body(response).await).unwrap().starts_with("tasksync-server"));
}

#[tokio::test]
async fn add_version_then_pull() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();

    let response = app
        .clone()
        .oneshot(post(&add_version_path(VersionId::NIL), client, b"\x00segment\xff"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, HEADER_VERSION_ID).as_deref(), Some("1"));
    assert_eq!(header(&response, HEADER_SNAPSHOT_REQUEST), None);

    let response = app
        .clone()
        .oneshot(get(&get_child_versions_path(VersionId::NIL), client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = ChildVersions::decode(&body(response).await).unwrap();
    assert_eq!(page.latest, 1);
    assert!(!page.has_more);
    assert_eq!(page.versions[0].payload.as_ref(), b"\x00segment\xff");

    let response = app
        .oneshot(get(&get_child_version_path(VersionId::NIL), client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, HEADER_VERSION_ID).as_deref(), Some("1"));
    assert_eq!(header(&response, HEADER_PARENT_VERSION_ID).as_deref(), Some("0"));
    assert_eq!(body(response).await, b"\x00segment\xff");
}

#[tokio::test]
async fn stale_parent_is_409_with_latest() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();
    for parent in 0..5 {
        let response = app
            .clone()
            .oneshot(post(&add_version_path(VersionId::new(parent)), client, b"x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post(&add_version_path(VersionId::new(4)), client, b"late"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(header(&response, HEADER_PARENT_VERSION_ID).as_deref(), Some("5"));

    let response = app
        .oneshot(get(&get_child_versions_path(VersionId::new(4)), client))
        .await
        .unwrap();
    let page = ChildVersions::decode(&body(response).await).unwrap();
    assert_eq!(page.versions.len(), 1);
    assert_eq!(page.versions[0].version, 5);
}

#[tokio::test]
async fn child_of_largest_version_is_404() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();
    app.clone()
        .oneshot(post(&add_version_path(VersionId::NIL), client, b"x"))
        .await
        .unwrap();

    let response = app
        .oneshot(get(&get_child_version_path(VersionId::new(u64::MAX)), client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_or_bad_client_id_is_400() {
    let app = app(ServerConfig::default());

    let response = app
        .clone()
        .oneshot(
            Request::post(add_version_path(VersionId::NIL))
                .body(Body::from("x"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::get(snapshot_path())
                .header(HEADER_CLIENT_ID, "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_version_or_limit_is_400() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();

    let response = app
        .clone()
        .oneshot(post("/v1/client/add-version/abc", client, b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/v1/client/get-child-versions/0?limit=0", client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_client_reads_are_empty() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();

    let response = app
        .clone()
        .oneshot(get(&get_child_versions_path(VersionId::NIL), client))
        .await
        .unwrap();
    let page = ChildVersions::decode(&body(response).await).unwrap();
    assert!(page.versions.is_empty());
    assert_eq!(page.latest, 0);

    let response = app
        .clone()
        .oneshot(get(&get_child_version_path(VersionId::NIL), client))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get(&snapshot_path(), client)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn limit_pages_results() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();
    for parent in 0..3 {
        app.clone()
            .oneshot(post(&add_version_path(VersionId::new(parent)), client, b"x"))
            .await
            .unwrap();
    }

    let response = app
        .oneshot(get("/v1/client/get-child-versions/0?limit=2", client))
        .await
        .unwrap();
    let page = ChildVersions::decode(&body(response).await).unwrap();
    assert_eq!(page.versions.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.latest, 3);
}

#[tokio::test]
async fn snapshot_round_trip() {
    let app = app(ServerConfig::default());
    let client = ClientId::generate();
    for parent in 0..2 {
        app.clone()
            .oneshot(post(&add_version_path(VersionId::new(parent)), client, b"x"))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(post(&add_snapshot_path(VersionId::new(2)), client, b"state@2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Older snapshots are acknowledged but never replace a newer one.
    let response = app
        .clone()
        .oneshot(post(&add_snapshot_path(VersionId::new(1)), client, b"state@1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(&add_snapshot_path(VersionId::new(7)), client, b"future"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get(&snapshot_path(), client)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, HEADER_VERSION_ID).as_deref(), Some("2"));
    assert_eq!(body(response).await, b"state@2");
}

#[tokio::test]
async fn snapshot_request_header() {
    let store =
        StoreConfig::default().with_snapshot_policy(tasksync_core::SnapshotPolicy::new(1, 2));
    let app = app(ServerConfig::default().with_store(store));
    let client = ClientId::generate();

    let response = app
        .clone()
        .oneshot(post(&add_version_path(VersionId::NIL), client, b"x"))
        .await
        .unwrap();
    let urgency = header(&response, HEADER_SNAPSHOT_REQUEST).unwrap();
    assert_eq!(parse_snapshot_request(&urgency).unwrap(), SnapshotUrgency::Low);

    let response = app
        .oneshot(post(&add_version_path(VersionId::new(1)), client, b"x"))
        .await
        .unwrap();
    let urgency = header(&response, HEADER_SNAPSHOT_REQUEST).unwrap();
    assert_eq!(parse_snapshot_request(&urgency).unwrap(), SnapshotUrgency::High);
}

#[tokio::test]
async fn allow_list_is_403() {
    let allowed = ClientId::generate();
    let app = app(ServerConfig::default().with_allowed_clients([allowed]));

    let response = app
        .clone()
        .oneshot(post(&add_version_path(VersionId::NIL), allowed, b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post(&add_version_path(VersionId::NIL), ClientId::generate(), b"x"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let app = app(ServerConfig::default().with_max_body_bytes(8));
    let client = ClientId::generate();

    let response = app
        .oneshot(post(&add_version_path(VersionId::NIL), client, b"far too many bytes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn writes_are_not_cut_off_by_the_request_timeout() {
    let app = app(ServerConfig::default().with_request_timeout(Duration::ZERO));
    let client = ClientId::generate();

    for parent in 0..2 {
        let response = app
            .clone()
            .oneshot(post(&add_version_path(VersionId::new(parent)), client, b"x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post(&add_snapshot_path(VersionId::new(2)), client, b"state"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
