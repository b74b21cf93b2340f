//! HTTP routes.

use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashMap;
use tasksync_core::{ClientId, VersionId};
use tasksync_protocol::{
    format_snapshot_request, parse_client_id, parse_limit, parse_version, AddSnapshotRequest,
    AddVersionRequest, AddVersionResponse, GetChildVersionRequest, GetChildVersionsRequest,
    GetSnapshotRequest, ProtocolError, ADD_SNAPSHOT, ADD_VERSION, CLIENT_PREFIX,
    CONTENT_TYPE_CBOR, CONTENT_TYPE_HISTORY_SEGMENT, CONTENT_TYPE_SNAPSHOT, GET_CHILD_VERSION,
    GET_CHILD_VERSIONS, HEADER_CLIENT_ID, HEADER_PARENT_VERSION_ID, HEADER_SNAPSHOT_REQUEST,
    HEADER_VERSION_ID, SNAPSHOT,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Builds the router for all sync routes.
///
/// Reads are cut off after the request timeout. Writes are not: a write
/// already handed to the store commits even if the client stops waiting,
/// and the client would then see a conflict instead of its own version.
pub fn router(handler: RequestHandler) -> Router {
    let config = &handler.context().config;
    let body_limit = config.max_body_bytes;
    let timeout = config.request_timeout;

    let reads = Router::new()
        .route("/", get(banner))
        .route(
            &format!("{CLIENT_PREFIX}/{GET_CHILD_VERSIONS}/:since"),
            get(get_child_versions),
        )
        .route(
            &format!("{CLIENT_PREFIX}/{GET_CHILD_VERSION}/:parent"),
            get(get_child_version),
        )
        .route(&format!("{CLIENT_PREFIX}/{SNAPSHOT}"), get(get_snapshot))
        .layer(TimeoutLayer::new(timeout));

    let writes = Router::new()
        .route(
            &format!("{CLIENT_PREFIX}/{ADD_VERSION}/:parent"),
            post(add_version),
        )
        .route(
            &format!("{CLIENT_PREFIX}/{ADD_SNAPSHOT}/:version"),
            post(add_snapshot),
        );

    reads
        .merge(writes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn banner() -> &'static str {
    concat!("tasksync-server ", env!("CARGO_PKG_VERSION"))
}

async fn add_version(
    State(handler): State<RequestHandler>,
    Path(parent): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let request = AddVersionRequest {
        client: client_id(&headers)?,
        parent: parse_version(&parent)?,
        payload: body,
    };

    match handler.add_version(request).await? {
        AddVersionResponse::Accepted {
            version,
            snapshot_urgency,
        } => {
            let mut headers = HeaderMap::new();
            insert_version(&mut headers, HEADER_VERSION_ID, version);
            if let Some(value) = format_snapshot_request(snapshot_urgency) {
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(HeaderName::from_static(HEADER_SNAPSHOT_REQUEST), value);
                }
            }
            Ok((StatusCode::OK, headers).into_response())
        }
        AddVersionResponse::Conflict { latest } => {
            let mut headers = HeaderMap::new();
            insert_version(&mut headers, HEADER_PARENT_VERSION_ID, latest);
            Ok((StatusCode::CONFLICT, headers).into_response())
        }
    }
}

async fn get_child_versions(
    State(handler): State<RequestHandler>,
    Path(since): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let request = GetChildVersionsRequest {
        client: client_id(&headers)?,
        since: parse_version(&since)?,
        limit: query.get("limit").map(|l| parse_limit(l)).transpose()?,
    };

    let body = handler.get_child_versions(request).await?.encode()?;
    Ok(([(CONTENT_TYPE, CONTENT_TYPE_CBOR)], body).into_response())
}

async fn get_child_version(
    State(handler): State<RequestHandler>,
    Path(parent): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let request = GetChildVersionRequest {
        client: client_id(&headers)?,
        parent: parse_version(&parent)?,
    };

    let Some(batch) = handler.get_child_version(request).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HISTORY_SEGMENT));
    insert_version(&mut headers, HEADER_VERSION_ID, batch.version);
    insert_version(&mut headers, HEADER_PARENT_VERSION_ID, batch.parent);
    Ok((headers, batch.payload).into_response())
}

async fn add_snapshot(
    State(handler): State<RequestHandler>,
    Path(version): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<StatusCode> {
    let request = AddSnapshotRequest {
        client: client_id(&headers)?,
        version: parse_version(&version)?,
        payload: body,
    };
    handler.add_snapshot(request).await?;
    Ok(StatusCode::OK)
}

async fn get_snapshot(
    State(handler): State<RequestHandler>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let request = GetSnapshotRequest {
        client: client_id(&headers)?,
    };

    let Some(snapshot) = handler.get_snapshot(request).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_SNAPSHOT));
    insert_version(&mut headers, HEADER_VERSION_ID, snapshot.version);
    Ok((headers, snapshot.payload).into_response())
}

fn client_id(headers: &HeaderMap) -> ServerResult<ClientId> {
    let value = headers
        .get(HEADER_CLIENT_ID)
        .map(|v| {
            v.to_str().map_err(|_| ProtocolError::InvalidClientId {
                value: String::from_utf8_lossy(v.as_bytes()).into_owned(),
                reason: "not valid UTF-8".into(),
            })
        })
        .transpose()?;
    parse_client_id(value).map_err(ServerError::from)
}

fn insert_version(headers: &mut HeaderMap, name: &'static str, version: VersionId) {
    headers.insert(
        HeaderName::from_static(name),
        HeaderValue::from(version.as_u64()),
    );
}
