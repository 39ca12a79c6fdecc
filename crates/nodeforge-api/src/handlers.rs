//! REST API handlers.
//!
//! Reads go straight to the conductor's `StateStore`; the resize action goes
//! through `Conductor::resize`, which returns as soon as the backend
//! operation is dispatched.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, info};

use nodeforge_resize::{ResizeError, ScalingOutcome, ScalingRequest};
use nodeforge_state::{Cluster, LifecycleStatus, NodeGroup, StateResult, StateStore};

use crate::ApiState;
use crate::version::{self, ApiVersion, MIN_VERSION, RESIZE_VERSION, VERSION_HEADER};

/// Error body: a stable kind plus a human-readable message.
#[derive(Serialize)]
struct ErrorBody {
    error_kind: String,
    message: String,
}

fn error_response(kind: &str, msg: &str, status: StatusCode, version: Option<ApiVersion>) -> Response {
    let mut resp = (
        status,
        Json(ErrorBody {
            error_kind: kind.to_string(),
            message: msg.to_string(),
        }),
    )
        .into_response();
    if let Some(v) = version {
        resp.headers_mut().insert(VERSION_HEADER, v.header_value());
    }
    resp
}

fn ok_response<T: Serialize>(status: StatusCode, body: T, version: ApiVersion) -> Response {
    let mut resp = (status, Json(body)).into_response();
    resp.headers_mut().insert(VERSION_HEADER, version.header_value());
    resp
}

/// HTTP status for an engine rejection.
pub fn status_for(err: &ResizeError) -> StatusCode {
    match err {
        ResizeError::ClusterNotFound(_) => StatusCode::NOT_FOUND,
        ResizeError::ConflictInProgress { .. } | ResizeError::InvalidState { .. } => {
            StatusCode::CONFLICT
        }
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn negotiate(headers: &HeaderMap, minimum: ApiVersion) -> Result<ApiVersion, Response> {
    version::negotiate(headers, minimum).map_err(|e| {
        let echo = match &e {
            version::VersionError::Unsupported(v) => Some(*v),
            version::VersionError::Malformed(_) => None,
        };
        error_response(e.kind(), &e.to_string(), e.status(), echo)
    })
}

// ── Views ──────────────────────────────────────────────────────

/// Cluster as returned by `GET /v1/clusters` and `GET /v1/clusters/{id}`.
#[derive(Debug, Serialize)]
pub struct ClusterView {
    pub uuid: String,
    pub name: String,
    pub cluster_template_id: String,
    pub status: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    /// Sum of the worker nodegroups' node counts.
    pub node_count: u32,
    /// A resize accepted by this process has not finished recording its outcome.
    pub operation_in_flight: bool,
    pub nodegroups: Vec<NodeGroup>,
}

impl ClusterView {
    fn load(store: &StateStore, cluster: Cluster, operation_in_flight: bool) -> StateResult<Self> {
        let registry = store.load_registry(&cluster.id)?;
        let outcome = ScalingOutcome::snapshot(&cluster, &registry);
        Ok(Self::new(cluster, &outcome, registry.into_vec(), operation_in_flight))
    }

    fn new(
        cluster: Cluster,
        outcome: &ScalingOutcome,
        nodegroups: Vec<NodeGroup>,
        operation_in_flight: bool,
    ) -> Self {
        Self {
            uuid: cluster.id,
            name: cluster.name,
            cluster_template_id: cluster.cluster_template_id,
            status: cluster.status,
            status_reason: cluster.status_reason,
            node_count: outcome.node_count,
            operation_in_flight,
            nodegroups,
        }
    }
}

// ── Clusters ───────────────────────────────────────────────────

/// GET /v1/clusters
pub async fn list_clusters(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let version = match negotiate(&headers, MIN_VERSION) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let store = state.conductor.state();
    let views = store.list_clusters().and_then(|clusters| {
        clusters
            .into_iter()
            .map(|cluster| {
                let busy = state.conductor.is_busy(&cluster.id);
                ClusterView::load(store, cluster, busy)
            })
            .collect::<StateResult<Vec<_>>>()
    });
    match views {
        Ok(views) => ok_response(StatusCode::OK, views, version),
        Err(e) => error_response("StateError", &e.to_string(), StatusCode::INTERNAL_SERVER_ERROR, Some(version)),
    }
}

/// GET /v1/clusters/{id}
pub async fn get_cluster(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let version = match negotiate(&headers, MIN_VERSION) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let store = state.conductor.state();
    let cluster = match store.get_cluster(&id) {
        Ok(Some(c)) => c,
        Ok(None) => {
            return error_response(
                "ClusterNotFound",
                &format!("cluster not found: {id}"),
                StatusCode::NOT_FOUND,
                Some(version),
            );
        }
        Err(e) => {
            return error_response("StateError", &e.to_string(), StatusCode::INTERNAL_SERVER_ERROR, Some(version));
        }
    };

    match ClusterView::load(store, cluster, state.conductor.is_busy(&id)) {
        Ok(view) => ok_response(StatusCode::OK, view, version),
        Err(e) => error_response("StateError", &e.to_string(), StatusCode::INTERNAL_SERVER_ERROR, Some(version)),
    }
}

// ── Resize ─────────────────────────────────────────────────────

/// POST /v1/clusters/{id}/actions/resize
pub async fn resize_cluster(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ScalingRequest>,
) -> Response {
    let version = match negotiate(&headers, RESIZE_VERSION) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.conductor.resize(&id, req) {
        Ok(accepted) => {
            info!(cluster_id = %id, %version, "resize request accepted");
            // The operation keeps running after the handle is dropped.
            ok_response(StatusCode::ACCEPTED, accepted.outcome, version)
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                error!(cluster_id = %id, error = %e, "resize request failed");
            }
            error_response(e.kind(), &e.to_string(), status, Some(version))
        }
    }
}
