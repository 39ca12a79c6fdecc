//! nodeforge-api — REST API for nodeforge.
//!
//! A thin boundary over the resize [`Conductor`]: it decodes requests,
//! negotiates the API microversion, and maps engine errors to HTTP status
//! codes. All decisions are made by the engine.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/v1/clusters` | List clusters |
//! | GET | `/v1/clusters/{id}` | Cluster snapshot with nodegroups |
//! | POST | `/v1/clusters/{id}/actions/resize` | Resize a nodegroup (202) |
//!
//! Requests may carry `OpenStack-API-Version: container-infra X.Y`;
//! see [`version`].

pub mod handlers;
pub mod version;

use axum::Router;
use axum::routing::{get, post};
use nodeforge_resize::Conductor;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub conductor: Conductor,
}

/// Build the API router.
pub fn build_router(conductor: Conductor) -> Router {
    let api_state = ApiState { conductor };

    let api_routes = Router::new()
        .route("/clusters", get(handlers::list_clusters))
        .route("/clusters/{id}", get(handlers::get_cluster))
        .route("/clusters/{id}/actions/resize", post(handlers::resize_cluster))
        .with_state(api_state);

    Router::new().nest("/v1", api_routes)
}
