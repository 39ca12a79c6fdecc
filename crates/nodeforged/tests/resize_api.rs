//! Resize API regression tests.
//!
//! Drives the full router (API → conductor → simulated backend → state
//! store) the way the daemon assembles it.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use nodeforge_api::build_router;
use nodeforge_resize::{Conductor, ResizeConfig, SimulatedBackend, SimulatedConfig};
use nodeforge_state::*;

struct TestCluster {
    router: Router,
    cluster: Cluster,
    worker: NodeGroup,
    master: NodeGroup,
}

fn setup(backend: SimulatedConfig, adjust: impl FnOnce(&mut NodeGroup)) -> TestCluster {
    let store = StateStore::open_in_memory().unwrap();
    let cluster = Cluster::new("cluster_example_A", "template-1");
    let mut worker = NodeGroup::new(&cluster.id, "default-worker", NodeGroupRole::Worker, 3).as_default();
    adjust(&mut worker);
    let master = NodeGroup::new(&cluster.id, "default-master", NodeGroupRole::Master, 1).as_default();
    store.put_cluster(&cluster).unwrap();
    store.put_nodegroup(&worker).unwrap();
    store.put_nodegroup(&master).unwrap();

    let conductor = Conductor::new(
        store,
        Arc::new(SimulatedBackend::new(backend)),
        &ResizeConfig::default(),
    );
    TestCluster {
        router: build_router(conductor),
        cluster,
        worker,
        master,
    }
}

fn resize_request(cluster_id: &str, version: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/v1/clusters/{cluster_id}/actions/resize"))
        .header("content-type", "application/json")
        .header("OpenStack-API-Version", format!("container-infra {version}"))
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_cluster(router: &Router, cluster_id: &str) -> serde_json::Value {
    let req = Request::builder()
        .uri(format!("/v1/clusters/{cluster_id}"))
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

/// Poll until the cluster leaves `update_in_progress`.
async fn wait_settled(router: &Router, cluster_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let body = get_cluster(router, cluster_id).await;
        if body["status"] != "update_in_progress" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("cluster {cluster_id} never settled");
}

// ── Accepted ───────────────────────────────────────────────────

#[tokio::test]
async fn resize_default_worker_is_accepted_and_applied() {
    let t = setup(SimulatedConfig::default(), |_| {});

    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 6})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = body_json(resp).await;
    assert_eq!(body["uuid"], t.cluster.id.as_str());
    assert_eq!(body["cluster_template_id"], "template-1");
    assert_eq!(body["status"], "update_in_progress");

    let settled = wait_settled(&t.router, &t.cluster.id).await;
    assert_eq!(settled["status"], "stable");
    assert_eq!(settled["node_count"], 6);
    let worker = settled["nodegroups"]
        .as_array()
        .unwrap()
        .iter()
        .find(|ng| ng["id"] == t.worker.id.as_str())
        .unwrap();
    assert_eq!(worker["node_count"], 6);
    assert_eq!(worker["nodes"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn resize_named_worker_with_removals() {
    let t = setup(SimulatedConfig::default(), |ng| {
        ng.node_count = 4;
        ng.nodes = (0..4).map(|i| format!("default-worker-node-{i}")).collect();
    });

    let body = serde_json::json!({
        "node_count": 3,
        "nodegroup": "default-worker",
        "nodes_to_remove": ["default-worker-node-2"],
    });
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.10", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let settled = wait_settled(&t.router, &t.cluster.id).await;
    assert_eq!(settled["node_count"], 3);
    let worker = settled["nodegroups"]
        .as_array()
        .unwrap()
        .iter()
        .find(|ng| ng["name"] == "default-worker")
        .unwrap();
    let nodes: Vec<&str> = worker["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n.as_str().unwrap())
        .collect();
    assert_eq!(
        nodes,
        vec!["default-worker-node-0", "default-worker-node-1", "default-worker-node-3"]
    );
}

// ── Rejected ───────────────────────────────────────────────────

#[tokio::test]
async fn resize_master_nodegroup_is_bad_request() {
    let t = setup(SimulatedConfig::default(), |_| {});
    let body = serde_json::json!({"node_count": 6, "nodegroup": t.master.id});
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error_kind"], "InvalidTarget");
}

#[tokio::test]
async fn resize_above_max_is_bad_request() {
    let t = setup(SimulatedConfig::default(), |ng| ng.max_node_count = Some(5));
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 6})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error_kind"], "AboveMaximum");
}

#[tokio::test]
async fn resize_below_min_is_bad_request() {
    let t = setup(SimulatedConfig::default(), |ng| {
        ng.node_count = 6;
        ng.nodes = (0..6).map(|i| format!("default-worker-node-{i}")).collect();
        ng.min_node_count = 4;
    });
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 3})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error_kind"], "BelowMinimum");

    let body = get_cluster(&t.router, &t.cluster.id).await;
    assert_eq!(body["status"], "stable");
    assert_eq!(body["node_count"], 6);
}

#[tokio::test]
async fn resize_with_old_microversion_is_not_acceptable() {
    let t = setup(SimulatedConfig::default(), |_| {});
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.6", serde_json::json!({"node_count": 6})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn resize_unknown_cluster_is_not_found() {
    let t = setup(SimulatedConfig::default(), |_| {});
    let resp = t
        .router
        .clone()
        .oneshot(resize_request("missing", "1.7", serde_json::json!({"node_count": 1})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resize_without_node_count_is_rejected() {
    let t = setup(SimulatedConfig::default(), |_| {});
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"rollback": true})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn concurrent_resize_conflicts() {
    let t = setup(
        SimulatedConfig {
            delay: Duration::from_secs(30),
            ..SimulatedConfig::default()
        },
        |_| {},
    );

    let first = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 5})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let body = get_cluster(&t.router, &t.cluster.id).await;
    assert_eq!(body["status"], "update_in_progress");
    assert_eq!(body["operation_in_flight"], true);

    let second = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 4})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error_kind"], "ConflictInProgress");
}

// ── Backend failures ───────────────────────────────────────────

#[tokio::test]
async fn failed_resize_with_rollback_returns_to_stable() {
    let t = setup(
        SimulatedConfig {
            fail_resizes: true,
            ..SimulatedConfig::default()
        },
        |_| {},
    );
    let body = serde_json::json!({"node_count": 5, "rollback": true});
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let settled = wait_settled(&t.router, &t.cluster.id).await;
    assert_eq!(settled["status"], "stable");
    assert_eq!(settled["node_count"], 3);
    assert!(settled["status_reason"].as_str().unwrap().starts_with("rolled back"));
}

#[tokio::test]
async fn failed_resize_without_rollback_blocks_further_resizes() {
    let t = setup(
        SimulatedConfig {
            fail_resizes: true,
            ..SimulatedConfig::default()
        },
        |_| {},
    );
    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 5})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let settled = wait_settled(&t.router, &t.cluster.id).await;
    assert_eq!(settled["status"], "error");
    assert_eq!(settled["node_count"], 3);

    let resp = t
        .router
        .clone()
        .oneshot(resize_request(&t.cluster.id, "1.7", serde_json::json!({"node_count": 4})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error_kind"], "InvalidState");
}

// ── Reads ──────────────────────────────────────────────────────

#[tokio::test]
async fn list_clusters() {
    let t = setup(SimulatedConfig::default(), |_| {});
    let req = Request::builder().uri("/v1/clusters").body(Body::empty()).unwrap();
    let resp = t.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("openstack-api-version").unwrap(),
        "container-infra 1.10"
    );
    let body = body_json(resp).await;
    assert_eq!(body[0]["uuid"], t.cluster.id.as_str());
    assert_eq!(body[0]["node_count"], 3);
    assert_eq!(body[0]["operation_in_flight"], false);
    assert_eq!(body[0]["nodegroups"].as_array().unwrap().len(), 2);
}
