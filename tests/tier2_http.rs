//! HTTP-surface integration tests for the Tier-2 cluster adapter.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use clap::Parser;
use cloudlet_mesh::cluster::InMemoryCluster;
use cloudlet_mesh::config::Tier2Args;
use cloudlet_mesh::tier2::{server, Tier2State};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn bootstrapped_state(trace_server: &MockServer) -> Arc<Tier2State> {
    Mock::given(method("GET"))
        .and(path("/zone-a.csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("timestamp,carbon_intensity_avg\n0,100.0\n3600,200.0\n"),
        )
        .mount(trace_server)
        .await;

    let args = Tier2Args::parse_from([
        "tier2",
        "--tier2-url",
        "http://tier2.local",
        "--tier2-latitude",
        "40.0",
        "--tier2-longitude",
        "-79.0",
        "--tier2-zone",
        "zone-a",
        "--trace-github-repo-url",
        &trace_server.uri(),
    ]);
    Arc::new(Tier2State::bootstrap(&args).await.unwrap())
}

async fn bootstrapped_state_with_cluster(
    trace_server: &MockServer,
    cluster: InMemoryCluster,
) -> Arc<Tier2State> {
    Mock::given(method("GET"))
        .and(path("/zone-a.csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("timestamp,carbon_intensity_avg\n0,100.0\n3600,200.0\n"),
        )
        .mount(trace_server)
        .await;

    let args = Tier2Args::parse_from([
        "tier2",
        "--tier2-url",
        "http://tier2.local",
        "--tier2-latitude",
        "40.0",
        "--tier2-longitude",
        "-79.0",
        "--tier2-zone",
        "zone-a",
        "--trace-github-repo-url",
        &trace_server.uri(),
    ]);
    let mut state = Tier2State::bootstrap(&args).await.unwrap();
    state.cluster = Box::new(cluster);
    Arc::new(state)
}

#[tokio::test]
async fn livez_and_readyz_are_always_ok() {
    let trace_server = MockServer::start().await;
    let state = bootstrapped_state(&trace_server).await;
    let app = server::router(state);

    for path in ["/api/v1/livez", "/api/v1/readyz"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn carbon_before_timestamp_set_is_bad_request() {
    let trace_server = MockServer::start().await;
    let state = bootstrapped_state(&trace_server).await;
    let app = server::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/carbon")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn set_timestamp_then_carbon_report_succeeds() {
    let trace_server = MockServer::start().await;
    let state = bootstrapped_state(&trace_server).await;
    let app = server::router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/carbon-trace-timestamp?carbon_trace_timestamp=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/carbon")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["carbon_intensity_gco2_kwh"], 100.0);
}

#[tokio::test]
async fn deploy_lifecycle_create_get_delete() {
    let trace_server = MockServer::start().await;
    let state = bootstrapped_state(&trace_server).await;
    let app = server::router(state);

    let recipe_uuid = uuid::Uuid::new_v4();
    let create = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/deploy/{recipe_uuid}/app-key"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::OK);

    let get = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/deploy/{recipe_uuid}/app-key"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::OK);

    let delete = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/deploy/{recipe_uuid}/app-key"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn deploy_installer_timeout_is_bad_request() {
    let trace_server = MockServer::start().await;
    let installer = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(10)))
        .mount(&installer)
        .await;

    let cluster = InMemoryCluster::new(0.0).with_chart_install_url(installer.uri());
    let state = bootstrapped_state_with_cluster(&trace_server, cluster).await;
    let app = server::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/deploy/{}/app-key", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deploy_installer_failure_is_internal_error() {
    let trace_server = MockServer::start().await;
    let installer = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&installer)
        .await;

    let cluster = InMemoryCluster::new(0.0).with_chart_install_url(installer.uri());
    let state = bootstrapped_state_with_cluster(&trace_server, cluster).await;
    let app = server::router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/deploy/{}/app-key", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
