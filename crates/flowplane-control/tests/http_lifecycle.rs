//! Lifecycle operations driven over HTTP against a stubbed control plane.

use flowplane_client::HttpTransport;
use flowplane_control::{ControlConfig, ControlError, FlowControl, FlowService, RunState};
use flowplane_core::{ComponentId, ResourceKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> ControlConfig {
    ControlConfig {
        poll_interval_ms: 10,
        transition_timeout_seconds: 2,
        ..ControlConfig::default()
    }
}

fn service_for(server: &MockServer) -> FlowService<HttpTransport> {
    let transport =
        HttpTransport::with_client(reqwest::Client::new(), format!("{}/nifi-api", server.uri()));
    FlowService::new(transport, fast_config())
}

fn processor(version: u64, state: &str) -> serde_json::Value {
    json!({
        "revision": {"version": version},
        "component": {
            "id": "p1",
            "parentGroupId": "root",
            "name": "GenerateFlowFile",
            "state": state
        }
    })
}

#[tokio::test]
async fn stop_processor_waits_for_reported_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nifi-api/processors/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(processor(3, "RUNNING")))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nifi-api/processors/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(processor(4, "STOPPED")))
        .with_priority(5)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/nifi-api/processors/p1"))
        .and(body_partial_json(json!({
            "revision": {"version": 3},
            "component": {"id": "p1", "state": "STOPPED"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(processor(4, "RUNNING")))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let id = ComponentId::parse("p1").unwrap();
    let stopped = service.stop_processor(&id).await.unwrap();

    assert_eq!(stopped.state(), Some(RunState::Stopped));
    assert_eq!(stopped.revision.version, 4);
}

#[tokio::test]
async fn stale_delete_surfaces_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nifi-api/processors/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(processor(3, "STOPPED")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/nifi-api/processors/p1"))
        .and(query_param("version", "3"))
        .respond_with(ResponseTemplate::new(409).set_body_string("p1 is not the most up-to-date revision"))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server);
    let id = ComponentId::parse("p1").unwrap();
    let mut entity = service
        .get::<flowplane_control::Processor>(ResourceKind::Processor, &id)
        .await
        .unwrap();

    let err = service.delete(&mut entity).await.unwrap_err();
    assert!(matches!(err, ControlError::Conflict { .. }));
    assert_eq!(err.http_status_code(), 409);
}

#[tokio::test]
async fn missing_component_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nifi-api/connections/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let id = ComponentId::parse("gone").unwrap();

    assert!(!service.exists(ResourceKind::Connection, &id).await.unwrap());
    assert!(service.get_connection(&id).await.unwrap_err().is_not_found());
}
