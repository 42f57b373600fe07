//! End-to-end capture cycles against a mock classification backend.

use std::time::Duration;

use serde_json::json;
use sortcam_engine::{MaterialCode, PhaseTag};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    CLASSIFY_PATH, RELAY_PATH, engine_for, grab_frame, hold, mount_error, mount_material,
    open_frame, wait_for_phase,
};

#[tokio::test]
async fn plastic_bottle_reaches_result() {
    let server = MockServer::start().await;
    mount_material(
        &server,
        json!([
            { "part_name": "bottle", "answer": "E: Plastic" },
            { "part_name": "cap", "answer": "C" }
        ]),
    )
    .await;
    let (engine, _join) = engine_for(&server);

    let grab = grab_frame();
    let feeder = {
        let engine = engine.clone();
        tokio::spawn(async move { hold(&engine, Some(&grab), Duration::from_millis(600)).await })
    };

    let snapshot = wait_for_phase(&engine, PhaseTag::ResultReady).await;
    feeder.await.unwrap();

    let result = snapshot.result.expect("result published with ResultReady");
    let entries = result.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].part_name, "bottle");
    assert_eq!(entries[0].code, MaterialCode::Plastic);
    assert_eq!(entries[1].code, MaterialCode::Metal);
    assert!(snapshot.failure.is_none());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let image = body["imageBase64"].as_str().unwrap();
    assert!(!image.starts_with("data:"));
    assert!(body.get("apiUrl").is_none());

    engine.reset().await.unwrap();
    wait_for_phase(&engine, PhaseTag::Idle).await;
}

#[tokio::test]
async fn short_hold_never_captures() {
    let server = MockServer::start().await;
    mount_material(&server, json!([{ "part_name": "can", "answer": "C" }])).await;
    let (engine, _join) = engine_for(&server);

    hold(&engine, Some(&grab_frame()), Duration::from_millis(60)).await;
    hold(&engine, Some(&open_frame()), Duration::from_millis(400)).await;

    assert_eq!(engine.snapshot().phase, PhaseTag::Idle);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn backend_error_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    mount_error(
        &server,
        500,
        json!({ "error": "timeout", "details": "model took too long" }),
    )
    .await;
    let (engine, _join) = engine_for(&server);

    let grab = grab_frame();
    let feeder = {
        let engine = engine.clone();
        tokio::spawn(async move { hold(&engine, Some(&grab), Duration::from_millis(500)).await })
    };

    let snapshot = wait_for_phase(&engine, PhaseTag::Failed).await;
    feeder.await.unwrap();

    let failure = snapshot.failure.expect("failure published with Failed");
    assert_eq!(failure.message(), "timeout");
    assert_eq!(failure.details(), Some("model took too long"));
    assert!(snapshot.result.is_none());

    engine.reset().await.unwrap();
    assert_eq!(wait_for_phase(&engine, PhaseTag::Idle).await.failure, None);
}

#[tokio::test]
async fn held_grab_does_not_send_a_second_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "material": [{ "part_name": "box", "answer": "A" }] }))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (engine, _join) = engine_for(&server);

    hold(&engine, Some(&grab_frame()), Duration::from_millis(1200)).await;

    assert_eq!(engine.snapshot().phase, PhaseTag::ResultReady);
    server.verify().await;
}

#[tokio::test]
async fn local_backend_goes_through_relay() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RELAY_PATH))
        .and(body_partial_json(json!({ "apiUrl": "http://10.0.0.5:8000/infer" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "material": [{ "part_name": "none", "answer": "G" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (engine, _join) = engine_for(&server);

    engine
        .select_local("http://10.0.0.5:8000/infer")
        .await
        .unwrap();

    let grab = grab_frame();
    let feeder = {
        let engine = engine.clone();
        tokio::spawn(async move { hold(&engine, Some(&grab), Duration::from_millis(500)).await })
    };
    let snapshot = wait_for_phase(&engine, PhaseTag::ResultReady).await;
    feeder.await.unwrap();

    assert!(snapshot.result.unwrap().is_empty_scene());
    assert!(engine.backend().is_local());
    server.verify().await;
}

#[tokio::test]
async fn unreachable_backend_fails_the_cycle() {
    let server = MockServer::start().await;
    let (engine, _join) = engine_for(&server);
    drop(server);

    let grab = grab_frame();
    let feeder = {
        let engine = engine.clone();
        tokio::spawn(async move { hold(&engine, Some(&grab), Duration::from_millis(500)).await })
    };
    let snapshot = wait_for_phase(&engine, PhaseTag::Failed).await;
    feeder.await.unwrap();

    assert_eq!(
        snapshot.failure.unwrap().message(),
        "Network request failed"
    );
}
