//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use sortcam_engine::{
    BackendTarget, Dispatcher, EngineHandle, EngineOptions, FrameSize, Landmark, LandmarkFrame,
    Observation, PhaseTag, SessionSnapshot, SessionTiming, StillImageSource, spawn_engine,
};
use sortcam_providers::{ClassifierEndpoints, ClientTimeouts, http_client, parse_http_url};
use sortcam_types::{
    HAND_LANDMARK_COUNT, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, PINKY_PIP, PINKY_TIP,
    RING_PIP, RING_TIP, THUMB_IP, THUMB_TIP,
};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLASSIFY_PATH: &str = "/api/classify";
pub const RELAY_PATH: &str = "/api/classify/local";

/// Frame interval used when feeding observations.
pub const FRAME: Duration = Duration::from_millis(10);

/// Compressed timing so a full cycle takes well under a second.
pub fn fast_timing() -> SessionTiming {
    SessionTiming {
        dwell: Duration::from_millis(100),
        countdown_from: 3,
        tick: Duration::from_millis(50),
    }
}

/// Mount a 200 response carrying the given `material` entries.
pub async fn mount_material(server: &MockServer, material: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "material": material
        })))
        .mount(server)
        .await;
}

/// Mount an error response on the hosted route.
pub async fn mount_error(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub fn endpoints_for(server: &MockServer) -> ClassifierEndpoints {
    ClassifierEndpoints::new(
        parse_http_url(&format!("{}{CLASSIFY_PATH}", server.uri())).unwrap(),
        parse_http_url(&format!("{}{RELAY_PATH}", server.uri())).unwrap(),
    )
}

pub fn camera() -> Arc<StillImageSource> {
    Arc::new(StillImageSource::from_image(RgbaImage::from_pixel(
        64,
        48,
        Rgba([90, 140, 60, 255]),
    )))
}

/// Engine wired to a real HTTP dispatcher pointed at `server`.
pub fn engine_for(server: &MockServer) -> (EngineHandle, JoinHandle<()>) {
    let client = http_client(ClientTimeouts::default()).unwrap();
    let dispatcher = Dispatcher::new(client, endpoints_for(server));
    spawn_engine(
        EngineOptions {
            target: BackendTarget::Hosted,
            fallback_frame: FrameSize::new(1280, 720),
            timing: fast_timing(),
        },
        camera(),
        Arc::new(dispatcher),
    )
}

/// Thumb tucked against its joint; index, middle and ring curled.
pub fn grab_frame() -> LandmarkFrame {
    hand_frame(0.02, true)
}

/// Fingers extended, thumb out.
pub fn open_frame() -> LandmarkFrame {
    hand_frame(0.3, false)
}

fn hand_frame(thumb_distance: f32, curled: bool) -> LandmarkFrame {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.0); HAND_LANDMARK_COUNT];
    points[THUMB_IP] = Landmark::new(0.0, 0.6, 0.0);
    points[THUMB_TIP] = Landmark::new(thumb_distance, 0.55, 0.0);
    for (tip, joint) in [
        (INDEX_TIP, INDEX_PIP),
        (MIDDLE_TIP, MIDDLE_PIP),
        (RING_TIP, RING_PIP),
        (PINKY_TIP, PINKY_PIP),
    ] {
        points[joint] = Landmark::new(0.5, 0.5, 0.0);
        let closed = curled && tip != PINKY_TIP;
        points[tip] = Landmark::new(0.5, if closed { 0.6 } else { 0.3 }, 0.0);
    }
    LandmarkFrame::new(points)
}

/// Feed `frame` every [`FRAME`] for `duration`.
pub async fn hold(handle: &EngineHandle, frame: Option<&LandmarkFrame>, duration: Duration) {
    let deadline = tokio::time::Instant::now() + duration;
    while tokio::time::Instant::now() < deadline {
        let observation = match frame {
            Some(frame) => Observation::with_hand(Instant::now(), frame.clone()),
            None => Observation::no_hand(Instant::now()),
        };
        handle.observe(observation).await.unwrap();
        tokio::time::sleep(FRAME).await;
    }
}

/// Wait up to five seconds for `phase`.
pub async fn wait_for_phase(handle: &EngineHandle, phase: PhaseTag) -> SessionSnapshot {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.phase == phase))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {phase:?}"))
        .unwrap()
        .clone()
}

/// Write a small PNG usable as the CLI's camera frame.
pub fn write_frame_png(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("frame.png");
    RgbaImage::from_pixel(32, 24, Rgba([200, 200, 200, 255]))
        .save(&path)
        .unwrap();
    path
}

/// One JSON line holding a single grabbing hand at `t_ms`.
pub fn grab_line(t_ms: u64) -> String {
    serde_json::json!({ "t_ms": t_ms, "hands": [grab_frame()] }).to_string()
}
