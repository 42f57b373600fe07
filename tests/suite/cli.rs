//! Runs the `sortcam` binary against a mock backend.

use std::fmt::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{CLASSIFY_PATH, grab_line, write_frame_png};

fn sortcam(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sortcam"));
    cmd.env("HOME", home)
        .env_remove("SORTCAM_BACKEND_URL")
        .env_remove("SORTCAM_LOCAL_API_URL")
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn write_config(home: &Path, endpoint: &str) {
    let dir = home.join(".sortcam");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!("[backend]\nendpoint = \"{endpoint}\"\n"),
    )
    .unwrap();
}

#[tokio::test]
async fn replayed_grab_prints_countdown_and_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CLASSIFY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "material": [{ "part_name": "bottle", "answer": "E" }] }))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &format!("{}{CLASSIFY_PATH}", server.uri()));
    let frame = write_frame_png(home.path());

    // Dwell plus three countdown ticks is about four seconds.
    let mut landmarks = String::from("# grab held for 4.8s\n");
    for t_ms in (0..4800).step_by(33) {
        writeln!(landmarks, "{}", grab_line(t_ms)).unwrap();
    }

    let mut child = sortcam(home.path())
        .arg(&frame)
        .stdin(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(landmarks.as_bytes()).await.unwrap();
    drop(stdin);

    let output = tokio::time::timeout(Duration::from_secs(30), child.wait_with_output())
        .await
        .expect("sortcam did not exit")
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout:\n{stdout}");

    let lines: Vec<&str> = stdout.lines().collect();
    let position = |needle: &str| {
        lines
            .iter()
            .position(|line| *line == needle)
            .unwrap_or_else(|| panic!("missing line {needle:?} in:\n{stdout}"))
    };
    assert!(position("Hold steady...") < position("3..."));
    assert!(position("3...") < position("2..."));
    assert!(position("2...") < position("1..."));
    assert!(position("1...") < position("Analyzing..."));
    assert!(position("Analyzing...") < position("bottle: E: Plastic"));

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert!(home.path().join(".sortcam/logs/sortcam.log").exists());
}

#[tokio::test]
async fn missing_frame_argument_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let output = sortcam(home.path()).output().await.unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: sortcam"), "stderr:\n{stderr}");
}

#[tokio::test]
async fn unreadable_frame_image_fails_before_replay() {
    let home = tempfile::tempdir().unwrap();
    let output = sortcam(home.path())
        .arg(home.path().join("missing.png"))
        .stdin(Stdio::null())
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open frame image"), "stderr:\n{stderr}");
}
