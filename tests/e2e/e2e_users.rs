use std::io::Write;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use sonic_rs::{JsonValueTrait, Value, json};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::time::sleep;
use user_restapi::{CallerConfig, CreatedUser, RestErrorKind, UserCreationCaller};

#[derive(Clone, Default)]
struct AppState {
    next_id: Arc<AtomicI64>,
    seen: Arc<Mutex<Vec<(Option<String>, Bytes)>>>,
}

#[tokio::test]
async fn e2e_create_user_roundtrip() {
    let server = TestServer::start().await;
    let caller = UserCreationCaller::new(server.config("/api/users"));

    let mut out = Vec::new();
    let created = caller.run(&mut out).await.expect("201 should parse");

    assert_eq!(created, json!({"id": 1, "name": "John Doe"}));
    let printed: Value =
        sonic_rs::from_slice(out.trim_ascii_end()).expect("printed line should be json");
    assert_eq!(printed, created);

    let seen = server.state.seen.lock().expect("seen lock").clone();
    assert_eq!(seen.len(), 1);
    let (content_type, body) = &seen[0];
    assert_eq!(content_type.as_deref(), Some("application/json"));
    let sent: Value = sonic_rs::from_slice(body).expect("request body should be json");
    assert_eq!(sent, json!({"name": "John Doe"}));
}

#[tokio::test]
async fn e2e_unreachable_server_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let config = CallerConfig::default().with_base_url(format!("http://{addr}"));
    let err = UserCreationCaller::new(config)
        .create_user()
        .await
        .expect_err("nothing listens on the port");

    assert!(err.is_network());
    assert_eq!(err.kind(), RestErrorKind::Connect);
}

#[tokio::test]
async fn e2e_non_json_body_is_a_decode_error() {
    let server = TestServer::start().await;
    let caller = UserCreationCaller::new(server.config("/api/users/html"));

    let mut out = Vec::new();
    let err = caller.run(&mut out).await.expect_err("html is not json");

    assert!(err.is_decode());
    assert!(out.is_empty());
}

#[tokio::test]
async fn e2e_server_error_is_a_status_error() {
    let server = TestServer::start().await;
    let caller = UserCreationCaller::new(server.config("/api/users/broken"));

    let err = caller.create_user().await.expect_err("500 must fail");

    assert!(err.is_status());
    assert_eq!(err.status(), Some(500));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn e2e_configured_timeout_triggers() {
    let server = TestServer::start().await;
    let mut config = server.config("/api/users/slow");
    config.timeout_ms = Some(200);

    let err = UserCreationCaller::new(config)
        .create_user()
        .await
        .expect_err("slow handler should exceed the timeout");

    assert_eq!(err.kind(), RestErrorKind::Timeout);
}

#[tokio::test]
async fn e2e_binary_stdout_is_exactly_one_json_line() {
    let server = TestServer::start().await;
    let config_file = write_config(&server.base_url);

    let output = Command::new(env!("CARGO_BIN_EXE_create-user"))
        .env(user_restapi::CONFIG_ENV, config_file.path())
        .env("RUST_LOG", "info")
        .output()
        .await
        .expect("spawn create-user");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout is utf-8");
    assert_eq!(stdout.lines().count(), 1, "stdout was: {stdout:?}");
    let printed: Value = sonic_rs::from_str(stdout.trim_end()).expect("stdout is json");
    assert_eq!(printed, json!({"id": 1, "name": "John Doe"}));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("creating user"), "stderr was: {stderr:?}");
}

#[tokio::test]
async fn e2e_binary_failure_keeps_stdout_empty() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    let config_file = write_config(&format!("http://{addr}"));

    let output = Command::new(env!("CARGO_BIN_EXE_create-user"))
        .env(user_restapi::CONFIG_ENV, config_file.path())
        .env("RUST_LOG", "info")
        .output()
        .await
        .expect("spawn create-user");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "stdout was: {:?}", String::from_utf8_lossy(&output.stdout));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR"));
}

fn write_config(base_url: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp config file");
    writeln!(file, "base_url = \"{base_url}\"").expect("write temp config");
    file
}

struct TestServer {
    base_url: String,
    state: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState::default();
        let app = Router::new()
            .route("/api/users", post(create_handler))
            .route("/api/users/html", post(html_handler))
            .route("/api/users/broken", post(broken_handler))
            .route("/api/users/slow", post(slow_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url,
            state,
            task,
        }
    }

    fn config(&self, users_path: &str) -> CallerConfig {
        CallerConfig {
            users_path: users_path.to_string(),
            ..CallerConfig::default().with_base_url(self.base_url.clone())
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state
        .seen
        .lock()
        .expect("seen lock")
        .push((content_type, body.clone()));

    let name = sonic_rs::from_slice::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("name")
                .and_then(|name| name.as_str().map(str::to_string))
        })
        .unwrap_or_default();
    let id = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let reply = sonic_rs::to_string(&CreatedUser { id, name }).expect("encode reply");

    (
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/json")],
        reply,
    )
}

async fn html_handler() -> (StatusCode, &'static str) {
    (StatusCode::CREATED, "<html>created</html>")
}

async fn broken_handler() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn slow_handler() -> (StatusCode, &'static str) {
    sleep(Duration::from_millis(2000)).await;
    (StatusCode::CREATED, r#"{"id":1,"name":"John Doe"}"#)
}
