use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tempfile::NamedTempFile;
use tokio::time::timeout;

#[derive(Default)]
struct Counters {
    tickets: AtomicUsize,
    redeemed: AtomicUsize,
}

/// Waiting room that admits everyone immediately.
async fn spawn_open_room() -> (String, Arc<Counters>) {
    let counters = Arc::new(Counters::default());

    let issue = {
        let counters = Arc::clone(&counters);
        move || async move {
            let n = counters.tickets.fetch_add(1, Ordering::SeqCst);
            Json(serde_json::json!({
                "id": format!("t-{}", n),
                "room": "main",
                "nonce": "n",
                "checkInAfter": 0,
                "status": "Processed",
                "token": format!("T{}", n)
            }))
        }
    };

    let redeem = {
        let counters = Arc::clone(&counters);
        move |headers: HeaderMap| async move {
            let has_cookie = headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("WAITING_ROOM=T"));
            if has_cookie {
                counters.redeemed.fetch_add(1, Ordering::SeqCst);
            }
            StatusCode::OK
        }
    };

    let router = Router::new()
        .route("/Ticket", post(issue))
        .route("/app", get(redeem))
        .fallback(|| async { "ok" });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            panic!("server error: {err}");
        }
    });

    (format!("http://{}", addr), counters)
}

fn config_file(host: &str, users: usize, iterations: u64) -> NamedTempFile {
    let content = format!(
        r#"
[target]
host = "{host}"
timeout_secs = 5

[session]
room = "main"
cookie_name = "WAITING_ROOM"
poll_url = "/Ticket"
refresh_url = "/Ticket/check-in"
redirect_path = "/app"

[timing]
think_time_min_ms = 1
think_time_max_ms = 2
failure_cooldown_ms = 1

[swarm]
users = {users}
spawn_interval_ms = 5
iterations = {iterations}
"#
    );

    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn swarm_command(config_path: &std::path::Path) -> tokio::process::Command {
    let mut command = tokio::process::Command::new(env!("CARGO_BIN_EXE_waitroom-swarm"));
    command
        .env("WAITROOM_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true);
    command
}

#[tokio::test]
async fn test_bounded_run_redeems_every_visit() {
    let (host, counters) = spawn_open_room().await;
    let config = config_file(&host, 2, 3);

    let result = timeout(Duration::from_secs(30), swarm_command(config.path()).output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command");

    assert!(result.status.success());
    assert_eq!(counters.tickets.load(Ordering::SeqCst), 6);
    assert_eq!(counters.redeemed.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        swarm_command(std::path::Path::new("/nonexistent/waitroom.toml")).output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_config_exits_with_error() {
    let config = config_file("http://127.0.0.1:9", 0, 1);

    let result = timeout(Duration::from_secs(5), swarm_command(config.path()).output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command");

    assert!(!result.status.success());
}
