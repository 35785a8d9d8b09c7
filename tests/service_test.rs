//! End-to-end tests for the demo-apps service
//!
//! Run with: cargo test --test service_test

#![allow(clippy::expect_used)] // Integration tests can use expect for clarity

use demo_apps::server::{build_router, shutdown_channel, AppState, DrainOutcome, ServerHandle};
use demo_apps::Config;
use serde_json::{json, Value};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Wait for server to be ready with retry logic
///
/// Retries connection up to max_retries times with exponential backoff.
async fn wait_for_server(port: u16, max_retries: u32) -> reqwest::Client {
    let client = reqwest::Client::new();
    let mut delay = Duration::from_millis(10);

    for attempt in 1..=max_retries {
        match client
            .get(format!("http://127.0.0.1:{}/health", port))
            .timeout(Duration::from_millis(200))
            .send()
            .await
        {
            Ok(_) => return client,
            Err(_) if attempt < max_retries => {
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_millis(200));
            }
            Err(e) => panic!("Server not ready after {} attempts: {}", max_retries, e),
        }
    }
    client
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("Failed to find a free port")
}

fn spawn_binary(envs: &[(&str, String)]) -> Child {
    spawn_binary_with_stdout(envs, Stdio::null())
}

fn spawn_binary_with_stdout(envs: &[(&str, String)], stdout: Stdio) -> Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_demo-apps"));
    cmd.env_remove("PORT")
        .env_remove("POD_NAME")
        .env_remove("POD_NAMESPACE")
        .env_remove("NODE_ENV")
        .env_remove("SHUTDOWN_TIMEOUT_SECS")
        .env("NO_COLOR", "1")
        .stdout(stdout)
        .stderr(Stdio::null());
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.spawn().expect("Failed to start demo-apps binary")
}

fn wait_for_exit(child: &mut Child, within: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + within;
    loop {
        if let Some(status) = child.try_wait().expect("Failed to poll child") {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("demo-apps did not exit within {:?}", within);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// POD_NAME=pod-a, POD_NAMESPACE=ns-a on port 4000
#[tokio::test]
async fn test_info_end_to_end() {
    let config = Config::from_lookup(|key| match key {
        "PORT" => Some("4000".to_string()),
        "POD_NAME" => Some("pod-a".to_string()),
        "POD_NAMESPACE" => Some("ns-a".to_string()),
        _ => None,
    })
    .expect("Valid configuration");
    assert_eq!(config.port, 4000);

    let server = ServerHandle::bind(config.port)
        .await
        .expect("Port 4000 should be free");
    let (controller, signal) = shutdown_channel();
    let drain_timeout = config.shutdown_timeout;
    let app = build_router(AppState::new(config, Instant::now()));
    let serve = tokio::spawn(server.serve(app, signal, drain_timeout));

    let client = wait_for_server(4000, 10).await;
    let body: Value = client
        .get("http://127.0.0.1:4000/info")
        .send()
        .await
        .expect("Failed to reach /info")
        .json()
        .await
        .expect("Invalid JSON");

    assert_eq!(
        body,
        json!({
            "app": "demo-apps",
            "version": "v1.0.0",
            "nodeEnv": "development",
            "pod": "pod-a",
            "namespace": "ns-a"
        })
    );

    controller.shutdown();
    let outcome = serve.await.expect("Server task panicked").expect("Serve failed");
    assert_eq!(outcome, DrainOutcome::Completed);
}

#[cfg(unix)]
#[tokio::test]
async fn test_binary_exits_zero_after_sigterm() {
    let port = free_port();
    let mut child = spawn_binary(&[
        ("PORT", port.to_string()),
        ("POD_NAME", "pod-b".to_string()),
    ]);

    let client = wait_for_server(port, 20).await;
    let body: Value = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .expect("Failed to reach /health")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(body["pod"], "pod-b");
    assert_eq!(body["namespace"], "unknown");

    send_sigterm(&child);

    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0), "Graceful shutdown should exit 0");
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    let killed = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(killed.success());
}

/// A second SIGTERM during the drain is ignored; the held request still
/// completes and the process still exits 0.
#[cfg(unix)]
#[tokio::test]
async fn test_repeated_sigterm_while_draining_is_ignored() {
    use std::io::Read;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let port = free_port();
    let mut child = spawn_binary_with_stdout(
        &[
            ("PORT", port.to_string()),
            ("SHUTDOWN_TIMEOUT_SECS", "10".to_string()),
        ],
        Stdio::piped(),
    );
    drop(wait_for_server(port, 20).await);

    // A half-sent request keeps the connection busy so the drain has to wait
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("Failed to connect");
    stream
        .write_all(b"GET /ready HTTP/1.1\r\n")
        .await
        .expect("Failed to write request line");
    tokio::time::sleep(Duration::from_millis(200)).await;

    send_sigterm(&child);
    tokio::time::sleep(Duration::from_millis(200)).await;
    send_sigterm(&child);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(
        child.try_wait().expect("Failed to poll child").is_none(),
        "Process should still be draining the held request"
    );

    stream
        .write_all(b"Host: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("Failed to finish request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("Failed to read response");
    assert!(response.starts_with("HTTP/1.1 200"), "got {response:?}");
    assert!(response.ends_with(r#"{"status":"ready"}"#));

    let status = wait_for_exit(&mut child, Duration::from_secs(10));
    assert_eq!(status.code(), Some(0), "Repeated SIGTERM should still exit 0");

    let mut logs = String::new();
    child
        .stdout
        .take()
        .expect("stdout is piped")
        .read_to_string(&mut logs)
        .expect("Failed to read logs");
    assert!(
        logs.contains("Signal received while already draining, ignoring"),
        "logs: {logs}"
    );
}

#[test]
fn test_binary_exits_non_zero_when_port_in_use() {
    let taken = std::net::TcpListener::bind("0.0.0.0:0").expect("Failed to reserve a port");
    let port = taken.local_addr().expect("No local addr").port();

    let mut child = spawn_binary(&[("PORT", port.to_string())]);
    let status = wait_for_exit(&mut child, Duration::from_secs(10));

    assert!(!status.success(), "Bind failure should exit non-zero");
}

#[test]
fn test_binary_exits_non_zero_on_invalid_port() {
    let mut child = spawn_binary(&[("PORT", "not-a-port".to_string())]);
    let status = wait_for_exit(&mut child, Duration::from_secs(10));

    assert!(!status.success(), "Invalid PORT should exit non-zero");
}
