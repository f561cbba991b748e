// The retry budget is the contract under test here: a connect failure may
// trigger at most one probe-launch-retry cycle, and only when the feature
// is enabled and the app is not already running.
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use joplin_core::client::ApiClient;
use joplin_core::config::JoplinConfig;
use joplin_core::error::ConnectorError;
use joplin_core::launcher::AppLauncher;

struct FakeLauncher {
    running: bool,
    launch_ok: bool,
    serve_port_on_launch: Option<u16>,
    probes: AtomicU32,
    launches: AtomicU32,
}

impl FakeLauncher {
    fn new(running: bool, launch_ok: bool, serve_port_on_launch: Option<u16>) -> Arc<Self> {
        Arc::new(FakeLauncher {
            running,
            launch_ok,
            serve_port_on_launch,
            probes: AtomicU32::new(0),
            launches: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AppLauncher for FakeLauncher {
    async fn is_running(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.running
    }

    fn launch(&self) -> bool {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(port) = self.serve_port_on_launch {
            std::thread::spawn(move || serve_one_request(port));
        }
        self.launch_ok
    }
}

/// Serve a single canned 200 response on `port`, like an app whose API came
/// up after being launched.
fn serve_one_request(port: u16) {
    let listener = std::net::TcpListener::bind(("127.0.0.1", port)).expect("bind retry port");
    if let Ok((mut stream, _)) = listener.accept() {
        // Drain the request head; GET requests fit in one segment.
        let mut buf = [0u8; 4096];
        let mut seen = Vec::new();
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
        let body = r#"{"items":[],"has_more":false}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
    }
}

/// Bind and drop a listener to find a port nothing is listening on.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("reserve port")
        .local_addr()
        .expect("port addr")
        .port()
}

fn config_for(port: u16, auto_launch: bool) -> JoplinConfig {
    JoplinConfig {
        base_url: format!("http://127.0.0.1:{}", port),
        token: "test-token".to_string(),
        auto_launch,
    }
}

#[tokio::test]
async fn connect_failure_launches_once_and_retries_once() {
    let port = free_port();
    let launcher = FakeLauncher::new(false, true, Some(port));
    let client = ApiClient::with_launcher(config_for(port, true), launcher.clone());

    let result = client.request(Method::GET, "notes", None, &[]).await;

    let value = result.expect("retried request should succeed").unwrap();
    assert_eq!(value["has_more"], false);
    assert_eq!(launcher.probes.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_auto_launch_propagates_without_probing() {
    let port = free_port();
    let launcher = FakeLauncher::new(false, true, Some(port));
    let client = ApiClient::with_launcher(config_for(port, false), launcher.clone());

    let err = client
        .request(Method::GET, "notes", None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Connection(_)));
    assert_eq!(launcher.probes.load(Ordering::SeqCst), 0);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn already_running_app_is_not_relaunched() {
    let port = free_port();
    let launcher = FakeLauncher::new(true, true, None);
    let client = ApiClient::with_launcher(config_for(port, true), launcher.clone());

    let err = client
        .request(Method::GET, "notes", None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Connection(_)));
    assert_eq!(launcher.probes.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_launch_propagates_the_original_error() {
    let port = free_port();
    let launcher = FakeLauncher::new(false, false, None);
    let client = ApiClient::with_launcher(config_for(port, true), launcher.clone());

    let err = client
        .request(Method::GET, "notes", None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Connection(_)));
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_connect_failure_is_not_retried_again() {
    let port = free_port();
    // Launch "succeeds" but no API ever comes up.
    let launcher = FakeLauncher::new(false, true, None);
    let client = ApiClient::with_launcher(config_for(port, true), launcher.clone());

    let err = client
        .request(Method::GET, "notes", None, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Connection(_)));
    // One cycle only, however many times the connection keeps failing.
    assert_eq!(launcher.probes.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
}
