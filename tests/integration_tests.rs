use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use request_logger::{config::AppConfig, create_app, AppState, Logger};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn records(&self) -> Vec<Value> {
        let raw = String::from_utf8(self.0.lock().unwrap().clone()).unwrap();
        raw.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

async fn spawn_server(yaml: &str) -> (String, Capture) {
    let out = Capture::default();
    let config = AppConfig::from_yaml_str(yaml).unwrap();
    let logger = Logger::stdout()
        .output(out.clone())
        .configure(&config.logging.app_name, config.logging.debug);
    let app = create_app(AppState {
        config: Arc::new(config),
        logger,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (format!("http://{}", addr), out)
}

// Records are written once the server has streamed the last body frame,
// which can trail the client's read by a moment.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_inbound_correlation_id_is_logged() {
    let (base_url, out) = spawn_server("logging:\n  app_name: it-suite\n").await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/v1/whoami", base_url))
        .header("X-Correlation-ID", "123")
        .header("User-Agent", "it-suite/1.0")
        .header("Referer", "http://example.test/")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["correlation_id"], "123");
    settle().await;

    let records = out.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["@source"], "it-suite");
    assert_eq!(record["@level"], "info");
    assert_eq!(record["correlation_id"], "123");
    assert_eq!(record["@fields"]["status"], 200);
    assert_eq!(record["@fields"]["request_method"], "GET");
    assert_eq!(record["@fields"]["request"], "/api/v1/whoami");
    assert_eq!(record["@fields"]["http_user_agent"], "it-suite/1.0");
    assert_eq!(record["@fields"]["http_referrer"], "http://example.test/");
    assert_eq!(record["@fields"]["body_bytes_sent"], r#"{"correlation_id":"123"}"#.len());
    assert!(record["@fields"]["remote_addr"]
        .as_str()
        .unwrap()
        .starts_with("127.0.0.1:"));
    assert!(record["@fields"]["request_time"].is_f64());
}

#[tokio::test]
async fn test_missing_correlation_id_is_minted() {
    let (base_url, out) = spawn_server("{}").await;

    let resp = reqwest::get(format!("{}/api/v1/whoami", base_url))
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let minted = body["correlation_id"].as_str().unwrap().to_string();
    assert!(!minted.is_empty());
    settle().await;

    let records = out.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["correlation_id"], minted.as_str());
}

#[tokio::test]
async fn test_debug_flag_surfaces_handler_records() {
    let (base_url, out) = spawn_server("logging:\n  debug: true\n").await;

    reqwest::get(format!("{}/api/v1/whoami", base_url))
        .await
        .unwrap();
    settle().await;

    let records = out.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["@level"], "debug");
    assert_eq!(records[0]["@message"], "whoami requested");
    assert_eq!(records[0]["correlation_id"], records[1]["correlation_id"]);
}

#[tokio::test]
async fn test_health_endpoint_is_excluded() {
    let (base_url, out) = spawn_server("{}").await;

    let resp = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "request-logger");
    settle().await;

    assert!(out.records().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_logged_as_not_found() {
    let (base_url, out) = spawn_server("{}").await;

    let resp = reqwest::get(format!("{}/nope", base_url)).await.unwrap();
    assert_eq!(resp.status(), 404);
    settle().await;

    let records = out.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["@fields"]["status"], 404);
    assert_eq!(records[0]["@fields"]["body_bytes_sent"], 0);
}
