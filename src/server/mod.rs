// src/server/mod.rs
// =============================================================================
// The HTTP surface.
//
//   POST /bulk/run?country=CC   start a bulk job        -> {jobId, mode}
//   GET  /bulk/status/{id}      job snapshot            -> 200 | 404
//   GET  /bulk/stream/{id}      live events (SSE)       -> 200 | 404
//   POST /audit {url}           audit one page now      -> AuditResult
//   GET  /audit?url=...         same, for quick manual use
//   GET  /healthz               liveness
// =============================================================================

mod handlers;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::audit::HttpRenderer;
use crate::config::ServiceConfig;
use crate::jobs::{HttpListLoader, JobDeps, JobManager};
use crate::report::{HttpNotifier, HttpReportSink, Notifier};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobManager,
    pub heartbeat: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/bulk/run", post(handlers::run_bulk))
        .route("/bulk/status/:id", get(handlers::bulk_status))
        .route("/bulk/stream/:id", get(handlers::bulk_stream))
        .route("/audit", get(handlers::audit_get).post(handlers::audit_post))
        .with_state(state)
}

// Wires the HTTP-backed collaborators into a JobManager and serves until
// the process is stopped
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let notifier = match &config.notify_endpoint {
        Some(endpoint) => Some(Arc::new(HttpNotifier::new(endpoint)?) as Arc<dyn Notifier>),
        None => None,
    };

    let jobs = JobManager::new(JobDeps {
        renderer: Arc::new(HttpRenderer::new()?),
        lists: Arc::new(HttpListLoader::new(&config.list_base_url)?),
        reports: Arc::new(HttpReportSink::new(&config.report_endpoint)?),
        notifier,
        settings: config.audit.clone(),
    });

    let app = build_router(AppState {
        jobs,
        heartbeat: config.heartbeat,
    });

    let addr: SocketAddr = config
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "migration-bob listening");

    axum::serve(listener, app).await.context("server shutdown")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Navigation, PageRenderer, RenderedPage};
    use crate::config::AuditSettings;
    use crate::jobs::ListLoader;
    use crate::report::{Report, ReportSink};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use url::Url;

    struct BlankRenderer;

    #[async_trait]
    impl PageRenderer for BlankRenderer {
        async fn render(&self, url: &Url, _timeout: Duration) -> Result<Navigation> {
            Ok(Navigation::Loaded(RenderedPage {
                status: 200,
                final_url: url.clone(),
                html: "<html><head><title>Blank but titled</title></head><body><h1>x</h1></body></html>".into(),
                evaluated: Vec::new(),
            }))
        }
    }

    struct OneList;

    #[async_trait]
    impl ListLoader for OneList {
        async fn fetch(&self, path: &str) -> Result<String> {
            if path == "CZ/seznam.txt" {
                Ok("https://a.test/one\nhttps://a.test/two\n".into())
            } else {
                Err(anyhow!("HTTP 404"))
            }
        }
    }

    struct NullSink;

    #[async_trait]
    impl ReportSink for NullSink {
        async fn submit(&self, report: &Report) -> Result<String> {
            Ok(format!("https://reports.test/{}", report.filename))
        }
    }

    // Takes its time before answering, like a slow list host
    struct SlowList(Duration);

    #[async_trait]
    impl ListLoader for SlowList {
        async fn fetch(&self, path: &str) -> Result<String> {
            tokio::time::sleep(self.0).await;
            OneList.fetch(path).await
        }
    }

    async fn spawn_app() -> String {
        spawn_app_with(Arc::new(OneList), Duration::from_secs(10)).await
    }

    async fn spawn_app_with(lists: Arc<dyn ListLoader>, heartbeat: Duration) -> String {
        let jobs = JobManager::new(JobDeps {
            renderer: Arc::new(BlankRenderer),
            lists,
            reports: Arc::new(NullSink),
            notifier: None,
            settings: AuditSettings::default(),
        });
        let app = build_router(AppState { jobs, heartbeat });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    async fn wait_until_finished(client: &reqwest::Client, base: &str, id: &str) -> Value {
        for _ in 0..100 {
            let snap: Value = client
                .get(format!("{base}/bulk/status/{id}"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if snap["status"] == "DONE" || snap["status"] == "ERROR" {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test]
    async fn test_healthz() {
        let base = spawn_app().await;
        let body: Value = reqwest::get(format!("{base}/healthz")).await.unwrap().json().await.unwrap();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_run_requires_country() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client.post(format!("{base}/bulk/run")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "missing_country");

        let resp = client.post(format!("{base}/bulk/run?country=%20")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();
        let id = uuid::Uuid::new_v4();

        for path in [format!("/bulk/status/{id}"), format!("/bulk/stream/{id}"), "/bulk/status/nope".to_string()] {
            let resp = client.get(format!("{base}{path}")).send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["error"], "not_found");
        }
    }

    #[tokio::test]
    async fn test_run_then_poll_status() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client.post(format!("{base}/bulk/run?country=cz")).send().await.unwrap();
        assert!(resp.status().is_success());
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["mode"], "bulk");
        let id = body["jobId"].as_str().unwrap().to_string();

        let first = wait_until_finished(&client, &base, &id).await;
        assert_eq!(first["status"], "DONE");
        assert_eq!(first["total"], 2);
        assert_eq!(first["done"], 2);
        assert!(first["outputUrl"].as_str().unwrap().contains("BobAudit-CZ-"));

        let again: Value = client
            .get(format!("{base}/bulk/status/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_stream_after_done_closes_immediately() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{base}/bulk/run?country=cz"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = body["jobId"].as_str().unwrap().to_string();
        wait_until_finished(&client, &base, &id).await;

        let resp = client.get(format!("{base}/bulk/stream/{id}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/event-stream"));

        let text = tokio::time::timeout(Duration::from_secs(5), resp.text())
            .await
            .expect("stream should end on its own")
            .unwrap();
        assert!(text.starts_with(": connected"));
        assert!(!text.contains("event:"));
    }

    async fn start_job(client: &reqwest::Client, base: &str) -> String {
        let body: Value = client
            .post(format!("{base}/bulk/run?country=cz"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["jobId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_stream_sends_heartbeats_while_job_is_quiet() {
        let base = spawn_app_with(
            Arc::new(SlowList(Duration::from_millis(800))),
            Duration::from_millis(100),
        )
        .await;
        let client = reqwest::Client::new();
        let id = start_job(&client, &base).await;

        let resp = client.get(format!("{base}/bulk/stream/{id}")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = tokio::time::timeout(Duration::from_secs(10), resp.text())
            .await
            .expect("stream should end after done")
            .unwrap();

        let heartbeat = text.find(": heartbeat").expect("no heartbeat frame");
        let start = text.find("event: start").expect("no start event");
        assert!(text.starts_with(": connected"));
        assert!(heartbeat < start);
        assert!(text.contains("event: done"));
    }

    #[tokio::test]
    async fn test_job_survives_subscriber_leaving() {
        let base = spawn_app_with(
            Arc::new(SlowList(Duration::from_millis(300))),
            Duration::from_secs(10),
        )
        .await;
        let client = reqwest::Client::new();
        let id = start_job(&client, &base).await;

        let mut resp = client.get(format!("{base}/bulk/stream/{id}")).send().await.unwrap();
        let first = resp.chunk().await.unwrap().expect("initial frame");
        assert!(String::from_utf8_lossy(&first).starts_with(": connected"));
        drop(resp);

        let snap = wait_until_finished(&client, &base, &id).await;
        assert_eq!(snap["status"], "DONE");
        assert_eq!(snap["done"], 2);
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{base}/bulk/run?country=de"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = body["jobId"].as_str().unwrap().to_string();

        let snap = wait_until_finished(&client, &base, &id).await;
        assert_eq!(snap["status"], "ERROR");
        assert!(snap["error"].as_str().unwrap().contains("DE/seznam.txt"));
        assert!(snap["outputUrl"].is_null());
    }

    #[tokio::test]
    async fn test_audit_requires_url() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client.post(format!("{base}/audit")).json(&json!({})).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Missing url");

        let resp = client.post(format!("{base}/audit")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Missing url");

        let resp = client
            .post(format!("{base}/audit"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = client.get(format!("{base}/audit")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_audit_single_page() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/audit"))
            .json(&json!({"url": "https://a.test/page"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["url"], "https://a.test/page");
        assert_eq!(body["checks"][0]["name"], "Page loads");
        assert_eq!(body["allOk"], false);

        let resp = client
            .get(format!("{base}/audit?url=https://a.test/page"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
