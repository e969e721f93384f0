// src/report/sink.rs
// =============================================================================
// Where finished reports and job summaries go.
//
// - ReportSink: stores a report and hands back a URL for it. Failure here is
//   fatal for the job.
// - Notifier: delivers a job summary out of band (the e-mail relay). The job
//   manager spawns it and never waits for it.
//
// Each has an HTTP implementation; reports can also go to a local directory
// for the offline `bulk` command.
// =============================================================================

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::Report;
use crate::audit::AuditResult;

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Stores the report and returns its public URL.
    async fn submit(&self, report: &Report) -> Result<String>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, summary: &JobSummary) -> Result<()>;
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    country: &'a str,
    filename: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    status: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// POSTs `{country, filename, content}` and expects `{status, url}` back.
#[derive(Debug, Clone)]
pub struct HttpReportSink {
    client: Client,
    endpoint: String,
}

impl HttpReportSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build report sink HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn submit(&self, report: &Report) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SubmitRequest {
                country: &report.country,
                filename: &report.filename,
                content: &report.content,
            })
            .send()
            .await
            .with_context(|| format!("failed to upload report to {}", self.endpoint))?;

        let http_status = response.status();
        let body: SubmitResponse = response
            .json()
            .await
            .with_context(|| format!("report upload returned HTTP {} without a JSON body", http_status))?;

        if !http_status.is_success() || !matches!(body.status.as_str(), "success" | "ok") {
            bail!(
                "report upload failed (HTTP {}, status {}): {}",
                http_status.as_u16(),
                body.status,
                body.message.unwrap_or_default()
            );
        }

        let url = body
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("report upload succeeded but returned no url"))?;

        info!(filename = %report.filename, %url, "report uploaded");
        Ok(url)
    }
}

/// Writes the report into a directory, or to one fixed file path.
#[derive(Debug, Clone)]
pub struct DirReportSink {
    dir: PathBuf,
    fixed_path: Option<PathBuf>,
}

impl DirReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fixed_path: None,
        }
    }

    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.fixed_path = path;
        self
    }
}

#[async_trait]
impl ReportSink for DirReportSink {
    async fn submit(&self, report: &Report) -> Result<String> {
        let path = match &self.fixed_path {
            Some(path) => path.clone(),
            None => self.dir.join(&report.filename),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create_dir_all {}", parent.display()))?;
        }
        tokio::fs::write(&path, &report.content)
            .await
            .with_context(|| format!("failed to write report {}", path.display()))?;

        Ok(path.display().to_string())
    }
}

/// What the notification relay receives for a finished job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub country: String,
    /// None when the job ended in error
    pub report_url: Option<String>,
    pub total: usize,
    pub ok: usize,
    pub nok: usize,
    pub pages: Vec<AuditResult>,
}

#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build notifier HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, summary: &JobSummary) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(summary)
            .send()
            .await
            .with_context(|| format!("failed to reach notifier {}", self.endpoint))?;

        if !response.status().is_success() {
            bail!("notifier returned HTTP {}", response.status().as_u16());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use time::macros::datetime;

    async fn spawn_sink(reply: Value) -> String {
        let app = Router::new().route(
            "/upload",
            post(move |Json(body): Json<Value>| {
                let reply = reply.clone();
                async move {
                    // Echo the filename back so tests can see the request arrived intact
                    let mut reply = reply;
                    if reply["url"] == "echo" {
                        reply["url"] = json!(format!("https://files.test/{}", body["filename"].as_str().unwrap()));
                    }
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/upload")
    }

    fn report() -> Report {
        aggregate("cz", &[], datetime!(2025-03-07 09:05 UTC)).unwrap()
    }

    #[tokio::test]
    async fn test_http_sink_returns_url() {
        let endpoint = spawn_sink(json!({"status": "success", "url": "echo"})).await;
        let sink = HttpReportSink::new(endpoint).unwrap();
        let url = sink.submit(&report()).await.unwrap();
        assert_eq!(url, "https://files.test/BobAudit-CZ-07-03-2025-09-05.json");
    }

    #[tokio::test]
    async fn test_http_sink_rejects_error_status() {
        let endpoint = spawn_sink(json!({"status": "error", "message": "disk full"})).await;
        let sink = HttpReportSink::new(endpoint).unwrap();
        let err = sink.submit(&report()).await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_http_sink_requires_url() {
        let endpoint = spawn_sink(json!({"status": "success"})).await;
        let sink = HttpReportSink::new(endpoint).unwrap();
        assert!(sink.submit(&report()).await.is_err());
    }

    #[tokio::test]
    async fn test_dir_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("migration-bob-{}", uuid::Uuid::new_v4()));
        let sink = DirReportSink::new(dir.join("audity"));
        let path = sink.submit(&report()).await.unwrap();

        assert!(path.ends_with("BobAudit-CZ-07-03-2025-09-05.json"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        let _ = std::fs::remove_dir_all(dir);
    }
}
