// src/audit/renderer.rs
// =============================================================================
// The page renderer is a capability, not a library binding: the auditor only
// sees `PageRenderer::render` and never depends on how a page gets loaded.
//
// Two kinds of failure are kept apart:
// - Ok(Navigation::Failed(..)): the page did not load; the auditor records a
//   failing check and keeps going
// - Err(..): the renderer itself could not be set up; that propagates
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::CheckResult;

/// A page that loaded, with whatever the renderer could capture.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub status: u16,
    /// Where the page ended up after redirects
    pub final_url: Url,
    pub html: String,
    /// Checks the renderer evaluated itself (script-driven ones, for example)
    pub evaluated: Vec<CheckResult>,
}

#[derive(Debug, Clone)]
pub enum Navigation {
    Loaded(RenderedPage),
    Failed(String),
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<Navigation>;
}

/// Default renderer: a plain HTTP GET, DOM queries done later with scraper.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("migration-bob/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("failed to build renderer HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url, timeout: Duration) -> Result<Navigation> {
        let response = match self.client.get(url.clone()).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(Navigation::Failed(format!(
                    "Timed out after {:?}",
                    timeout
                )))
            }
            Err(e) => return Ok(Navigation::Failed(e.to_string())),
        };

        let status = response.status().as_u16();
        let final_url = response.url().clone();

        // Error pages still have a body worth looking at
        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => return Ok(Navigation::Failed(format!("Failed to read body: {}", e))),
        };

        Ok(Navigation::Loaded(RenderedPage {
            status,
            final_url,
            html,
            evaluated: Vec::new(),
        }))
    }
}
