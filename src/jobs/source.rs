// src/jobs/source.rs
// =============================================================================
// This module finds the URL list for a country.
//
// Strategy:
// - Each country has a `seznam.txt` under its own directory
// - Try the upper-case directory first (CZ/seznam.txt), then the lower-case
//   one (cz/seznam.txt); only when both fail is the job in trouble
// - The file is freeform: one URL per line, or URLs buried in prose. Every
//   absolute http(s) URL is pulled out, first occurrence wins
//
// The loader itself is a trait so the same job code can read lists over HTTP
// (server mode) or from one file on disk (the offline bulk command).
// =============================================================================

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const LIST_FILE: &str = "seznam.txt";

#[async_trait]
pub trait ListLoader: Send + Sync {
    /// Fetches the raw text at `path` (relative, e.g. "CZ/seznam.txt").
    async fn fetch(&self, path: &str) -> Result<String>;
}

// Loads and parses the URL list for a country
//
// Returns: deduplicated URLs in first-seen order, or an error naming both
// paths that were tried
pub async fn load_country_urls(loader: &dyn ListLoader, country: &str) -> Result<Vec<String>> {
    let upper = format!("{}/{}", country.to_uppercase(), LIST_FILE);
    let lower = format!("{}/{}", country.to_lowercase(), LIST_FILE);

    let text = match loader.fetch(&upper).await {
        Ok(text) => text,
        Err(first) => {
            debug!(path = %upper, error = %first, "upper-case list missing, trying lower-case");
            loader.fetch(&lower).await.map_err(|second| {
                anyhow!(
                    "URL list not found for {}: {} ({}); {} ({})",
                    country,
                    upper,
                    first,
                    lower,
                    second
                )
            })?
        }
    };

    let urls = extract_urls(&text);
    if urls.is_empty() {
        warn!(country, "URL list contains no http(s) URLs");
    }
    Ok(urls)
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?i)https?://[^\s"'<>]+"#).unwrap())
}

// Pulls every absolute http(s) URL out of freeform text
//
// Trailing punctuation that usually belongs to the sentence, not the URL,
// is trimmed (".", ",", ";", ":", ")", "]", "!", "?").
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in url_pattern().find_iter(text) {
        let url = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', ')', ']', '!', '?']);

        // "https://" on its own is not a URL
        if url.len() <= "https://".len() {
            continue;
        }

        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    urls
}

/// Reads lists from `<base_url>/<path>`.
#[derive(Debug, Clone)]
pub struct HttpListLoader {
    client: Client,
    base_url: String,
}

impl HttpListLoader {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build list loader HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ListLoader for HttpListLoader {
    async fn fetch(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            ));
        }

        let content = response.text().await?;
        Ok(content)
    }
}

/// Serves one file on disk for every path it is asked about. The offline
/// bulk command already knows which file holds the list.
#[derive(Debug, Clone)]
pub struct FileListLoader {
    file: PathBuf,
}

impl FileListLoader {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

#[async_trait]
impl ListLoader for FileListLoader {
    async fn fetch(&self, _path: &str) -> Result<String> {
        tokio::fs::read_to_string(&self.file)
            .await
            .with_context(|| format!("failed to read {}", self.file.display()))
    }
}
