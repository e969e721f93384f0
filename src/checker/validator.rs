// src/checker/validator.rs
// =============================================================================
// LinkValidator: runs one validation pass over a page's candidate links.
//
// Concurrency policy:
// - At most `concurrency` probes in flight (buffer_unordered)
// - Every probe carries its own timeout
// - The whole pass has a wall-clock budget; when it runs out, every link that
//   has not finished yet (in flight or still queued) counts as broken
//
// Output is deliberately small: how many were checked, how many are broken,
// and the first few broken URLs in candidate order.
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

use super::html::{collect_candidates, LinkScope};
use super::http::{probe_content, probe_link, LinkCheckResult};
use crate::config::ValidatorSettings;

/// Outcome of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub checked: usize,
    pub broken: usize,
    /// First `sample_size` broken links, in candidate order
    pub sample: Vec<String>,
}

impl LinkReport {
    pub fn is_clean(&self) -> bool {
        self.broken == 0
    }

    /// Human-readable detail line for a check result
    pub fn summary(&self) -> String {
        if self.sample.is_empty() {
            format!("Checked {}, broken {}", self.checked, self.broken)
        } else {
            format!(
                "Checked {}, broken {}: {}",
                self.checked,
                self.broken,
                self.sample.join(", ")
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkValidator {
    client: Client,
    settings: ValidatorSettings,
}

impl LinkValidator {
    /// Builds a validator with its own HTTP client.
    pub fn new(settings: ValidatorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.link_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("failed to build link validator HTTP client")?;

        Ok(Self { client, settings })
    }

    /// Filters raw hrefs down to this pass's candidate set.
    pub fn candidates(&self, page: &Url, hrefs: &[String], scope: LinkScope) -> Vec<Url> {
        collect_candidates(hrefs, page, scope, self.settings.max_links)
    }

    /// Probes a single URL outside of any pass (og:image and friends).
    pub async fn probe(&self, url: &Url) -> LinkCheckResult {
        probe_link(self.client.clone(), url.clone(), self.settings.link_timeout).await
    }

    /// Reachability pass.
    pub async fn validate(&self, candidates: Vec<Url>) -> LinkReport {
        let timeout = self.settings.link_timeout;
        self.run_pass(candidates, |url| probe_link(self.client.clone(), url, timeout))
            .await
    }

    /// Content-depth pass: reachable targets with too little visible text are
    /// flagged as well.
    pub async fn validate_content(&self, candidates: Vec<Url>) -> LinkReport {
        let timeout = self.settings.link_timeout;
        let min_chars = self.settings.min_text_chars;
        self.run_pass(candidates, |url| {
            probe_content(self.client.clone(), url, timeout, min_chars)
        })
        .await
    }

    async fn run_pass<F, Fut>(&self, candidates: Vec<Url>, check: F) -> LinkReport
    where
        F: Fn(Url) -> Fut,
        Fut: Future<Output = LinkCheckResult>,
    {
        if candidates.is_empty() {
            return LinkReport::default();
        }

        let deadline = tokio::time::Instant::now() + self.settings.pass_budget;
        let mut outcomes: Vec<Option<LinkCheckResult>> = vec![None; candidates.len()];

        let mut pending = stream::iter(candidates.iter().cloned().enumerate().map(|(idx, url)| {
            let probe = check(url);
            async move { (idx, probe.await) }
        }))
        .buffer_unordered(self.settings.concurrency.max(1));

        loop {
            match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(Some((idx, result))) => outcomes[idx] = Some(result),
                Ok(None) => break,
                Err(_) => {
                    let unfinished = outcomes.iter().filter(|o| o.is_none()).count();
                    warn!(
                        unfinished,
                        budget_ms = self.settings.pass_budget.as_millis() as u64,
                        "link validation budget exhausted"
                    );
                    break;
                }
            }
        }

        // Dropping the stream cancels whatever is still in flight
        drop(pending);

        let mut report = LinkReport {
            checked: candidates.len(),
            ..LinkReport::default()
        };

        for (url, outcome) in candidates.iter().zip(outcomes) {
            let result = outcome.unwrap_or_else(|| LinkCheckResult::unchecked(url));
            if result.is_ok() {
                continue;
            }

            debug!(url = %result.url, status = ?result.status, message = ?result.message, "broken link");
            report.broken += 1;
            if report.sample.len() < self.settings.sample_size {
                report.sample.push(result.url);
            }
        }

        report
    }
}
