// src/config.rs
// =============================================================================
// Runtime settings for audits, link validation and the HTTP service.
//
// Every knob has a default here; the CLI (src/cli.rs) overrides them from
// flags or environment variables. Nothing in this file does I/O.
// =============================================================================

use std::time::Duration;

/// Budget and pool settings for one LinkValidator pass.
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Candidates kept after filtering and dedup; the rest are ignored.
    pub max_links: usize,
    /// In-flight probes per pass.
    pub concurrency: usize,
    /// Timeout for a single probe (HEAD plus the optional GET retry).
    pub link_timeout: Duration,
    /// Wall-clock cap for the whole pass.
    pub pass_budget: Duration,
    /// How many offending links are reported back.
    pub sample_size: usize,
    /// Visible-text length below which a target counts as "no presentation".
    pub min_text_chars: usize,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            max_links: 50,
            concurrency: 6,
            link_timeout: Duration::from_secs(10),
            pass_budget: Duration::from_secs(30),
            sample_size: 5,
            min_text_chars: 200,
        }
    }
}

/// Settings for a single page audit.
#[derive(Debug, Clone)]
pub struct AuditSettings {
    /// Navigation timeout handed to the renderer.
    pub page_timeout: Duration,
    pub links: ValidatorSettings,
    /// Run the content-depth pass over internal links as an extra check.
    pub content_depth: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(30),
            links: ValidatorSettings::default(),
            content_depth: false,
        }
    }
}

/// Everything the HTTP service needs besides audit settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind: String,
    /// Base URL the per-country `seznam.txt` lists live under.
    pub list_base_url: String,
    /// Endpoint accepting `{country, filename, content}`.
    pub report_endpoint: String,
    /// Optional endpoint receiving the job summary.
    pub notify_endpoint: Option<String>,
    /// Interval between SSE heartbeat comments.
    pub heartbeat: Duration,
    pub audit: AuditSettings,
}

impl ServiceConfig {
    pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);
}
