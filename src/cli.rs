// src/cli.rs
// =============================================================================
// Command-line interface, built with clap's derive API.
//
// Three subcommands:
// - serve: run the HTTP service (bulk jobs, SSE streams, single audits)
// - audit: audit one page and print the checks
// - bulk:  run a whole country list offline from a local seznam.txt
//
// Every `serve` flag can also come from the environment (`env = ...`), which
// is how the service is configured when it runs in a container.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{AuditSettings, ServiceConfig, ValidatorSettings};

#[derive(Parser, Debug)]
#[command(
    name = "migration-bob",
    version,
    about = "Bulk page audits for migrated websites",
    long_about = "migration-bob audits pages for SEO basics and broken links. \
                  Run it as a service that audits whole country lists in the background \
                  and streams progress, or use it from the terminal for one page or one list."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "BOB_LOG_LEVEL")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "BOB_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    ///
    /// Example: migration-bob serve --list-base-url https://lists.example.com/
    Serve(ServeArgs),

    /// Audit a single page
    ///
    /// Example: migration-bob audit https://example.com/cz/produkty --json
    Audit {
        /// Page URL (absolute http or https)
        url: String,

        /// Print the result as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Page load timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        links: LinkArgs,
    },

    /// Audit every URL in a local country list
    ///
    /// Example: migration-bob bulk --input lists/cz/seznam.txt
    Bulk {
        /// Path to <dir>/<country>/seznam.txt; the parent directory names the country
        #[arg(long)]
        input: PathBuf,

        /// Where to write the report (default: <country dir>/audity/<report name>)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Page load timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        links: LinkArgs,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "BOB_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Base URL under which <CC>/seznam.txt lists are published
    #[arg(long, env = "BOB_LIST_BASE_URL")]
    pub list_base_url: String,

    /// Endpoint that stores reports and answers with their URL
    #[arg(long, env = "BOB_REPORT_ENDPOINT")]
    pub report_endpoint: String,

    /// Endpoint that receives the per-job summary (optional)
    #[arg(long, env = "BOB_NOTIFY_ENDPOINT")]
    pub notify_endpoint: Option<String>,

    /// Seconds between SSE heartbeats
    #[arg(long, env = "BOB_HEARTBEAT_SECS", default_value_t = 10)]
    pub heartbeat_secs: u64,

    /// Page load timeout in seconds
    #[arg(long, env = "BOB_PAGE_TIMEOUT_SECS", default_value_t = 30)]
    pub page_timeout_secs: u64,

    #[command(flatten)]
    pub links: LinkArgs,
}

/// Link validation knobs shared by every subcommand.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Concurrent link probes per page
    #[arg(long, env = "BOB_LINK_CONCURRENCY", default_value_t = 6)]
    pub link_concurrency: usize,

    /// Timeout for a single link probe, in seconds
    #[arg(long, env = "BOB_LINK_TIMEOUT_SECS", default_value_t = 10)]
    pub link_timeout_secs: u64,

    /// Wall-clock budget for one link pass, in seconds
    #[arg(long, env = "BOB_LINK_BUDGET_SECS", default_value_t = 30)]
    pub link_budget_secs: u64,

    /// Maximum links checked per pass
    #[arg(long, env = "BOB_MAX_LINKS", default_value_t = 50)]
    pub max_links: usize,

    /// Also check that internal links lead to pages with real content
    #[arg(long, env = "BOB_CONTENT_DEPTH")]
    pub content_depth: bool,
}

impl LinkArgs {
    pub fn audit_settings(&self, page_timeout_secs: u64) -> AuditSettings {
        AuditSettings {
            page_timeout: Duration::from_secs(page_timeout_secs),
            links: ValidatorSettings {
                max_links: self.max_links,
                concurrency: self.link_concurrency.max(1),
                link_timeout: Duration::from_secs(self.link_timeout_secs),
                pass_budget: Duration::from_secs(self.link_budget_secs),
                ..ValidatorSettings::default()
            },
            content_depth: self.content_depth,
        }
    }
}

impl ServeArgs {
    pub fn into_config(self) -> ServiceConfig {
        let audit = self.links.audit_settings(self.page_timeout_secs);
        ServiceConfig {
            bind: self.bind,
            list_base_url: self.list_base_url,
            report_endpoint: self.report_endpoint,
            notify_endpoint: self.notify_endpoint.filter(|e| !e.trim().is_empty()),
            heartbeat: if self.heartbeat_secs == 0 {
                ServiceConfig::DEFAULT_HEARTBEAT
            } else {
                Duration::from_secs(self.heartbeat_secs)
            },
            audit,
        }
    }
}


// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does `env = "..."` do?
//    - If the flag is missing on the command line, clap reads that
//      environment variable instead, and only then falls back to the default
//    - Needs the "env" feature of clap (see Cargo.toml)
//
// 2. What is #[command(flatten)]?
//    - It splices the fields of another Args struct into this command,
//      so LinkArgs is written once and shared by serve, audit and bulk
//
// 3. Why `global = true` on --log-level?
//    - Global flags may appear before or after the subcommand name
// -----------------------------------------------------------------------------
