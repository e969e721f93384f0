// src/main.rs
// =============================================================================
// Entry point.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) once
// 3. Dispatch to the subcommand handler
// 4. Exit with proper code (0 = all good, 1 = failing checks, 2 = error)
// =============================================================================

mod audit; // src/audit/ - single page audits
mod checker; // src/checker/ - link extraction and validation
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - settings and defaults
mod events; // src/events/ - job events and the SSE adapter
mod jobs; // src/jobs/ - bulk jobs and their registry
mod logging; // src/logging.rs - tracing setup
mod report; // src/report/ - aggregation and report sinks
mod server; // src/server/ - HTTP routes

#[cfg(test)]
mod testing;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, LinkArgs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

use audit::{AuditResult, HttpRenderer, PageAuditor};
use events::AuditEvent;
use jobs::{FileListLoader, JobDeps, JobManager};
use report::DirReportSink;

/// Folder (next to the country's list) that offline reports go into.
const REPORT_DIR: &str = "audity";

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "fatal");
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Serve(args) => {
            server::serve(args.into_config()).await?;
            Ok(0)
        }
        Commands::Audit {
            url,
            json,
            timeout,
            links,
        } => handle_audit(&url, json, timeout, &links).await,
        Commands::Bulk {
            input,
            out,
            timeout,
            links,
        } => handle_bulk(&input, out, timeout, &links).await,
    }
}

// Handles the 'audit' subcommand
async fn handle_audit(url: &str, json: bool, timeout: u64, links: &LinkArgs) -> Result<i32> {
    if !json {
        println!("🔍 Auditing page: {}", url);
    }

    let auditor = PageAuditor::new(Arc::new(HttpRenderer::new()?), links.audit_settings(timeout))?;
    let result = auditor.audit(url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_checks(&result);
    }

    Ok(if result.all_ok() { 0 } else { 1 })
}

// Handles the 'bulk' subcommand: the same JobManager the service uses, fed
// from disk and writing the report to disk
async fn handle_bulk(input: &Path, out: Option<PathBuf>, timeout: u64, links: &LinkArgs) -> Result<i32> {
    let layout = BulkLayout::from_input(input)?;
    println!("📄 Country {} from {}", layout.country, input.display());

    let jobs = JobManager::new(JobDeps {
        renderer: Arc::new(HttpRenderer::new()?),
        lists: Arc::new(FileListLoader::new(input)),
        reports: Arc::new(DirReportSink::new(layout.country_dir.join(REPORT_DIR)).with_output(out)),
        notifier: None,
        settings: links.audit_settings(timeout),
    });

    let (_, mut events) = jobs
        .create_job_with_subscription(&layout.country)
        .map_err(|e| anyhow!("cannot start job: {}", e))?;

    let mut code = 2;
    while let Some(event) = events.recv().await {
        match event {
            AuditEvent::Start(e) => println!("🌐 Auditing {} page(s)\n", e.total),
            AuditEvent::PageStart(e) => println!("[{}/{}] {}", e.index, e.total, e.url),
            AuditEvent::Check(e) if !e.ok => println!("        ❌ {}: {}", e.name, e.details),
            AuditEvent::Result(e) => {
                let mark = if e.all_ok { "✅" } else { "❌" };
                println!("        {} {} passed, {} failed", mark, e.passed, e.failed);
            }
            AuditEvent::Done(e) => {
                println!();
                println!("📊 Summary:");
                println!("   ✅ OK: {}", e.passed);
                println!("   ❌ Failing: {}", e.failed);
                println!("   📋 Total: {}", e.total);
                println!("   💾 Report: {}", e.output_url);
                code = 0;
            }
            AuditEvent::Error(e) => {
                eprintln!("Error: {}", e.message);
                code = 2;
            }
            _ => {}
        }
    }

    Ok(code)
}

/// Country and report location for an offline bulk run, derived from
/// `<dir>/<country>/<list file>`.
#[derive(Debug, PartialEq)]
struct BulkLayout {
    country: String,
    country_dir: PathBuf,
}

impl BulkLayout {
    fn from_input(input: &Path) -> Result<Self> {
        let country_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .with_context(|| format!("{} has no country directory", input.display()))?;

        let country = country_dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .with_context(|| format!("cannot read a country code from {}", country_dir.display()))?;

        Ok(Self {
            country,
            country_dir: country_dir.to_path_buf(),
        })
    }
}

// Prints one audit as a human-readable table
fn print_checks(result: &AuditResult) {
    println!("{:<6} {:<32} {}", "", "CHECK", "DETAILS");
    println!("{}", "=".repeat(90));

    for check in &result.checks {
        let mark = if check.ok { "[ OK ]" } else { "[FAIL]" };
        println!("{:<6} {:<32} {}", mark, check.name, truncate(&check.details, 80));
    }

    println!();
    println!("📊 Summary:");
    println!("   ✅ Passed: {}", result.passed());
    println!("   ❌ Failed: {}", result.failed());
    println!("   📋 Total: {}", result.checks.len());
}

// Char-aware, so long non-ASCII titles don't split a code point
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_layout_from_nested_input() {
        let layout = BulkLayout::from_input(Path::new("lists/cz/seznam.txt")).unwrap();
        assert_eq!(
            layout,
            BulkLayout {
                country: "CZ".into(),
                country_dir: PathBuf::from("lists/cz"),
            }
        );
    }

    #[test]
    fn test_bulk_layout_relative_country_dir() {
        let layout = BulkLayout::from_input(Path::new("sk/seznam.txt")).unwrap();
        assert_eq!(layout.country, "SK");
        assert_eq!(layout.country_dir, PathBuf::from("sk"));
    }

    #[test]
    fn test_bulk_layout_needs_country_dir() {
        assert!(BulkLayout::from_input(Path::new("seznam.txt")).is_err());
    }

    #[test]
    fn test_truncate_is_char_aware() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ěščřžýáíéě", 6), "ěšč...");
    }

    #[tokio::test]
    async fn test_bulk_run_from_directory() {
        let site = testing::spawn_site().await;
        let root = std::env::temp_dir().join(format!("bob-bulk-{}", uuid::Uuid::new_v4()));
        let country_dir = root.join("cz");
        tokio::fs::create_dir_all(&country_dir).await.unwrap();
        let input = country_dir.join("seznam.txt");
        tokio::fs::write(&input, format!("{site}ok\n{site}thin\n")).await.unwrap();

        let out = root.join("report.json");
        let links = LinkArgs {
            link_concurrency: 2,
            link_timeout_secs: 2,
            link_budget_secs: 5,
            max_links: 5,
            content_depth: false,
        };
        let code = handle_bulk(&input, Some(out.clone()), 5, &links).await.unwrap();
        assert_eq!(code, 0);

        let content = tokio::fs::read_to_string(&out).await.unwrap();
        let parsed = report::parse_report(&content).unwrap();
        assert_eq!(parsed.len(), 2);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_bulk_reads_the_given_file() {
        let site = testing::spawn_site().await;
        let root = std::env::temp_dir().join(format!("bob-bulk-{}", uuid::Uuid::new_v4()));
        let country_dir = root.join("Cz");
        tokio::fs::create_dir_all(&country_dir).await.unwrap();
        let input = country_dir.join("urls.txt");
        tokio::fs::write(&input, format!("{site}ok\n")).await.unwrap();

        let links = LinkArgs {
            link_concurrency: 2,
            link_timeout_secs: 2,
            link_budget_secs: 5,
            max_links: 5,
            content_depth: false,
        };
        let code = handle_bulk(&input, None, 5, &links).await.unwrap();
        assert_eq!(code, 0);

        let mut entries = tokio::fs::read_dir(country_dir.join(REPORT_DIR)).await.unwrap();
        let entry = entries.next_entry().await.unwrap().expect("report written");
        let name = entry.file_name().to_string_lossy().into_owned();
        assert!(name.starts_with("BobAudit-CZ-"), "{name}");

        let content = tokio::fs::read_to_string(entry.path()).await.unwrap();
        assert_eq!(report::parse_report(&content).unwrap().len(), 1);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_bulk_run_missing_list_exits_2() {
        let root = std::env::temp_dir().join(format!("bob-bulk-{}", uuid::Uuid::new_v4()));
        let input = root.join("pl").join("seznam.txt");
        let links = LinkArgs {
            link_concurrency: 1,
            link_timeout_secs: 1,
            link_budget_secs: 1,
            max_links: 1,
            content_depth: false,
        };
        assert_eq!(handle_bulk(&input, None, 1, &links).await.unwrap(), 2);
    }
}
