// src/report/aggregate.rs
// =============================================================================
// ResultAggregator: turns a job's ordered AuditResults into the report body
// and its summary counters. Pure, no I/O; the caller passes the timestamp in.
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;

use crate::audit::AuditResult;

/// The unit handed to a report sink.
#[derive(Debug, Clone)]
pub struct Report {
    pub country: String,
    pub filename: String,
    /// Pretty-printed JSON array of AuditResult
    pub content: String,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total: usize,
    /// Pages where every check passed
    pub passed: usize,
    /// Pages with at least one failing check
    pub failed: usize,
    /// None for an empty job
    pub pass_rate: Option<f64>,
}

impl ReportSummary {
    pub fn from_results(results: &[AuditResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.all_ok()).count();
        let pass_rate = if total == 0 {
            None
        } else {
            Some(passed as f64 * 100.0 / total as f64)
        };

        Self {
            total,
            passed,
            failed: total - passed,
            pass_rate,
        }
    }
}

pub fn aggregate(country: &str, results: &[AuditResult], at: OffsetDateTime) -> Result<Report> {
    let country = country.trim().to_uppercase();
    let content = serde_json::to_string_pretty(results).context("failed to serialize report")?;

    Ok(Report {
        filename: report_filename(&country, at),
        country,
        content,
        summary: ReportSummary::from_results(results),
    })
}

/// `BobAudit-<COUNTRY>-<dd-MM-yyyy-HH-mm>.json`
pub fn report_filename(country: &str, at: OffsetDateTime) -> String {
    format!(
        "BobAudit-{}-{:02}-{:02}-{:04}-{:02}-{:02}.json",
        country.to_uppercase(),
        at.day(),
        u8::from(at.month()),
        at.year(),
        at.hour(),
        at.minute()
    )
}

pub fn parse_report(content: &str) -> Result<Vec<AuditResult>> {
    serde_json::from_str(content).context("report is not a JSON array of audit results")
}
