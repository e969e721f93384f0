// src/report/mod.rs
// =============================================================================
// Final reports: building them (aggregate) and shipping them (sink).
// =============================================================================

mod aggregate;
mod sink;

pub use aggregate::{aggregate, parse_report, Report, ReportSummary};
pub use sink::{DirReportSink, HttpNotifier, HttpReportSink, JobSummary, Notifier, ReportSink};
