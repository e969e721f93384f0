// src/audit/mod.rs
// =============================================================================
// This module runs the fixed battery of checks against one page.
//
// Submodules:
// - renderer: the page-rendering capability (trait + default HTTP renderer)
// - page: pulls the facts the checks need out of rendered HTML
// - auditor: the PageAuditor facade that turns facts into CheckResults
//
// The result types live here because the job manager, the report aggregator
// and the HTTP API all speak them.
// =============================================================================

mod auditor;
mod page;
mod renderer;

pub use auditor::PageAuditor;
pub use renderer::{HttpRenderer, Navigation, PageRenderer, RenderedPage};

use serde::{Deserialize, Serialize};

/// One named pass/fail test with a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    pub details: String,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, ok: bool, details: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok,
            details: details.into(),
        }
    }

    /// The single failing check recorded for a page whose audit faulted.
    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::new("Unhandled error", false, message)
    }
}

/// All checks for one URL. `all_ok` is always derived from `checks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AuditResultWire", into = "AuditResultWire")]
pub struct AuditResult {
    pub url: String,
    pub checks: Vec<CheckResult>,
}

impl AuditResult {
    pub fn new(url: impl Into<String>, checks: Vec<CheckResult>) -> Self {
        Self {
            url: url.into(),
            checks,
        }
    }

    pub fn all_ok(&self) -> bool {
        self.checks.iter().all(|c| c.ok)
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|c| c.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.checks.len() - self.passed()
    }
}

// On the wire `allOk` is written out for consumers, and ignored on the way
// back in.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditResultWire {
    url: String,
    checks: Vec<CheckResult>,
    #[serde(default)]
    all_ok: bool,
}

impl From<AuditResult> for AuditResultWire {
    fn from(result: AuditResult) -> Self {
        let all_ok = result.all_ok();
        Self {
            url: result.url,
            checks: result.checks,
            all_ok,
        }
    }
}

impl From<AuditResultWire> for AuditResult {
    fn from(wire: AuditResultWire) -> Self {
        Self {
            url: wire.url,
            checks: wire.checks,
        }
    }
}
