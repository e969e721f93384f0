// src/jobs/manager.rs
// =============================================================================
// JobManager: the registry of bulk jobs and the worker that drives each one.
//
// Lifecycle:  QUEUED -> RUNNING -> DONE | ERROR   (no retries, no way back)
//
// What the worker does:
// 1. Resolve the country's URL list (upper-case path, then lower-case)
// 2. Emit `start`, then audit URLs one at a time, in list order
// 3. Per URL: `page-start`, one `check` per result, `result`, `progress`
// 4. Aggregate, submit the report, emit `done`
// A single page's fault becomes an "Unhandled error" check and the batch
// moves on. Only list loading and report submission can fail the job.
//
// URLs are audited one at a time, so event order mirrors processing order.
// The concurrency lives inside each page's link validation.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use super::model::{Job, JobId, JobSnapshot};
use super::source::{load_country_urls, ListLoader};
use crate::audit::{AuditResult, CheckResult, PageAuditor, PageRenderer};
use crate::config::AuditSettings;
use crate::events::{
    AuditEvent, CheckEvent, DoneEvent, ErrorEvent, PageStartEvent, ProgressEvent, ResultEvent,
    StartEvent, Subscription,
};
use crate::report::{aggregate, JobSummary, Notifier, ReportSink, ReportSummary};

/// The external collaborators every job uses.
pub struct JobDeps {
    pub renderer: Arc<dyn PageRenderer>,
    pub lists: Arc<dyn ListLoader>,
    pub reports: Arc<dyn ReportSink>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub settings: AuditSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateJobError {
    MissingCountry,
}

impl fmt::Display for CreateJobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateJobError::MissingCountry => write!(f, "missing_country"),
        }
    }
}

impl std::error::Error for CreateJobError {}

#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<DashMap<JobId, Arc<Job>>>,
    deps: Arc<JobDeps>,
}

impl JobManager {
    pub fn new(deps: JobDeps) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            deps: Arc::new(deps),
        }
    }

    /// Registers a job and starts it in the background. Returns at once.
    pub fn create_job(&self, country: &str) -> Result<JobId, CreateJobError> {
        let job = self.register(country)?;
        let id = job.id;
        self.start(job);
        Ok(id)
    }

    /// Like `create_job`, but the caller is subscribed before the worker
    /// publishes anything, so it sees the whole event sequence.
    pub fn create_job_with_subscription(
        &self,
        country: &str,
    ) -> Result<(JobId, Subscription), CreateJobError> {
        let job = self.register(country)?;
        let id = job.id;
        let subscription = job.events.subscribe();
        self.start(job);
        Ok((id, subscription))
    }

    fn register(&self, country: &str) -> Result<Arc<Job>, CreateJobError> {
        let country = country.trim();
        if country.is_empty() {
            return Err(CreateJobError::MissingCountry);
        }

        let job = Arc::new(Job::new(country.to_uppercase()));
        self.jobs.insert(job.id, Arc::clone(&job));
        info!(job_id = %job.id, country = %job.country, "job queued");
        Ok(job)
    }

    // Not tied to the request: the job keeps going if the caller leaves
    fn start(&self, job: Arc<Job>) {
        let deps = Arc::clone(&self.deps);
        tokio::spawn(run_job(job, deps));
    }

    pub fn status(&self, id: &JobId) -> Option<JobSnapshot> {
        self.get(id).map(|job| job.snapshot())
    }

    pub fn subscribe(&self, id: &JobId) -> Option<Subscription> {
        self.get(id).map(|job| job.events.subscribe())
    }

    pub fn get(&self, id: &JobId) -> Option<Arc<Job>> {
        // Clone the Arc out so the shard lock is released right away
        self.jobs.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// A fresh auditor with its own HTTP clients, for one-off page audits.
    pub fn page_auditor(&self) -> Result<PageAuditor> {
        PageAuditor::new(Arc::clone(&self.deps.renderer), self.deps.settings.clone())
    }
}

async fn run_job(job: Arc<Job>, deps: Arc<JobDeps>) {
    job.mark_running();
    info!(job_id = %job.id, country = %job.country, "job running");

    let mut results = Vec::new();
    match audit_all(&job, &deps, &mut results).await {
        Ok((output_url, summary)) => {
            job.finish(output_url.clone());
            let snapshot = job.snapshot();
            info!(
                job_id = %job.id,
                total = snapshot.total,
                passed = summary.passed,
                %output_url,
                "job done"
            );
            job.events.publish(AuditEvent::Done(DoneEvent {
                job_id: job.id,
                total: snapshot.total,
                done: snapshot.done,
                output_url: output_url.clone(),
                passed: summary.passed,
                failed: summary.failed,
            }));
            notify(&deps, &job.country, Some(output_url), results);
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(job_id = %job.id, error = %message, "job failed");
            job.fail(message.clone());
            job.events.publish(AuditEvent::Error(ErrorEvent {
                job_id: job.id,
                message,
            }));
            notify(&deps, &job.country, None, results);
        }
    }
}

// Everything that can fail the whole job goes through `?` in here
async fn audit_all(
    job: &Job,
    deps: &JobDeps,
    results: &mut Vec<AuditResult>,
) -> Result<(String, ReportSummary)> {
    let urls = load_country_urls(deps.lists.as_ref(), &job.country).await?;
    let total = urls.len();
    job.set_total(total);
    job.events.publish(AuditEvent::Start(StartEvent {
        job_id: job.id,
        country: job.country.clone(),
        total,
    }));

    // One auditor per job: its HTTP clients are not shared with other jobs
    let auditor = PageAuditor::new(Arc::clone(&deps.renderer), deps.settings.clone())
        .map_err(|e| format!("{e:#}"));

    for (i, url) in urls.into_iter().enumerate() {
        let index = i + 1;
        job.events.publish(AuditEvent::PageStart(PageStartEvent {
            index,
            url: url.clone(),
            total,
        }));

        let result = match audit_isolated(&auditor, &url).await {
            Ok(result) => result,
            Err(e) => {
                warn!(job_id = %job.id, %url, error = %format!("{e:#}"), "page audit faulted");
                AuditResult::new(url.clone(), vec![CheckResult::unhandled(format!("{e:#}"))])
            }
        };

        let done = job.page_finished();
        publish_page(job, index, &result);
        job.events
            .publish(AuditEvent::Progress(ProgressEvent { done, total }));
        results.push(result);
    }

    let report = aggregate(&job.country, results, OffsetDateTime::now_utc())?;
    let output_url = deps
        .reports
        .submit(&report)
        .await
        .context("report submission failed")?;

    Ok((output_url, report.summary))
}

// Runs one page audit on its own task so even a panic stays with that page
async fn audit_isolated(
    auditor: &std::result::Result<PageAuditor, String>,
    url: &str,
) -> Result<AuditResult> {
    let auditor = match auditor {
        Ok(auditor) => auditor.clone(),
        Err(message) => return Err(anyhow!("auditor unavailable: {}", message)),
    };

    let url = url.to_string();
    tokio::spawn(async move { auditor.audit(&url).await })
        .await
        .map_err(|e| anyhow!("page audit aborted: {}", e))?
}

fn publish_page(job: &Job, index: usize, result: &AuditResult) {
    for check in &result.checks {
        job.events.publish(AuditEvent::Check(CheckEvent {
            index,
            url: result.url.clone(),
            name: check.name.clone(),
            ok: check.ok,
            details: check.details.clone(),
        }));
    }

    job.events.publish(AuditEvent::Result(ResultEvent {
        index,
        url: result.url.clone(),
        all_ok: result.all_ok(),
        passed: result.passed(),
        failed: result.failed(),
    }));
}

// Fire-and-forget: the job is already terminal when this runs
fn notify(deps: &JobDeps, country: &str, report_url: Option<String>, pages: Vec<AuditResult>) {
    let Some(notifier) = deps.notifier.clone() else {
        return;
    };

    let ok = pages.iter().filter(|p| p.all_ok()).count();
    let summary = JobSummary {
        country: country.to_string(),
        report_url,
        total: pages.len(),
        ok,
        nok: pages.len() - ok,
        pages,
    };

    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&summary).await {
            warn!(country = %summary.country, error = %format!("{e:#}"), "notification failed");
        }
    });
}
