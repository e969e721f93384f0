// src/jobs/model.rs
// =============================================================================
// Job records and the snapshot handed to status queries.
//
// A job's mutable fields sit behind their own RwLock, so the worker updating
// one job never contends with status reads of another, and a reader always
// sees a consistent set of fields (never `done` from one update and `status`
// from the next).
// =============================================================================

use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::events::EventStream;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// Point-in-time copy of a job, as returned by `GET /bulk/status/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub country: String,
    pub status: JobStatus,
    pub total: usize,
    pub done: usize,
    pub output_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
struct JobFields {
    status: JobStatus,
    total: usize,
    done: usize,
    output_url: Option<String>,
    error: Option<String>,
}

/// One job: immutable identity, worker-owned fields, and its event stream.
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    pub country: String,
    pub events: EventStream,
    fields: RwLock<JobFields>,
}

impl Job {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            country: country.into(),
            events: EventStream::new(),
            fields: RwLock::new(JobFields {
                status: JobStatus::Queued,
                total: 0,
                done: 0,
                output_url: None,
                error: None,
            }),
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let fields = self.read();
        JobSnapshot {
            id: self.id,
            country: self.country.clone(),
            status: fields.status,
            total: fields.total,
            done: fields.done,
            output_url: fields.output_url.clone(),
            error: fields.error.clone(),
        }
    }

    // The mutators below are only called by the job's own worker.

    pub(crate) fn mark_running(&self) {
        self.transition(JobStatus::Running);
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.write().total = total;
    }

    /// Bumps `done`, never past `total`, and returns the new value.
    pub(crate) fn page_finished(&self) -> usize {
        let mut fields = self.write();
        fields.done = (fields.done + 1).min(fields.total);
        fields.done
    }

    pub(crate) fn finish(&self, output_url: String) {
        let mut fields = self.write();
        if fields.status.is_terminal() {
            return;
        }
        fields.output_url = Some(output_url);
        fields.status = JobStatus::Done;
    }

    pub(crate) fn fail(&self, message: String) {
        let mut fields = self.write();
        if fields.status.is_terminal() {
            return;
        }
        fields.error = Some(message);
        fields.status = JobStatus::Error;
    }

    fn transition(&self, next: JobStatus) {
        let mut fields = self.write();
        if !fields.status.is_terminal() {
            fields.status = next;
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, JobFields> {
        self.fields.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobFields> {
        self.fields.write().unwrap_or_else(|e| e.into_inner())
    }
}
