// src/jobs/mod.rs
// =============================================================================
// Bulk audit jobs.
//
// Submodules:
// - model: Job records, status and snapshots
// - source: finding and parsing a country's URL list
// - manager: the registry and the per-job worker
// =============================================================================

mod manager;
mod model;
mod source;

pub use manager::{CreateJobError, JobDeps, JobManager};
pub use model::{JobId, JobSnapshot};
pub use source::{FileListLoader, HttpListLoader, ListLoader};
