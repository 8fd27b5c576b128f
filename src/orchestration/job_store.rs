//! # Job Lifecycle Store
//!
//! Token → job status mapping written by the orchestrator and read by status
//! polling. A token sees exactly two writes: `RUNNING` at submission and one
//! terminal write. The store refuses any write that would move a job out of a
//! terminal state, so readers never observe a backward transition.
//!
//! Records are kept for the lifetime of the process.

use crate::logging::log_job_operation;
use crate::models::{JobToken, ProvisioningJob};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::warn;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a job state. Returns `false` when the write was refused because
    /// the stored job is already terminal.
    async fn put(&self, job: ProvisioningJob) -> bool;

    /// Current state of a job. An unknown token yields a FAILED record.
    async fn get(&self, token: &JobToken) -> ProvisioningJob;
}

/// Concurrent in-memory store
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobToken, ProvisioningJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: ProvisioningJob) -> bool {
        let token = job.token.clone();
        let status = job.status;

        match self.jobs.entry(token.clone()) {
            Entry::Occupied(mut existing) => {
                if existing.get().status.is_terminal() {
                    warn!(
                        token = %token,
                        current = %existing.get().status,
                        attempted = %status,
                        "Refusing to overwrite terminal job state"
                    );
                    return false;
                }
                existing.insert(job);
            }
            Entry::Vacant(slot) => {
                slot.insert(job);
            }
        }

        log_job_operation("status_update", token.as_str(), None, &status.to_string(), None);
        true
    }

    async fn get(&self, token: &JobToken) -> ProvisioningJob {
        self.jobs
            .get(token)
            .map(|job| job.value().clone())
            .unwrap_or_else(|| ProvisioningJob::not_found(token.clone()))
    }
}
