//! Job storage.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::types::{InvalidTransition, JobId, JobRecord, JobStats, JobStatus};

/// Job store abstraction.
///
/// The single source of truth for job status. Transitions are atomic per job:
/// concurrent callers on the same id observe one consistent final state.
pub trait JobStore: Send + Sync {
    /// Create a queued job for a command. Never fails.
    fn create(&self, command_name: &str) -> JobRecord;

    /// Snapshot of a job, `None` for unknown ids.
    fn try_get(&self, job_id: JobId) -> Option<JobRecord>;

    /// Queued -> Processing.
    fn mark_processing(&self, job_id: JobId) -> Result<JobRecord, JobStoreError>;

    /// Processing -> Succeeded.
    fn mark_succeeded(&self, job_id: JobId) -> Result<JobRecord, JobStoreError>;

    /// Queued | Processing -> Failed.
    fn mark_failed(&self, job_id: JobId, error: &str) -> Result<JobRecord, JobStoreError>;

    /// List jobs, oldest first, optionally filtered by status.
    fn list_by_status(&self, status: Option<JobStatus>, limit: usize) -> Vec<JobRecord>;

    /// Get job statistics.
    fn stats(&self) -> JobStats;
}

/// Job store error.
///
/// Both variants leave the stored record untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

/// In-memory job store.
///
/// Backed by a sharded map; a transition holds the shard lock of its key for
/// the duration of the update.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, JobRecord>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn transition(
        &self,
        job_id: JobId,
        apply: impl FnOnce(&mut JobRecord) -> Result<(), InvalidTransition>,
    ) -> Result<JobRecord, JobStoreError> {
        let mut job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(JobStoreError::NotFound(job_id))?;
        apply(job.value_mut())?;
        debug!(job_id = %job_id, status = %job.status, "job transitioned");
        Ok(job.clone())
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, command_name: &str) -> JobRecord {
        let job = JobRecord::new(command_name);
        self.jobs.insert(job.id, job.clone());
        debug!(job_id = %job.id, command = command_name, "job created");
        job
    }

    fn try_get(&self, job_id: JobId) -> Option<JobRecord> {
        self.jobs.get(&job_id).map(|job| job.clone())
    }

    fn mark_processing(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, JobRecord::mark_processing)
    }

    fn mark_succeeded(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, JobRecord::mark_succeeded)
    }

    fn mark_failed(&self, job_id: JobId, error: &str) -> Result<JobRecord, JobStoreError> {
        self.transition(job_id, |job| job.mark_failed(error))
    }

    fn list_by_status(&self, status: Option<JobStatus>, limit: usize) -> Vec<JobRecord> {
        let mut result: Vec<_> = self
            .jobs
            .iter()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .map(|j| j.clone())
            .collect();

        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        result
    }

    fn stats(&self) -> JobStats {
        let mut stats = JobStats::default();
        for job in self.jobs.iter() {
            stats.record(job.status);
        }
        stats
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn create(&self, command_name: &str) -> JobRecord {
        (**self).create(command_name)
    }

    fn try_get(&self, job_id: JobId) -> Option<JobRecord> {
        (**self).try_get(job_id)
    }

    fn mark_processing(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        (**self).mark_processing(job_id)
    }

    fn mark_succeeded(&self, job_id: JobId) -> Result<JobRecord, JobStoreError> {
        (**self).mark_succeeded(job_id)
    }

    fn mark_failed(&self, job_id: JobId, error: &str) -> Result<JobRecord, JobStoreError> {
        (**self).mark_failed(job_id, error)
    }

    fn list_by_status(&self, status: Option<JobStatus>, limit: usize) -> Vec<JobRecord> {
        (**self).list_by_status(status, limit)
    }

    fn stats(&self) -> JobStats {
        (**self).stats()
    }
}
