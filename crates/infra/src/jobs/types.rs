//! Core job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use jobline_core::JobId;

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, command waiting in the queue
    Queued,
    /// Picked up by the worker, handler running
    Processing,
    /// Handler returned successfully
    Succeeded,
    /// Dispatch or handler failed; see `JobRecord::error`
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Whether `self -> next` is a legal lifecycle step.
    ///
    /// `Queued -> Failed` covers a job whose command never made it onto the
    /// queue; `Queued -> Succeeded` is never legal.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Succeeded)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Lifecycle of exactly one command's execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job ID
    pub id: JobId,
    /// Logical name of the backing command (e.g. `SendSmsCommand`)
    pub command_name: String,
    /// Current status
    pub status: JobStatus,
    /// Failure description, present only when `status` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the worker picked the job up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a new queued job.
    pub fn new(command_name: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            command_name: command_name.into(),
            status: JobStatus::Queued,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark job as processing.
    pub fn mark_processing(&mut self) -> Result<(), InvalidTransition> {
        self.check(JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Mark job as succeeded.
    pub fn mark_succeeded(&mut self) -> Result<(), InvalidTransition> {
        self.check(JobStatus::Succeeded)?;
        self.status = JobStatus::Succeeded;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark job as failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        self.check(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    fn check(&self, to: JobStatus) -> Result<(), InvalidTransition> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub queued: usize,
    pub processing: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl JobStats {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Queued => self.queued += 1,
            JobStatus::Processing => self.processing += 1,
            JobStatus::Succeeded => self.succeeded += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }

    /// Jobs that have not reached a terminal status.
    pub fn in_flight(&self) -> usize {
        self.queued + self.processing
    }

    pub fn total(&self) -> usize {
        self.in_flight() + self.succeeded + self.failed
    }
}
