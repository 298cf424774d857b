//! Submission: create the job, bind the command to it, queue it.
//!
//! Used by outside callers and by handlers that fan out follow-up commands.
//! The job exists before the command is queued, so a status query right after
//! `submit` returns always finds it.

use std::sync::Arc;

use jobline_core::{Command, CommandKind, CommandPayload, CommandRequest, JobId, ValidationError};
use tracing::{debug, warn};

use crate::jobs::{JobRecord, JobStore};
use crate::queue::{CommandQueue, QueueError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Rejected before a job was created.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The job was created but the queue refused the command; the job has
    /// been marked failed.
    #[error("job {job_id} could not be queued: {source}")]
    Enqueue {
        job_id: JobId,
        #[source]
        source: QueueError,
    },
}

/// Producer side of the pipeline.
///
/// Cheap to clone; every clone feeds the same store and queue.
#[derive(Clone)]
pub struct CommandSubmitter {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn CommandQueue>,
}

impl CommandSubmitter {
    pub fn new(store: Arc<dyn JobStore>, queue: Arc<dyn CommandQueue>) -> Self {
        Self { store, queue }
    }

    /// Submit a typed command built around the id of its new job.
    pub fn submit<C, F>(&self, build: F) -> Result<JobId, SubmitError>
    where
        C: CommandPayload,
        F: FnOnce(JobId) -> C,
    {
        self.submit_command(C::KIND, |job_id| build(job_id).into())
    }

    /// Validate and submit a caller request.
    pub fn submit_request(&self, request: CommandRequest) -> Result<JobId, SubmitError> {
        request.validate()?;
        let kind = request.kind();
        self.submit_command(kind, move |job_id| request.into_command(job_id))
    }

    /// Point-in-time snapshot of a job.
    pub fn status(&self, job_id: JobId) -> Option<JobRecord> {
        self.store.try_get(job_id)
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn CommandQueue> {
        &self.queue
    }

    fn submit_command(
        &self,
        kind: CommandKind,
        build: impl FnOnce(JobId) -> Command,
    ) -> Result<JobId, SubmitError> {
        let job = self.store.create(kind.command_name());
        let command = build(job.id);
        debug_assert_eq!(command.job_id(), job.id);

        if let Err(source) = self.queue.enqueue(command) {
            warn!(job_id = %job.id, kind = %kind, error = %source, "enqueue rejected");
            let reason = format!("enqueue rejected: {source}");
            if let Err(e) = self.store.mark_failed(job.id, &reason) {
                warn!(job_id = %job.id, error = %e, "failed to mark rejected job");
            }
            return Err(SubmitError::Enqueue {
                job_id: job.id,
                source,
            });
        }

        debug!(job_id = %job.id, kind = %kind, "command queued");
        Ok(job.id)
    }
}

impl std::fmt::Debug for CommandSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSubmitter")
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use jobline_core::SendSms;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::jobs::{InMemoryJobStore, JobStatus};
    use crate::queue::{InMemoryCommandQueue, QueueCapacity};

    fn setup(capacity: QueueCapacity) -> (CommandSubmitter, Arc<InMemoryCommandQueue>) {
        let queue = Arc::new(InMemoryCommandQueue::new(capacity));
        let submitter = CommandSubmitter::new(Arc::new(InMemoryJobStore::new()), queue.clone());
        (submitter, queue)
    }

    fn sms_request() -> CommandRequest {
        CommandRequest::SendSms {
            phone_number: "+1000".to_string(),
            message: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn submitted_job_is_queued_and_command_carries_its_id() {
        let (submitter, queue) = setup(QueueCapacity::Unbounded);

        let job_id = submitter.submit_request(sms_request()).unwrap();

        let job = submitter.status(job_id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.command_name, "SendSmsCommand");

        let command = queue.dequeue(&CancellationToken::new()).await.unwrap();
        assert_eq!(command.job_id(), job_id);
    }

    #[test]
    fn typed_submit_uses_payload_kind_for_the_job_name() {
        let (submitter, queue) = setup(QueueCapacity::Unbounded);

        let job_id = submitter
            .submit(|job_id| SendSms {
                job_id,
                phone_number: "+1".to_string(),
                message: "m".to_string(),
            })
            .unwrap();

        assert_eq!(submitter.status(job_id).unwrap().command_name, "SendSmsCommand");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn invalid_request_creates_no_job() {
        let (submitter, queue) = setup(QueueCapacity::Unbounded);

        let err = submitter
            .submit_request(CommandRequest::SendSms {
                phone_number: String::new(),
                message: "hi".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, SubmitError::Validation(_)));
        assert_eq!(submitter.store().stats().total(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn rejected_enqueue_fails_the_job() {
        let (submitter, _queue) = setup(QueueCapacity::Bounded(NonZeroUsize::new(1).unwrap()));
        submitter.submit_request(sms_request()).unwrap();

        let err = submitter.submit_request(sms_request()).unwrap_err();
        let SubmitError::Enqueue { job_id, source } = err else {
            panic!("expected enqueue error");
        };
        assert_eq!(source, QueueError::Full { capacity: 1 });

        let job = submitter.status(job_id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("full"));
        assert!(job.completed_at.is_some());
    }
}
