//! Pipeline wiring: one store, one queue, one dispatcher, one worker.

use std::sync::Arc;
use std::time::Duration;

use jobline_core::{CommandRequest, JobId};
use jobline_handlers::register_all;
use jobline_infra::command_dispatcher::{CommandDispatcher, RegistryError};
use jobline_infra::jobs::{InMemoryJobStore, JobRecord, JobStats, JobStore};
use jobline_infra::queue::InMemoryCommandQueue;
use jobline_infra::submit::{CommandSubmitter, SubmitError};
use jobline_infra::workers::{CommandWorker, WorkerHandle, WorkerStats};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::WorkerConfig;

const IDLE_POLL: Duration = Duration::from_millis(10);

/// A running pipeline.
#[derive(Debug)]
pub struct App {
    submitter: CommandSubmitter,
    store: Arc<InMemoryJobStore>,
    worker: WorkerHandle,
}

impl App {
    /// Build the pipeline and spawn its worker on the current runtime.
    pub fn start(config: &WorkerConfig) -> Result<Self, RegistryError> {
        let mut builder = CommandDispatcher::builder();
        register_all(&mut builder, &config.handlers)?;
        let dispatcher = Arc::new(builder.build());

        let store = InMemoryJobStore::arc();
        let queue = Arc::new(InMemoryCommandQueue::new(config.queue_capacity));
        let submitter = CommandSubmitter::new(store.clone(), queue.clone());

        info!(
            worker = %config.worker.name,
            queue_capacity = ?config.queue_capacity,
            "starting pipeline"
        );
        let worker =
            CommandWorker::new(store.clone(), queue, dispatcher).spawn(config.worker.clone());

        Ok(Self {
            submitter,
            store,
            worker,
        })
    }

    pub fn submit(&self, request: CommandRequest) -> Result<JobId, SubmitError> {
        self.submitter.submit_request(request)
    }

    pub fn status(&self, job_id: JobId) -> Option<JobRecord> {
        self.submitter.status(job_id)
    }

    pub fn stats(&self) -> JobStats {
        self.store.stats()
    }

    pub fn worker_stats(&self) -> WorkerStats {
        self.worker.stats()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.worker.shutdown_token()
    }

    /// Wait until no job is queued or processing, or until shutdown starts.
    pub async fn wait_idle(&self) {
        let shutdown = self.worker.shutdown_token();
        while self.stats().in_flight() > 0 && !shutdown.is_cancelled() {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(IDLE_POLL) => {}
            }
        }
    }

    /// Stop the worker. The command in progress, if any, completes first;
    /// commands still queued stay `Queued`.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
        let stats = self.store.stats();
        info!(
            queued = stats.queued,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "pipeline stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use jobline_handlers::HandlerConfig;
    use jobline_infra::jobs::JobStatus;

    use super::*;

    fn instant_config() -> WorkerConfig {
        WorkerConfig {
            handlers: HandlerConfig::instant(),
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn user_registration_runs_to_completion_with_children() {
        let app = App::start(&instant_config()).unwrap();

        let parent = app
            .submit(CommandRequest::UserRegistered {
                email: "ada@example.com".to_string(),
                phone_number: "+1000".to_string(),
                full_name: "Ada".to_string(),
            })
            .unwrap();
        assert!(app.status(parent).is_some());

        tokio::time::timeout(Duration::from_secs(5), app.wait_idle())
            .await
            .expect("pipeline should go idle");

        let stats = app.stats();
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.total(), 3);
        assert_eq!(app.status(parent).unwrap().status, JobStatus::Succeeded);
        assert_eq!(app.worker_stats().jobs_processed, 3);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_request_creates_no_job() {
        let app = App::start(&instant_config()).unwrap();

        let err = app
            .submit(CommandRequest::SendSms {
                phone_number: String::new(),
                message: "hi".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, SubmitError::Validation(_)));
        assert_eq!(app.stats().total(), 0);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn wait_idle_returns_once_shutdown_starts() {
        let app = App::start(&WorkerConfig::default()).unwrap();
        app.shutdown_token().cancel();

        tokio::time::timeout(Duration::from_secs(1), app.wait_idle())
            .await
            .expect("wait_idle should observe shutdown");
        app.shutdown().await;
    }
}
