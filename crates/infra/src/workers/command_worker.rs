//! The command worker: the single consumer loop of the pipeline.
//!
//! ```text
//! Idle ──dequeue──> Processing ──dispatch──> Completing ──> Idle
//!   └── shutdown ──> Stopped
//! ```
//!
//! Commands are processed strictly one at a time: command N+1 is not dequeued
//! until command N's job is terminal. Every failure of a single command
//! (missing handler, handler error, handler panic) is recorded on that job and
//! the loop moves on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use jobline_core::{Command, CommandKind, JobId};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command_dispatcher::{CommandDispatcher, HandlerContext};
use crate::jobs::{JobStatus, JobStore, JobStoreError};
use crate::queue::{CommandQueue, QueueError};
use crate::submit::CommandSubmitter;

/// Worker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandWorkerConfig {
    /// Name for logging
    pub name: String,
}

impl Default for CommandWorkerConfig {
    fn default() -> Self {
        Self {
            name: "command-worker".to_string(),
        }
    }
}

impl CommandWorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Worker runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_skipped: u64,
    pub uptime_secs: u64,
}

#[derive(Debug)]
struct StatsCounters {
    started: Instant,
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl StatsCounters {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            processed: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    fn record(&self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => self.succeeded.fetch_add(1, Ordering::Relaxed),
            JobOutcome::Failed(_) => self.failed.fetch_add(1, Ordering::Relaxed),
            JobOutcome::Skipped(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            jobs_processed: self.processed.load(Ordering::Relaxed),
            jobs_succeeded: self.succeeded.load(Ordering::Relaxed),
            jobs_failed: self.failed.load(Ordering::Relaxed),
            jobs_skipped: self.skipped.load(Ordering::Relaxed),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

/// Result of processing one command, as recorded on its job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
    /// The job was not in a state that allows it to start; the handler was
    /// not run and the record was left as it was.
    Skipped(JobStatus),
}

/// Handle to control a running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: CancellationToken,
    join: Option<JoinHandle<()>>,
    stats: Arc<StatsCounters>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the loop to stop.
    ///
    /// A command already being processed runs to completion first.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                error!(error = %e, "command worker task ended abnormally");
            }
        }
    }

    /// The signal that stops the loop; cancelling it is equivalent to
    /// `shutdown` without waiting.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Get current worker statistics.
    pub fn stats(&self) -> WorkerStats {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }
}

/// Consumer loop tying queue, job store and dispatcher together.
pub struct CommandWorker {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn CommandQueue>,
    dispatcher: Arc<CommandDispatcher>,
}

impl CommandWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn CommandQueue>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        Self {
            store,
            queue,
            dispatcher,
        }
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(self, config: CommandWorkerConfig) -> WorkerHandle {
        self.spawn_with_shutdown(config, CancellationToken::new())
    }

    /// Spawn the loop, stopping when `shutdown` (or a parent token) fires.
    pub fn spawn_with_shutdown(
        self,
        config: CommandWorkerConfig,
        shutdown: CancellationToken,
    ) -> WorkerHandle {
        let stats = Arc::new(StatsCounters::new());
        let join = tokio::spawn(self.run(config, shutdown.clone(), stats.clone()));

        WorkerHandle {
            shutdown,
            join: Some(join),
            stats,
        }
    }

    async fn run(
        self,
        config: CommandWorkerConfig,
        shutdown: CancellationToken,
        stats: Arc<StatsCounters>,
    ) {
        info!(
            worker = %config.name,
            handlers = ?self.dispatcher.registered_kinds(),
            "command worker started"
        );

        loop {
            let command = match self.queue.dequeue(&shutdown).await {
                Ok(command) => command,
                Err(QueueError::Cancelled) => break,
                Err(e) => {
                    error!(worker = %config.name, error = %e, "command queue unavailable");
                    break;
                }
            };

            let outcome = self.process(command, &shutdown).await;
            stats.record(&outcome);
        }

        let stats = stats.snapshot();
        info!(
            worker = %config.name,
            processed = stats.jobs_processed,
            succeeded = stats.jobs_succeeded,
            failed = stats.jobs_failed,
            skipped = stats.jobs_skipped,
            "command worker stopped"
        );
    }

    /// Run one command through its job lifecycle and record the outcome.
    ///
    /// A command whose job has already started or finished is not run again.
    /// A command without a job record still runs.
    pub async fn process(&self, command: Command, shutdown: &CancellationToken) -> JobOutcome {
        let job_id = command.job_id();
        let kind = command.kind();

        match self.store.mark_processing(job_id) {
            Ok(_) => {}
            Err(JobStoreError::NotFound(_)) => {
                warn!(job_id = %job_id, kind = %kind, "no job record for command");
            }
            Err(JobStoreError::InvalidTransition(e)) => {
                warn!(
                    job_id = %job_id,
                    kind = %kind,
                    status = %e.from,
                    "job cannot start, skipping command"
                );
                return JobOutcome::Skipped(e.from);
            }
        }
        debug!(job_id = %job_id, kind = %kind, "processing command");

        let outcome = self.execute(command, shutdown).await;
        self.complete(job_id, kind, &outcome);
        outcome
    }

    async fn execute(&self, command: Command, shutdown: &CancellationToken) -> JobOutcome {
        let submitter = CommandSubmitter::new(self.store.clone(), self.queue.clone());
        let ctx = HandlerContext::new(shutdown.clone(), submitter);
        let dispatcher = self.dispatcher.clone();

        // A separate task turns a handler panic into a JoinError instead of
        // unwinding through the loop.
        let task = tokio::spawn(async move { dispatcher.dispatch(command, &ctx).await });

        match task.await {
            Ok(Ok(())) => JobOutcome::Succeeded,
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(e) if e.is_panic() => {
                JobOutcome::Failed(format!("handler panicked: {}", panic_message(e.into_panic())))
            }
            Err(e) => JobOutcome::Failed(format!("handler task aborted: {e}")),
        }
    }

    fn complete(&self, job_id: JobId, kind: CommandKind, outcome: &JobOutcome) {
        let recorded = match outcome {
            JobOutcome::Succeeded => {
                debug!(job_id = %job_id, kind = %kind, "job succeeded");
                self.store.mark_succeeded(job_id)
            }
            JobOutcome::Failed(error) => {
                warn!(job_id = %job_id, kind = %kind, error = %error, "command execution failed");
                self.store.mark_failed(job_id, error)
            }
            JobOutcome::Skipped(_) => return,
        };

        if let Err(e) = recorded {
            warn!(job_id = %job_id, kind = %kind, error = %e, "could not record job outcome");
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
