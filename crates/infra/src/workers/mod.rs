//! Long-running background workers.

pub mod command_worker;

pub use command_worker::{CommandWorker, CommandWorkerConfig, JobOutcome, WorkerHandle, WorkerStats};
