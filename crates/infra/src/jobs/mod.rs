//! Job tracking.
//!
//! ## Design
//!
//! - One job record per command, created before the command is queued
//! - Monotonic lifecycle: Queued -> Processing -> Succeeded | Failed
//! - The store is the only writer of job state
//! - Terminal records stay in the store for later inspection
//!
//! ## Components
//!
//! - `JobRecord`: lifecycle of one command's execution
//! - `JobStore`: concurrent id -> record map with per-key atomic transitions

pub mod store;
pub mod types;

pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use types::{InvalidTransition, JobId, JobRecord, JobStats, JobStatus};
