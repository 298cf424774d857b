//! `jobline-core`: command model and identifiers shared by every crate.
//!
//! This crate contains **pure data** (no queues, no runtime, no IO).

pub mod command;
pub mod error;
pub mod id;
pub mod request;

pub use command::{
    Command, CommandKind, CommandPayload, GenerateReport, SendEmail, SendSms, UserRegistered,
};
pub use error::{ValidationError, ValidationResult};
pub use id::JobId;
pub use request::CommandRequest;
