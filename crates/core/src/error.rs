//! Validation error model.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type used for request validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Rejection of a submission before any job is created.
///
/// These never reach the processing pipeline: a request that fails validation
/// produces no job record and no queued command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or whitespace.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// A field expected to hold an e-mail address does not look like one.
    #[error("{field} is not a valid e-mail address: {value}")]
    InvalidEmail { field: &'static str, value: String },

    /// A report range whose start lies after its end.
    #[error("invalid report range: {from} is after {to}")]
    InvalidRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ValidationError {
    pub fn empty(field: &'static str) -> Self {
        Self::Empty { field }
    }

    pub fn invalid_email(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidEmail {
            field,
            value: value.into(),
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
