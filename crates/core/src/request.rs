//! Submission requests: commands as a caller describes them, before a job id
//! exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::command::{
    Command, CommandKind, GenerateReport, SendEmail, SendSms, UserRegistered,
};
use crate::error::{ValidationError, ValidationResult};
use crate::id::JobId;

/// A request to run one command.
///
/// Serialized with an internal `type` tag matching [`CommandKind::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandRequest {
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
    SendSms {
        phone_number: String,
        message: String,
    },
    GenerateReport {
        report_type: String,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    UserRegistered {
        email: String,
        phone_number: String,
        full_name: String,
    },
}

impl CommandRequest {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandRequest::SendEmail { .. } => CommandKind::SendEmail,
            CommandRequest::SendSms { .. } => CommandKind::SendSms,
            CommandRequest::GenerateReport { .. } => CommandKind::GenerateReport,
            CommandRequest::UserRegistered { .. } => CommandKind::UserRegistered,
        }
    }

    /// Check the payload before any job is created.
    pub fn validate(&self) -> ValidationResult<()> {
        match self {
            CommandRequest::SendEmail { to, subject, .. } => {
                email("to", to)?;
                non_empty("subject", subject)
            }
            CommandRequest::SendSms {
                phone_number,
                message,
            } => {
                non_empty("phone_number", phone_number)?;
                non_empty("message", message)
            }
            CommandRequest::GenerateReport {
                report_type,
                from,
                to,
            } => {
                non_empty("report_type", report_type)?;
                if from > to {
                    return Err(ValidationError::InvalidRange {
                        from: *from,
                        to: *to,
                    });
                }
                Ok(())
            }
            CommandRequest::UserRegistered {
                email: address,
                phone_number,
                full_name,
            } => {
                email("email", address)?;
                non_empty("phone_number", phone_number)?;
                non_empty("full_name", full_name)
            }
        }
    }

    /// Bind the request to the job that will track it.
    pub fn into_command(self, job_id: JobId) -> Command {
        match self {
            CommandRequest::SendEmail { to, subject, body } => SendEmail {
                job_id,
                to,
                subject,
                body,
            }
            .into(),
            CommandRequest::SendSms {
                phone_number,
                message,
            } => SendSms {
                job_id,
                phone_number,
                message,
            }
            .into(),
            CommandRequest::GenerateReport {
                report_type,
                from,
                to,
            } => GenerateReport {
                job_id,
                report_type,
                from,
                to,
            }
            .into(),
            CommandRequest::UserRegistered {
                email,
                phone_number,
                full_name,
            } => UserRegistered {
                job_id,
                email,
                phone_number,
                full_name,
            }
            .into(),
        }
    }
}

fn non_empty(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(())
}

fn email(field: &'static str, value: &str) -> ValidationResult<()> {
    non_empty(field, value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::invalid_email(field, value)),
    }
}
