//! Command model.
//!
//! A [`Command`] is an immutable description of one unit of background work.
//! Every variant carries the [`JobId`] of the job record that tracks it, so
//! the processing side can report progress without a side table.
//!
//! Routing is done on the [`CommandKind`] discriminator rather than on the
//! payload type: the dispatcher keeps a `CommandKind -> handler` table, and
//! adding a variant means adding it to `commands!` below plus registering a
//! handler. Dispatch logic itself never matches on variants.

use chrono::{DateTime, Utc};

use crate::id::JobId;

/// A typed command payload that can be lifted into and out of [`Command`].
///
/// Implemented for every payload struct by `commands!`; handlers are written
/// against the concrete payload and the dispatcher erases the type.
pub trait CommandPayload: Clone + core::fmt::Debug + Send + Sync + Into<Command> + 'static {
    /// Discriminator used to route this payload.
    const KIND: CommandKind;

    /// Job tracking this command.
    fn job_id(&self) -> JobId;

    /// Recover the concrete payload, or `None` when the variant differs.
    fn from_command(command: Command) -> Option<Self>;
}

macro_rules! commands {
    ($($variant:ident => $tag:literal, $name:literal;)+) => {
        /// Discriminator of a [`Command`] variant.
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "snake_case")]
        pub enum CommandKind {
            $($variant,)+
        }

        impl CommandKind {
            /// Every known kind, in declaration order.
            pub const ALL: &'static [CommandKind] = &[$(CommandKind::$variant,)+];

            /// Wire tag (`send_email`, `send_sms`, ...).
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(CommandKind::$variant => $tag,)+
                }
            }

            /// Name recorded on job records (`SendEmailCommand`, ...).
            pub fn command_name(&self) -> &'static str {
                match self {
                    $(CommandKind::$variant => $name,)+
                }
            }
        }

        /// Unit of background work.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Command {
            $($variant($variant),)+
        }

        impl Command {
            pub fn kind(&self) -> CommandKind {
                match self {
                    $(Command::$variant(_) => CommandKind::$variant,)+
                }
            }

            pub fn job_id(&self) -> JobId {
                match self {
                    $(Command::$variant(c) => c.job_id,)+
                }
            }
        }

        $(
            impl From<$variant> for Command {
                fn from(value: $variant) -> Self {
                    Command::$variant(value)
                }
            }

            impl CommandPayload for $variant {
                const KIND: CommandKind = CommandKind::$variant;

                fn job_id(&self) -> JobId {
                    self.job_id
                }

                #[allow(unreachable_patterns)]
                fn from_command(command: Command) -> Option<Self> {
                    match command {
                        Command::$variant(c) => Some(c),
                        _ => None,
                    }
                }
            }
        )+
    };
}

commands! {
    SendEmail => "send_email", "SendEmailCommand";
    SendSms => "send_sms", "SendSmsCommand";
    GenerateReport => "generate_report", "GenerateReportCommand";
    UserRegistered => "user_registered", "UserRegisteredCommand";
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Send a transactional e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendEmail {
    pub job_id: JobId,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Send a text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendSms {
    pub job_id: JobId,
    pub phone_number: String,
    pub message: String,
}

/// Generate a report over a time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub job_id: JobId,
    pub report_type: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// A user finished registration; fans out welcome notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRegistered {
    pub job_id: JobId,
    pub email: String,
    pub phone_number: String,
    pub full_name: String,
}
