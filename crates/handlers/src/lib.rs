//! Reference command handlers.
//!
//! Each handler simulates its side effect with a fixed latency and logs what it
//! would have done. The simulated work observes the shutdown signal: if it
//! fires first, the handler fails and its job is recorded as Failed.
//! `register_all` wires one handler per command variant.

use std::time::Duration;

use jobline_core::{GenerateReport, SendEmail, SendSms, UserRegistered};
use jobline_infra::command_dispatcher::{DispatcherBuilder, HandlerContext, RegistryError};

pub mod notifications;
pub mod reports;
pub mod users;

pub use notifications::{SendEmailHandler, SendSmsHandler};
pub use reports::GenerateReportHandler;
pub use users::UserRegisteredHandler;

/// Simulated latencies for the reference handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerConfig {
    pub email_latency: Duration,
    pub sms_latency: Duration,
    pub report_latency: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            email_latency: Duration::from_millis(800),
            sms_latency: Duration::from_millis(600),
            report_latency: Duration::from_millis(1500),
        }
    }
}

impl HandlerConfig {
    /// All latencies zero; for tests.
    pub fn instant() -> Self {
        Self {
            email_latency: Duration::ZERO,
            sms_latency: Duration::ZERO,
            report_latency: Duration::ZERO,
        }
    }
}

/// Wait out `latency`, failing with "<activity> interrupted by shutdown" if
/// the shutdown signal fires first.
pub(crate) async fn simulate(
    latency: Duration,
    ctx: &HandlerContext,
    activity: &str,
) -> anyhow::Result<()> {
    tokio::select! {
        biased;
        _ = ctx.shutdown().cancelled() => {
            Err(anyhow::anyhow!("{activity} interrupted by shutdown"))
        }
        _ = tokio::time::sleep(latency) => Ok(()),
    }
}

/// Register the reference handler for every command variant.
pub fn register_all(
    builder: &mut DispatcherBuilder,
    config: &HandlerConfig,
) -> Result<(), RegistryError> {
    builder
        .register::<SendEmail, _>(SendEmailHandler::new(config.email_latency))?
        .register::<SendSms, _>(SendSmsHandler::new(config.sms_latency))?
        .register::<GenerateReport, _>(GenerateReportHandler::new(config.report_latency))?
        .register::<UserRegistered, _>(UserRegisteredHandler)?;
    Ok(())
}
