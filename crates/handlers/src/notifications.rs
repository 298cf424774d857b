//! Email and SMS delivery (simulated).

use std::time::Duration;

use async_trait::async_trait;
use jobline_core::{SendEmail, SendSms};
use jobline_infra::command_dispatcher::{CommandHandler, HandlerContext};
use tracing::{info, warn};

use crate::simulate;

#[derive(Debug, Clone)]
pub struct SendEmailHandler {
    latency: Duration,
}

impl SendEmailHandler {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl CommandHandler<SendEmail> for SendEmailHandler {
    async fn handle(&self, command: SendEmail, ctx: &HandlerContext) -> anyhow::Result<()> {
        info!(
            job_id = %command.job_id,
            to = %command.to,
            subject = %command.subject,
            "sending email"
        );
        if let Err(e) = simulate(self.latency, ctx, "email delivery").await {
            warn!(job_id = %command.job_id, to = %command.to, "email not sent");
            return Err(e);
        }
        info!(job_id = %command.job_id, to = %command.to, "email sent");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SendSmsHandler {
    latency: Duration,
}

impl SendSmsHandler {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl CommandHandler<SendSms> for SendSmsHandler {
    async fn handle(&self, command: SendSms, ctx: &HandlerContext) -> anyhow::Result<()> {
        info!(
            job_id = %command.job_id,
            phone_number = %command.phone_number,
            message = %command.message,
            "sending sms"
        );
        if let Err(e) = simulate(self.latency, ctx, "sms delivery").await {
            warn!(job_id = %command.job_id, phone_number = %command.phone_number, "sms not sent");
            return Err(e);
        }
        info!(job_id = %command.job_id, phone_number = %command.phone_number, "sms sent");
        Ok(())
    }
}
