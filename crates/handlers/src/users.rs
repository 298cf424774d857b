//! User lifecycle reactions.

use async_trait::async_trait;
use jobline_core::{SendEmail, SendSms, UserRegistered};
use jobline_infra::command_dispatcher::{CommandHandler, HandlerContext};
use tracing::info;

/// Greets a newly registered user by SMS and email.
///
/// The greetings are submitted as independent jobs; this job succeeds once both
/// are queued, regardless of how they later turn out.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserRegisteredHandler;

#[async_trait]
impl CommandHandler<UserRegistered> for UserRegisteredHandler {
    async fn handle(&self, command: UserRegistered, ctx: &HandlerContext) -> anyhow::Result<()> {
        let submitter = ctx.submitter();

        let sms_job = submitter.submit(|job_id| SendSms {
            job_id,
            phone_number: command.phone_number.clone(),
            message: format!("Welcome {}! Your account is ready.", command.full_name),
        })?;

        let email_job = submitter.submit(|job_id| SendEmail {
            job_id,
            to: command.email.clone(),
            subject: "Welcome!".to_string(),
            body: format!("Hi {}, welcome to our platform.", command.full_name),
        })?;

        info!(
            job_id = %command.job_id,
            sms_job = %sms_job,
            email_job = %email_job,
            "welcome notifications queued"
        );
        Ok(())
    }
}
