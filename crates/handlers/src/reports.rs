//! Report generation (simulated).

use std::time::Duration;

use async_trait::async_trait;
use jobline_core::GenerateReport;
use jobline_infra::command_dispatcher::{CommandHandler, HandlerContext};
use tracing::{info, warn};

use crate::simulate;

/// Generates a report over `[from, to]`.
#[derive(Debug, Clone)]
pub struct GenerateReportHandler {
    latency: Duration,
}

impl GenerateReportHandler {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl CommandHandler<GenerateReport> for GenerateReportHandler {
    async fn handle(&self, command: GenerateReport, ctx: &HandlerContext) -> anyhow::Result<()> {
        info!(
            job_id = %command.job_id,
            report_type = %command.report_type,
            from = %command.from,
            to = %command.to,
            "generating report"
        );

        if let Err(e) = simulate(self.latency, ctx, "report generation").await {
            warn!(
                job_id = %command.job_id,
                report_type = %command.report_type,
                "report generation interrupted"
            );
            return Err(e);
        }

        info!(job_id = %command.job_id, report_type = %command.report_type, "report generated");
        Ok(())
    }
}
