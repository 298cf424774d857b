use anyhow::Context;
use jobline_worker::{App, WorkerConfig, protocol};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("invalid configuration")?;
    jobline_observability::init(config.log_format);

    let app = App::start(&config).context("failed to build command dispatcher")?;

    let shutdown = app.shutdown_token();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            tracing::info!("input closed, waiting for queued jobs");
            app.wait_idle().await;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut response = protocol::handle_line(&app, &line);
        response.push('\n');
        stdout
            .write_all(response.as_bytes())
            .await
            .context("failed to write stdout")?;
        stdout.flush().await.context("failed to flush stdout")?;
    }

    app.shutdown().await;
    Ok(())
}
