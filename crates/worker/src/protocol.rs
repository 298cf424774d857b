//! JSON-lines front end.
//!
//! One request object per input line, one response object per output line:
//!
//! ```text
//! {"op":"submit","command":{"type":"send_sms","phone_number":"+1000","message":"hi"}}
//! {"job_id":"0190...","status_url":"/api/jobs/0190..."}
//! {"op":"status","job_id":"0190..."}
//! {"id":"0190...","command_name":"SendSmsCommand","status":"succeeded",...}
//! {"op":"stats"}
//! {"jobs":{"queued":0,...},"worker":{"jobs_processed":1,...}}
//! ```
//!
//! Any problem with a line is answered with `{"error":"..."}`.

use jobline_core::{CommandRequest, JobId};
use jobline_infra::jobs::{JobRecord, JobStats};
use jobline_infra::workers::WorkerStats;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::App;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Submit { command: CommandRequest },
    Status { job_id: String },
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Accepted { job_id: JobId, status_url: String },
    Job(JobRecord),
    Stats { jobs: JobStats, worker: WorkerStats },
    Error { error: String },
}

impl Response {
    pub fn accepted(job_id: JobId) -> Self {
        Response::Accepted {
            job_id,
            status_url: format!("/api/jobs/{job_id}"),
        }
    }

    pub fn error(error: impl ToString) -> Self {
        Response::Error {
            error: error.to_string(),
        }
    }
}

/// Answer one request.
pub fn handle(app: &App, request: Request) -> Response {
    match request {
        Request::Submit { command } => match app.submit(command) {
            Ok(job_id) => Response::accepted(job_id),
            Err(e) => Response::error(e),
        },
        Request::Status { job_id } => {
            let job_id = match job_id.parse::<JobId>() {
                Ok(id) => id,
                Err(e) => return Response::error(e),
            };
            match app.status(job_id) {
                Some(job) => Response::Job(job),
                None => Response::error(format!("job {job_id} not found")),
            }
        }
        Request::Stats => Response::Stats {
            jobs: app.stats(),
            worker: app.worker_stats(),
        },
    }
}

/// Parse one input line, answer it, and render the response line.
pub fn handle_line(app: &App, line: &str) -> String {
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(app, request),
        Err(e) => {
            debug!(error = %e, "malformed request line");
            Response::error(format!("malformed request: {e}"))
        }
    };

    serde_json::to_string(&response)
        .unwrap_or_else(|e| format!("{{\"error\":\"response serialization failed: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use jobline_handlers::HandlerConfig;
    use serde_json::{Value, json};

    use super::*;
    use crate::config::WorkerConfig;

    fn app() -> App {
        App::start(&WorkerConfig {
            handlers: HandlerConfig::instant(),
            ..WorkerConfig::default()
        })
        .unwrap()
    }

    fn call(app: &App, request: Value) -> Value {
        serde_json::from_str(&handle_line(app, &request.to_string())).unwrap()
    }

    #[test]
    fn parses_requests() {
        let req: Request = serde_json::from_value(json!({
            "op": "submit",
            "command": {"type": "send_email", "to": "a@b.c", "subject": "s", "body": "b"}
        }))
        .unwrap();
        assert!(matches!(req, Request::Submit { command: CommandRequest::SendEmail { .. } }));

        let req: Request = serde_json::from_value(json!({"op": "stats"})).unwrap();
        assert_eq!(req, Request::Stats);
    }

    #[tokio::test]
    async fn submit_returns_job_id_and_status_url() {
        let app = app();

        let resp = call(
            &app,
            json!({
                "op": "submit",
                "command": {"type": "send_sms", "phone_number": "+1000", "message": "hi"}
            }),
        );
        let job_id = resp["job_id"].as_str().unwrap().to_string();
        assert_eq!(resp["status_url"], format!("/api/jobs/{job_id}"));

        let status = call(&app, json!({"op": "status", "job_id": job_id}));
        assert_eq!(status["id"], job_id);
        assert_eq!(status["command_name"], "SendSmsCommand");

        app.shutdown().await;
    }

    #[tokio::test]
    async fn errors_are_reported_inline() {
        let app = app();

        let resp: Value = serde_json::from_str(&handle_line(&app, "not json")).unwrap();
        assert!(resp["error"].as_str().unwrap().starts_with("malformed request"));

        let resp = call(&app, json!({"op": "status", "job_id": "nope"}));
        assert!(resp["error"].is_string());

        let missing = JobId::new();
        let resp = call(&app, json!({"op": "status", "job_id": missing.to_string()}));
        assert_eq!(resp["error"], format!("job {missing} not found"));

        let resp = call(
            &app,
            json!({
                "op": "submit",
                "command": {"type": "send_email", "to": "nobody", "subject": "s", "body": "b"}
            }),
        );
        assert!(resp["error"].is_string());
        assert_eq!(app.stats().total(), 0);

        app.shutdown().await;
    }
}
