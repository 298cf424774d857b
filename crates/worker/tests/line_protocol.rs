//! Drives the `jobline-worker` binary over stdin/stdout.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn start() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_jobline-worker"))
            .env("JOBLINE_EMAIL_LATENCY_MS", "0")
            .env("JOBLINE_SMS_LATENCY_MS", "0")
            .env("JOBLINE_REPORT_LATENCY_MS", "0")
            .env("JOBLINE_LOG_FORMAT", "text")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn jobline-worker");

        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().expect("stdout is piped"));
        Self {
            child,
            stdin,
            stdout,
        }
    }

    fn call(&mut self, request: Value) -> Value {
        let stdin = self.stdin.as_mut().expect("stdin still open");
        writeln!(stdin, "{request}").unwrap();
        stdin.flush().unwrap();

        let mut line = String::new();
        self.stdout.read_line(&mut line).unwrap();
        serde_json::from_str(&line).unwrap_or_else(|e| panic!("bad response {line:?}: {e}"))
    }

    fn wait_for_terminal(&mut self, job_id: &str) -> Value {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.call(json!({"op": "status", "job_id": job_id}));
            if job["status"] == "succeeded" || job["status"] == "failed" {
                return job;
            }
            assert!(Instant::now() < deadline, "job {job_id} never finished: {job}");
            sleep(Duration::from_millis(10));
        }
    }

    fn finish(mut self) {
        drop(self.stdin.take());
        let status = self.child.wait().unwrap();
        assert!(status.success(), "worker exited with {status}");
    }
}

#[test]
fn sms_job_runs_to_success() {
    let mut session = Session::start();

    let accepted = session.call(json!({
        "op": "submit",
        "command": {"type": "send_sms", "phone_number": "+1000", "message": "hi"}
    }));
    let job_id = accepted["job_id"].as_str().unwrap().to_string();
    assert_eq!(accepted["status_url"], format!("/api/jobs/{job_id}"));

    let job = session.wait_for_terminal(&job_id);
    assert_eq!(job["status"], "succeeded");
    assert_eq!(job["command_name"], "SendSmsCommand");
    assert!(job["completed_at"].is_string());
    assert!(job.get("error").is_none());

    session.finish();
}

#[test]
fn user_registration_fans_out() {
    let mut session = Session::start();

    let accepted = session.call(json!({
        "op": "submit",
        "command": {
            "type": "user_registered",
            "email": "ada@example.com",
            "phone_number": "+1000",
            "full_name": "Ada Lovelace"
        }
    }));
    let job_id = accepted["job_id"].as_str().unwrap().to_string();
    assert_eq!(session.wait_for_terminal(&job_id)["status"], "succeeded");

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let stats = session.call(json!({"op": "stats"}));
        if stats["jobs"]["succeeded"] == 3 {
            assert_eq!(stats["jobs"]["failed"], 0);
            break;
        }
        assert!(Instant::now() < deadline, "children never finished: {stats}");
        sleep(Duration::from_millis(10));
    }

    session.finish();
}

#[test]
fn bad_lines_get_error_responses() {
    let mut session = Session::start();

    let resp = session.call(json!({"op": "launch"}));
    assert!(resp["error"].is_string());

    let resp = session.call(json!({
        "op": "submit",
        "command": {
            "type": "generate_report",
            "report_type": "sales",
            "from": "2024-02-01T00:00:00Z",
            "to": "2024-01-01T00:00:00Z"
        }
    }));
    assert!(resp["error"].is_string());

    let stats = session.call(json!({"op": "stats"}));
    assert_eq!(stats["jobs"]["queued"], 0);
    assert_eq!(stats["worker"]["jobs_processed"], 0);

    session.finish();
}
