//! Process configuration from `JOBLINE_*` environment variables.
//!
//! | Variable                     | Default          |
//! |------------------------------|------------------|
//! | `JOBLINE_WORKER_NAME`        | `command-worker` |
//! | `JOBLINE_QUEUE_CAPACITY`     | `0` (unbounded)  |
//! | `JOBLINE_EMAIL_LATENCY_MS`   | `800`            |
//! | `JOBLINE_SMS_LATENCY_MS`     | `600`            |
//! | `JOBLINE_REPORT_LATENCY_MS`  | `1500`           |
//! | `JOBLINE_LOG_FORMAT`         | `json`           |
//!
//! Unset or empty variables take the default; malformed values are errors.

use std::time::Duration;

use jobline_handlers::HandlerConfig;
use jobline_infra::queue::QueueCapacity;
use jobline_infra::workers::CommandWorkerConfig;
use jobline_observability::LogFormat;

pub const WORKER_NAME: &str = "JOBLINE_WORKER_NAME";
pub const QUEUE_CAPACITY: &str = "JOBLINE_QUEUE_CAPACITY";
pub const EMAIL_LATENCY_MS: &str = "JOBLINE_EMAIL_LATENCY_MS";
pub const SMS_LATENCY_MS: &str = "JOBLINE_SMS_LATENCY_MS";
pub const REPORT_LATENCY_MS: &str = "JOBLINE_REPORT_LATENCY_MS";
pub const LOG_FORMAT: &str = "JOBLINE_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkerConfig {
    pub worker: CommandWorkerConfig,
    pub queue_capacity: QueueCapacity,
    pub handlers: HandlerConfig,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let worker = match get(WORKER_NAME) {
            Some(name) => defaults.worker.clone().with_name(name.trim()),
            None => defaults.worker.clone(),
        };

        let queue_capacity = match get(QUEUE_CAPACITY) {
            Some(raw) => {
                QueueCapacity::from_limit(parse_number(QUEUE_CAPACITY, &raw, "queue capacity")?)
            }
            None => defaults.queue_capacity,
        };

        let latency = |var: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match get(var) {
                Some(raw) => {
                    parse_number(var, &raw, "latency in milliseconds").map(Duration::from_millis)
                }
                None => Ok(default),
            }
        };
        let handlers = HandlerConfig {
            email_latency: latency(EMAIL_LATENCY_MS, defaults.handlers.email_latency)?,
            sms_latency: latency(SMS_LATENCY_MS, defaults.handlers.sms_latency)?,
            report_latency: latency(REPORT_LATENCY_MS, defaults.handlers.report_latency)?,
        };

        let log_format = match get(LOG_FORMAT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: LOG_FORMAT,
                value: raw,
                expected: "log format (json or text)",
            })?,
            None => defaults.log_format,
        };

        Ok(Self {
            worker,
            queue_capacity,
            handlers,
            log_format,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    var: &'static str,
    raw: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        expected,
    })
}
