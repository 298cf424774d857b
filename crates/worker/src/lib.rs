//! Runnable pipeline: configuration, wiring and a JSON-lines front end.

pub mod app;
pub mod config;
pub mod protocol;

pub use app::App;
pub use config::{ConfigError, WorkerConfig};
