//! Tracing and logging setup shared by the pipeline binaries.

/// Initialize process-wide logging in the given format.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(format: LogFormat) {
    tracing::init(format);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{LogFormat, UnknownLogFormat};
