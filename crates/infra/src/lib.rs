//! Infrastructure layer: job store, command queue, dispatcher and worker loop.

pub mod command_dispatcher;
pub mod jobs;
pub mod queue;
pub mod submit;
pub mod workers;
