//! Command dispatch: route a command to the one handler registered for its
//! variant.
//!
//! ## Dispatch table
//!
//! The `CommandDispatcher` owns a `CommandKind -> handler` table built once at
//! startup through `DispatcherBuilder` and read-only afterwards:
//!
//! ```text
//! Command
//!   ↓  kind()
//! CommandKind ──lookup──> erased handler
//!   ↓                       ↓ from_command()
//! HandlerNotFound        typed CommandHandler<C>::handle(C, ctx)
//! ```
//!
//! Handlers are written against a concrete payload (`SendSms`, ...). The table
//! stores them type-erased so the dispatcher never switches over variants:
//! adding a command means adding a registration, not touching this module.
//!
//! ## Error semantics
//!
//! - **No handler**: `DispatchError::HandlerNotFound`. A configuration error
//!   that fails the job, never the process.
//! - **Handler failure**: `DispatchError::Handler` carrying the handler's
//!   message verbatim.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use jobline_core::{Command, CommandKind, CommandPayload};
use tokio_util::sync::CancellationToken;

use crate::submit::CommandSubmitter;

/// What a handler gets besides its command.
#[derive(Clone)]
pub struct HandlerContext {
    shutdown: CancellationToken,
    submitter: CommandSubmitter,
}

impl HandlerContext {
    pub fn new(shutdown: CancellationToken, submitter: CommandSubmitter) -> Self {
        Self {
            shutdown,
            submitter,
        }
    }

    /// Process-wide shutdown signal. Handlers may observe it; the worker never
    /// forces them to stop.
    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Producer capability for follow-up commands (fan-out).
    pub fn submitter(&self) -> &CommandSubmitter {
        &self.submitter
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Handles one command variant.
///
/// Handlers are black boxes to the pipeline: they either complete or fail with
/// a message. There is no retry, so a failure is final for that job.
#[async_trait]
pub trait CommandHandler<C: CommandPayload>: Send + Sync + 'static {
    async fn handle(&self, command: C, ctx: &HandlerContext) -> anyhow::Result<()>;
}

#[async_trait]
trait ErasedHandler: Send + Sync {
    async fn call(&self, command: Command, ctx: &HandlerContext) -> anyhow::Result<()>;
}

struct Registered<C, H> {
    handler: H,
    _payload: PhantomData<fn() -> C>,
}

#[async_trait]
impl<C, H> ErasedHandler for Registered<C, H>
where
    C: CommandPayload,
    H: CommandHandler<C>,
{
    async fn call(&self, command: Command, ctx: &HandlerContext) -> anyhow::Result<()> {
        let kind = command.kind();
        let payload = C::from_command(command).ok_or_else(|| {
            anyhow::anyhow!("handler for {} received a {} command", C::KIND, kind)
        })?;
        self.handler.handle(payload, ctx).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// No handler registered for the command's variant.
    #[error("no handler registered for variant {0}")]
    HandlerNotFound(CommandKind),
    /// The handler ran and failed.
    #[error("{0}")]
    Handler(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a handler is already registered for variant {0}")]
    DuplicateHandler(CommandKind),
}

/// Collects `{variant -> handler}` registrations at startup.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<CommandKind, Arc<dyn ErasedHandler>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for payload type `C`.
    pub fn register<C, H>(&mut self, handler: H) -> Result<&mut Self, RegistryError>
    where
        C: CommandPayload,
        H: CommandHandler<C>,
    {
        if self.handlers.contains_key(&C::KIND) {
            return Err(RegistryError::DuplicateHandler(C::KIND));
        }
        let erased = Registered::<C, H> {
            handler,
            _payload: PhantomData,
        };
        self.handlers.insert(C::KIND, Arc::new(erased));
        Ok(self)
    }

    pub fn build(self) -> CommandDispatcher {
        CommandDispatcher {
            handlers: self.handlers,
        }
    }
}

/// Read-only dispatch table.
pub struct CommandDispatcher {
    handlers: HashMap<CommandKind, Arc<dyn ErasedHandler>>,
}

impl CommandDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Invoke the handler registered for `command`'s variant.
    pub async fn dispatch(
        &self,
        command: Command,
        ctx: &HandlerContext,
    ) -> Result<(), DispatchError> {
        let kind = command.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or(DispatchError::HandlerNotFound(kind))?;

        handler
            .call(command, ctx)
            .await
            .map_err(|e| DispatchError::Handler(e.to_string()))
    }

    pub fn is_registered(&self, kind: CommandKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn registered_kinds(&self) -> Vec<CommandKind> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("handlers", &self.registered_kinds())
            .finish()
    }
}
