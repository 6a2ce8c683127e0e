//! The capability contract — the mandatory boundary for every extension.

use async_trait::async_trait;
use thiserror::Error;

use super::descriptor::CapabilityDescriptor;
use super::result::CapabilityResult;
use crate::context::ExecutionContext;

/// Failure modes a capability may surface from `execute` or its lifecycle
/// hooks. Whatever escapes is still normalized at the dispatch boundary.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("privileged call failed: {0}")]
    Privileged(String),

    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The contract every extension implements.
///
/// `can_handle` is the self-assessment used during free-text triage: it must
/// be pure, fast, and free of I/O; the dispatcher calls it on every
/// candidate for every query. `execute` may perform I/O and is invoked
/// exactly once per dispatch; a capability wanting internal retry semantics
/// layers its own [`crate::strategies::StrategyChain`].
#[async_trait]
pub trait Capability: Send + Sync {
    /// Identity and routing metadata.
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Self-assessment: does this capability claim the query?
    fn can_handle(&self, input: &str, ctx: &ExecutionContext) -> bool;

    /// Perform the work. Prefer returning a `status=Error` result over an
    /// `Err`; it lets the capability attach recovery hints.
    ///
    /// Not cancellable once started: a caller that stops caring about the
    /// result must ignore it rather than abort it. Timeouts are the
    /// capability's own responsibility.
    async fn execute(
        &self,
        input: &str,
        ctx: &ExecutionContext,
    ) -> Result<CapabilityResult, CapabilityError>;

    /// Optional lifecycle hooks. `None` means the capability needs no
    /// startup or teardown work; callers check explicitly instead of
    /// probing the object's shape.
    fn lifecycle(&self) -> Option<&dyn CapabilityLifecycle> {
        None
    }
}

/// Optional startup/teardown hooks a capability may expose.
#[async_trait]
pub trait CapabilityLifecycle: Send + Sync {
    /// Called once, before the capability's first dispatch.
    async fn initialize(&self, _ctx: &ExecutionContext) -> Result<(), CapabilityError> {
        Ok(())
    }

    /// Called once at teardown. Must tolerate being called without a prior
    /// `initialize`.
    async fn dispose(&self) -> Result<(), CapabilityError> {
        Ok(())
    }
}
