//! Per-invocation execution context and the scope access model.
//!
//! The context is an immutable, read-only bag constructed by the host for
//! each invocation. Capabilities must not retain it across calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::capabilities::contract::CapabilityError;
use crate::config::AssistantConfig;
use crate::events::EventStore;

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Coarse access-control label narrowing which capabilities are permitted.
///
/// `Internet` is the wider grant and permits `Local` work as well; a
/// `Local`-restricted context refuses internet-reaching capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Local,
    Internet,
}

static SCOPE_TOKENS: Lazy<HashMap<&'static str, Scope>> = Lazy::new(|| {
    HashMap::from([
        ("local", Scope::Local),
        ("lan", Scope::Local),
        ("internet", Scope::Internet),
        ("online", Scope::Internet),
    ])
});

impl Scope {
    /// Parse a leading query token into a scope, case-insensitively.
    pub fn parse_token(token: &str) -> Option<Scope> {
        SCOPE_TOKENS.get(token.to_ascii_lowercase().as_str()).copied()
    }

    /// Whether this grant covers work requiring `required`.
    pub fn permits(self, required: Scope) -> bool {
        match self {
            Scope::Internet => true,
            Scope::Local => required == Scope::Local,
        }
    }

    /// The narrower of two scopes. A query prefix can only restrict the
    /// host's grant, never widen it.
    pub fn narrowed_to(self, requested: Scope) -> Scope {
        if self.permits(requested) {
            requested
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Internet => "internet",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Privileged invoker
// ---------------------------------------------------------------------------

/// Handle through which a capability reaches privileged host operations
/// (file access, process spawning) by name. The host process supplies the
/// implementation; the core only carries it.
pub type PrivilegedInvoker = Arc<
    dyn Fn(&str, Value) -> BoxFuture<'static, Result<Value, CapabilityError>> + Send + Sync,
>;

/// An invoker for hosts with no privileged process attached. Every call
/// fails with [`CapabilityError::Privileged`].
pub fn noop_invoker() -> PrivilegedInvoker {
    Arc::new(|operation, _args| {
        let operation = operation.to_string();
        Box::pin(async move {
            Err(CapabilityError::Privileged(format!(
                "no privileged host attached (operation '{operation}')"
            )))
        })
    })
}

// ---------------------------------------------------------------------------
// ExecutionContext
// ---------------------------------------------------------------------------

/// Read-only bag passed to every capability invocation.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Conversation/session identity.
    pub session_id: Uuid,
    /// True when running inside the privileged host shell rather than a
    /// plain browser/demo environment.
    pub hosted: bool,
    /// Named privileged-operation invoker.
    pub invoker: PrivilegedInvoker,
    /// Domain configuration snapshot (cameras, broker, models).
    pub config: Arc<AssistantConfig>,
    /// Event store handle, for capabilities that stream observations.
    pub store: Arc<EventStore>,
    /// Widest scope this invocation may use.
    pub scope: Scope,
}

impl ExecutionContext {
    pub fn new(
        hosted: bool,
        invoker: PrivilegedInvoker,
        config: Arc<AssistantConfig>,
        store: Arc<EventStore>,
        scope: Scope,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            hosted,
            invoker,
            config,
            store,
            scope,
        }
    }

    /// Copy of this context with a narrower scope. The result never grants
    /// more than `self` did.
    pub fn narrowed_to(&self, requested: Scope) -> Self {
        let mut ctx = self.clone();
        ctx.scope = self.scope.narrowed_to(requested);
        ctx
    }

    /// Run a named privileged operation on the host.
    pub async fn invoke_privileged(
        &self,
        operation: &str,
        args: Value,
    ) -> Result<Value, CapabilityError> {
        (self.invoker)(operation, args).await
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("session_id", &self.session_id)
            .field("hosted", &self.hosted)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
