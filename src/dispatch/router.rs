//! The dispatcher: scope narrowing, priority-ordered self-assessment, and
//! the error-normalizing execution boundary.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::capabilities::{Capability, CapabilityRegistry, CapabilityResult};
use crate::context::{ExecutionContext, Scope};

/// What a dispatch produced: which capability ran, and its (always
/// normalized) result.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub capability_id: String,
    pub result: CapabilityResult,
}

/// Resolves free text to one capability and runs it exactly once.
///
/// Resolution order is strict and first-match-wins: an explicit leading
/// scope token narrows the candidate set, then candidates are scanned in
/// priority order (catch-alls last) until one claims the query. The
/// dispatcher never retries and imposes no timeout; both are each
/// capability's own business.
pub struct Dispatcher {
    registry: Arc<CapabilityRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this dispatcher routes over.
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Route a query. `None` means nothing was dispatched: the trimmed
    /// query was empty or no capability claimed it.
    pub async fn dispatch(&self, input: &str, ctx: &ExecutionContext) -> Option<DispatchOutcome> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            log::debug!("[dispatch] empty query, nothing to do");
            return None;
        }

        let (scope, query) = strip_scope_prefix(trimmed, ctx.scope);
        if query.is_empty() {
            log::debug!("[dispatch] query was only a scope token, nothing to do");
            return None;
        }
        let ctx = ctx.narrowed_to(scope);

        let selected = self.triage(query, &ctx)?;
        let id = selected.descriptor().id.clone();
        log::debug!("[dispatch] '{id}' claimed the query (scope {scope})");

        let result = self.run_boundary(&selected, query, &ctx).await;
        Some(DispatchOutcome {
            capability_id: id,
            result,
        })
    }

    /// Scan candidates in triage order and return the first claimant.
    fn triage(&self, query: &str, ctx: &ExecutionContext) -> Option<Arc<dyn Capability>> {
        let mut candidates: Vec<Arc<dyn Capability>> = self
            .registry
            .get_all()
            .into_iter()
            .filter(|c| ctx.scope.permits(c.descriptor().scope))
            .collect();

        // Catch-alls sort after every specialist regardless of their number;
        // within each group higher priority first, ties keep registration
        // order (stable sort).
        candidates.sort_by_key(|c| {
            let d = c.descriptor();
            (d.catch_all, std::cmp::Reverse(d.priority))
        });

        for candidate in candidates {
            if candidate.can_handle(query, ctx) {
                return Some(candidate);
            }
        }
        log::debug!("[dispatch] no capability claimed the query");
        None
    }

    /// The boundary where failures become values: run `execute` exactly
    /// once and convert an `Err` or a panic into a `status=Error` result,
    /// so one faulty capability cannot crash the host loop.
    pub async fn run_boundary(
        &self,
        capability: &Arc<dyn Capability>,
        query: &str,
        ctx: &ExecutionContext,
    ) -> CapabilityResult {
        let id = &capability.descriptor().id;
        let started = Instant::now();

        match AssertUnwindSafe(capability.execute(query, ctx))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                log::warn!("[dispatch] '{id}' failed: {err}");
                CapabilityResult::error(err.to_string())
                    .with_duration(started.elapsed().as_millis() as u64)
            }
            Err(panic) => {
                let message = panic_message(panic);
                log::error!("[dispatch] '{id}' panicked: {message}");
                CapabilityResult::error(format!("capability '{id}' crashed: {message}"))
                    .with_duration(started.elapsed().as_millis() as u64)
            }
        }
    }
}

/// Split an explicit leading scope token off the query. The token can only
/// narrow the context's grant, never widen it.
fn strip_scope_prefix(query: &str, granted: Scope) -> (Scope, &str) {
    let mut parts = query.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    match Scope::parse_token(head) {
        Some(requested) => {
            let rest = parts.next().unwrap_or_default().trim_start();
            (granted.narrowed_to(requested), rest)
        }
        None => (granted, query),
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
