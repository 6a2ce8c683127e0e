//! Capability registry — owns the registered set, preserves registration
//! order, and walks lifecycle hooks.
//!
//! Registration order matters twice: `find_by_intent` returns matches in it,
//! and triage uses it to break priority ties. The registry therefore keeps
//! one ordered list as the primary store; with tens of capabilities, linear
//! identity checks are cheaper than a second index.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use super::contract::{Capability, CapabilityError};
use crate::context::ExecutionContext;

/// Wiring errors around registration. Surfaced loudly: a duplicate id is an
/// integration bug, not a runtime condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("capability already registered: {0}")]
    Duplicate(String),

    #[error("capability not registered: {0}")]
    NotFound(String),
}

/// The single owner of the registered capability set.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<Vec<Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability, preserving insertion order. Rejects an id
    /// already present.
    pub fn register(&self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let id = capability.descriptor().id.clone();
        let mut entries = self.entries.write();
        if entries.iter().any(|c| c.descriptor().id == id) {
            return Err(RegistryError::Duplicate(id));
        }
        log::debug!(
            "[registry] registered '{}' (priority {}, catch_all {})",
            id,
            capability.descriptor().priority,
            capability.descriptor().catch_all
        );
        entries.push(capability);
        Ok(())
    }

    /// Remove a capability by id. Rejects an absent id.
    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|c| c.descriptor().id != id);
        if entries.len() == before {
            return Err(RegistryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Look up a capability by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Capability>> {
        self.entries
            .read()
            .iter()
            .find(|c| c.descriptor().id == id)
            .cloned()
    }

    /// Snapshot of all capabilities in registration order.
    pub fn get_all(&self) -> Vec<Arc<dyn Capability>> {
        self.entries.read().clone()
    }

    /// All capabilities declaring the intent tag, in registration order.
    /// Empty when none match.
    pub fn find_by_intent(&self, tag: &str) -> Vec<Arc<dyn Capability>> {
        self.entries
            .read()
            .iter()
            .filter(|c| c.descriptor().declares_intent(tag))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Run every capability's optional `initialize` hook sequentially in
    /// registration order. A missing hook is a no-op; the first failure
    /// aborts the walk.
    pub async fn initialize_all(&self, ctx: &ExecutionContext) -> Result<(), CapabilityError> {
        for capability in self.get_all() {
            if let Some(lifecycle) = capability.lifecycle() {
                lifecycle.initialize(ctx).await?;
            }
        }
        Ok(())
    }

    /// Run every capability's optional `dispose` hook sequentially in
    /// registration order, then clear the registry. Dispose failures are
    /// logged and do not stop the walk; calling this twice is harmless.
    pub async fn dispose_all(&self) {
        let entries = {
            let mut guard = self.entries.write();
            std::mem::take(&mut *guard)
        };
        for capability in entries {
            if let Some(lifecycle) = capability.lifecycle() {
                if let Err(err) = lifecycle.dispose().await {
                    log::warn!(
                        "[registry] dispose failed for '{}': {}",
                        capability.descriptor().id,
                        err
                    );
                }
            }
        }
    }
}
