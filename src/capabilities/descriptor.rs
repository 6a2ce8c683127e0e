//! Capability descriptor — the closed, tagged identity every extension
//! declares at registration.
//!
//! Example YAML manifest:
//! ```yaml
//! capability:
//!   id: "camera_viewer"
//!   name: "Camera viewer"
//!   version: "1.2.0"
//!   intents: ["camera", "snapshot"]
//!   priority: 80
//!   scope: local
//! ```

use serde::{Deserialize, Serialize};

use crate::context::Scope;

/// Identity and routing metadata of one capability.
///
/// Priority is mandatory and totally ordered: higher values are tried first
/// during triage, ties fall back to registration order. A catch-all
/// capability declares itself with the explicit `catch_all` flag and is
/// always tried after every specialist, whatever its number says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Stable identity, unique within a registry.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Semantic version of the extension.
    pub version: String,
    /// Opaque intent tags for tag-based lookup, distinct from free-text triage.
    #[serde(default)]
    pub intents: Vec<String>,
    /// Triage order, higher first.
    pub priority: i32,
    /// Explicit catch-all sentinel; sorts after all non-catch-all entries.
    #[serde(default)]
    pub catch_all: bool,
    /// Access class this capability requires.
    #[serde(default = "default_scope")]
    pub scope: Scope,
}

fn default_scope() -> Scope {
    Scope::Local
}

impl CapabilityDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            intents: Vec::new(),
            priority: 0,
            catch_all: false,
            scope: Scope::Local,
        }
    }

    pub fn with_intents<I, S>(mut self, intents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.intents = intents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Mark as the explicit catch-all sentinel.
    pub fn as_catch_all(mut self) -> Self {
        self.catch_all = true;
        self
    }

    /// Whether this capability declares the given intent tag.
    pub fn declares_intent(&self, tag: &str) -> bool {
        self.intents.iter().any(|t| t == tag)
    }

    /// Parse a descriptor from a YAML manifest (nested under `capability:`).
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let wrapper: DescriptorWrapper = serde_yaml::from_str(yaml)?;
        Ok(wrapper.capability)
    }
}

#[derive(Debug, Deserialize)]
struct DescriptorWrapper {
    capability: CapabilityDescriptor,
}
