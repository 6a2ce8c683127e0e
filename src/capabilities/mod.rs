//! The capability contract and its registry — the boundary every extension
//! implements and the single owner of the registered set.

pub mod contract;
pub mod descriptor;
pub mod registry;
pub mod result;

pub use contract::{Capability, CapabilityError, CapabilityLifecycle};
pub use descriptor::CapabilityDescriptor;
pub use registry::{CapabilityRegistry, RegistryError};
pub use result::{CapabilityResult, ContentBlock, ResultMetadata, ResultStatus};
