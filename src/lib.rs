//! # attendant
//!
//! Dispatch-and-state core for an extensible natural-language assistant.
//!
//! Given free text, the core selects exactly one capability provider among
//! independently authored extensions, invokes it through a uniform contract,
//! and maintains an auditable, exactly-reconstructible conversation history
//! in an append-only event store. Capabilities themselves (cameras, SSH,
//! email, search, probing) live outside this crate and reach it only
//! through the [`Capability`] contract.

pub mod bus;
pub mod capabilities;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod events;
pub mod queries;
pub mod runtime;
pub mod strategies;

pub use bus::{BusError, CommandBus, CommandEnvelope};
pub use capabilities::{
    Capability, CapabilityDescriptor, CapabilityError, CapabilityLifecycle, CapabilityRegistry,
    CapabilityResult, ContentBlock, RegistryError, ResultMetadata, ResultStatus,
};
pub use commands::{CommandError, MessageIdAllocator};
pub use config::{AssistantConfig, CameraConfig, ConfigError};
pub use context::{noop_invoker, ExecutionContext, PrivilegedInvoker, Scope};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use events::{
    ChatMessage, ConversationAggregate, ConversationState, DomainEvent, EventStore, MessagePatch,
    RawEvent, Role, SubscriberId,
};
pub use queries::{GetMessagesQuery, GetTranscriptQuery};
pub use runtime::AssistantRuntime;
pub use strategies::{Strategy, StrategyChain, StrategyError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize env-filtered logging for binaries and demos. Safe to call
/// more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}
