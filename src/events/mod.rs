//! Conversation event sourcing: domain events, the append-only store, and
//! the projected aggregate.
//!
//! The event store is the sole mutation surface for conversation state.
//! Commands append events; the aggregate folds them into the materialized
//! message list; queries read that projection.

pub mod aggregate;
pub mod domain_event;
pub mod event_store;

pub use aggregate::{project, ConversationAggregate, ConversationState};
pub use domain_event::{ChatMessage, DomainEvent, MessagePatch, RawEvent, Role};
pub use event_store::{EventStore, SubscriberId};
