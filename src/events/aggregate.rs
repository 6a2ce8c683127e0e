//! Conversation projection: a pure fold from the event log to the
//! materialized message list.
//!
//! The projector is total. Unknown or extended tags are no-ops, a
//! `message_updated` for an absent id is a no-op, and incrementally applying
//! each event is observably equivalent to replaying the whole log from
//! empty.

use parking_lot::RwLock;
use serde::Serialize;

use super::domain_event::{ChatMessage, DomainEvent};

/// The materialized conversation view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
}

/// Fold one event into the state. Pure and total: no event is an error.
pub fn project(state: &mut ConversationState, event: &DomainEvent) {
    match event {
        DomainEvent::MessageAdded(message) => state.messages.push(message.clone()),
        DomainEvent::MessageUpdated { id, patch } => {
            if let Some(message) = state.messages.iter_mut().find(|m| m.id == *id) {
                patch.apply_to(message);
            }
        }
        DomainEvent::ChatCleared => state.messages.clear(),
        // Extended and unknown tags do not shape the message list.
        _ => {}
    }
}

/// Owns the cached projection and its incremental update.
#[derive(Default)]
pub struct ConversationAggregate {
    state: RwLock<ConversationState>,
}

impl ConversationAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incrementally fold one event into the cached state.
    pub fn apply(&self, event: &DomainEvent) {
        project(&mut self.state.write(), event);
    }

    /// Rebuild the cached state from scratch out of a full event sequence.
    pub fn replay<'a>(&self, events: impl IntoIterator<Item = &'a DomainEvent>) {
        let mut state = ConversationState::default();
        for event in events {
            project(&mut state, event);
        }
        *self.state.write() = state;
    }

    /// Read-only snapshot of the projected message list.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().messages.clone()
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> ConversationState {
        self.state.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::domain_event::{MessagePatch, RawEvent, Role};
    use serde_json::json;

    fn added(id: u64, role: Role, text: &str) -> DomainEvent {
        DomainEvent::MessageAdded(ChatMessage::new(id, role, text))
    }

    fn sample_log() -> Vec<DomainEvent> {
        vec![
            added(1, Role::User, "show the garage camera"),
            added(2, Role::Assistant, ""),
            DomainEvent::browse_opened("rtsp://garage"),
            DomainEvent::MessageUpdated {
                id: 2,
                patch: MessagePatch::resolved("here is the garage"),
            },
            DomainEvent::Unknown(RawEvent {
                event_type: "firmware_blink".into(),
                payload: Some(json!({ "led": "green" })),
                timestamp: Some(5),
            }),
            added(3, Role::System, "camera stream closed"),
        ]
    }

    #[test]
    fn test_replay_equivalence() {
        let log = sample_log();

        let incremental = ConversationAggregate::new();
        for event in &log {
            incremental.apply(event);
        }

        let replayed = ConversationAggregate::new();
        replayed.replay(&log);

        assert_eq!(incremental.state(), replayed.state());
    }

    #[test]
    fn test_update_merges_onto_existing_message() {
        let aggregate = ConversationAggregate::new();
        aggregate.apply(&added(1, Role::Assistant, ""));
        aggregate.apply(&DomainEvent::MessageUpdated {
            id: 1,
            patch: MessagePatch::resolved("final answer"),
        });

        let messages = aggregate.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "final answer");
        assert!(!messages[0].loading);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let aggregate = ConversationAggregate::new();
        aggregate.apply(&added(1, Role::User, "hi"));
        aggregate.apply(&DomainEvent::MessageUpdated {
            id: 99,
            patch: MessagePatch::resolved("ghost"),
        });
        assert_eq!(aggregate.messages().len(), 1);
        assert_eq!(aggregate.messages()[0].text, "hi");
    }

    #[test]
    fn test_chat_cleared_empties_regardless_of_history() {
        let aggregate = ConversationAggregate::new();
        for event in sample_log() {
            aggregate.apply(&event);
        }
        aggregate.apply(&DomainEvent::ChatCleared);
        assert!(aggregate.messages().is_empty());

        aggregate.apply(&added(10, Role::User, "fresh start"));
        assert_eq!(aggregate.messages().len(), 1);
    }

    #[test]
    fn test_projection_restarts_from_empty_after_store_clear() {
        use crate::events::EventStore;

        let store = EventStore::new();
        store.append(added(1, Role::User, "before teardown"));
        store.clear();
        store.append(added(2, Role::User, "after teardown"));

        let aggregate = ConversationAggregate::new();
        aggregate.replay(&store.events());
        let messages = aggregate.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "after teardown");
    }

    #[test]
    fn test_extended_and_unknown_tags_are_noops() {
        let aggregate = ConversationAggregate::new();
        aggregate.apply(&DomainEvent::settings_changed(json!({ "tts": false })));
        aggregate.apply(&DomainEvent::Unknown(RawEvent {
            event_type: "meteor_shower".into(),
            payload: None,
            timestamp: None,
        }));
        assert!(aggregate.messages().is_empty());
    }
}
