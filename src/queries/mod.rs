//! Read-side queries over the conversation aggregate.
//!
//! Queries never trigger capability execution and never append events; they
//! hand out snapshots of the projection and nothing else.

use std::sync::Arc;

use crate::events::{ChatMessage, ConversationAggregate, Role};

/// Returns the projected message list as a read-only snapshot.
pub struct GetMessagesQuery {
    aggregate: Arc<ConversationAggregate>,
}

impl GetMessagesQuery {
    pub fn new(aggregate: Arc<ConversationAggregate>) -> Self {
        Self { aggregate }
    }

    pub fn execute(&self) -> Vec<ChatMessage> {
        self.aggregate.messages()
    }
}

/// Renders the projected conversation as role-tagged plain text.
///
/// Messages still loading are elided: a half-resolved placeholder is not
/// transcript material.
pub struct GetTranscriptQuery {
    aggregate: Arc<ConversationAggregate>,
}

impl GetTranscriptQuery {
    pub fn new(aggregate: Arc<ConversationAggregate>) -> Self {
        Self { aggregate }
    }

    pub fn execute(&self) -> String {
        self.aggregate
            .messages()
            .iter()
            .filter(|m| !m.loading)
            .map(|m| format!("[{}] {}", role_tag(m.role), m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}
