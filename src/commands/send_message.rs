//! The send-message orchestration: user fact in, routed execution, result
//! fact out.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::dispatch::Dispatcher;
use crate::events::{ChatMessage, DomainEvent, EventStore, MessagePatch, Role};

use super::{CommandError, MessageIdAllocator, CMD_SEND_MESSAGE};

/// Handles one user utterance end to end.
///
/// Appends `message_added{user}`, then a loading assistant placeholder,
/// routes the text through the dispatcher, and resolves the placeholder
/// with `message_updated` once the result (or its absence) is known. Both
/// ids are allocated before the first await, so two utterances in flight
/// can resolve in either order without colliding.
pub struct SendMessageCommand {
    store: Arc<EventStore>,
    dispatcher: Arc<Dispatcher>,
    ids: Arc<MessageIdAllocator>,
}

impl SendMessageCommand {
    pub fn new(
        store: Arc<EventStore>,
        dispatcher: Arc<Dispatcher>,
        ids: Arc<MessageIdAllocator>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            ids,
        }
    }

    /// Run the orchestration. Returns the assistant message id that carries
    /// (or will carry) the outcome.
    pub async fn execute(&self, input: &str, ctx: &ExecutionContext) -> Result<u64, CommandError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(CommandError::invalid(CMD_SEND_MESSAGE, "empty message text"));
        }

        let user_id = self.ids.allocate();
        let assistant_id = self.ids.allocate();

        self.store
            .append(DomainEvent::MessageAdded(ChatMessage::new(
                user_id,
                Role::User,
                text,
            )));
        self.store
            .append(DomainEvent::MessageAdded(ChatMessage::pending(
                assistant_id,
                Role::Assistant,
            )));

        let patch = match self.dispatcher.dispatch(text, ctx).await {
            Some(outcome) => {
                if outcome.result.is_error() {
                    // Error results live in history permanently; the error
                    // fact keeps its origin for later inspection.
                    self.store.append(DomainEvent::error_raised(
                        outcome.capability_id.clone(),
                        outcome.result.render_text(),
                    ));
                }
                let mut patch = MessagePatch::resolved(outcome.result.render_text());
                if let Some(url) = outcome.result.url_extra() {
                    patch.url = Some(url.to_string());
                }
                patch
            }
            None => {
                MessagePatch::resolved("No registered capability could handle that request.")
            }
        };

        self.store.append(DomainEvent::MessageUpdated {
            id: assistant_id,
            patch,
        });

        Ok(assistant_id)
    }
}
