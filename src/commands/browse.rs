//! The browse orchestration: intent-tag lookup instead of free-text triage.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::dispatch::Dispatcher;
use crate::events::{ChatMessage, DomainEvent, EventStore, MessagePatch, Role};

use super::{CommandError, MessageIdAllocator};

/// Intent tag a browsing capability declares to receive navigation work.
pub const BROWSE_INTENT: &str = "browse";

/// Opens a URL through whichever capability declares the `browse` intent.
///
/// Unlike [`super::SendMessageCommand`], this does not triage free text:
/// the caller already knows what it wants, so resolution is a tag lookup
/// (first registered provider wins) followed by the same normalized
/// execution boundary.
pub struct BrowseCommand {
    store: Arc<EventStore>,
    dispatcher: Arc<Dispatcher>,
    ids: Arc<MessageIdAllocator>,
}

impl BrowseCommand {
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

    /// Navigate to `url`. Returns the assistant message id carrying the
    /// page result.
    pub async fn execute(&self, url: &str, ctx: &ExecutionContext) -> Result<u64, CommandError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CommandError::invalid(super::CMD_BROWSE, "empty url"));
        }

        let provider = self
            .dispatcher
            .registry()
            .find_by_intent(BROWSE_INTENT)
            .into_iter()
            .next()
            .ok_or_else(|| CommandError::NoIntentProvider(BROWSE_INTENT.to_string()))?;

        let message_id = self.ids.allocate();
        self.store.append(DomainEvent::browse_opened(url));
        self.store
            .append(DomainEvent::MessageAdded(ChatMessage::pending(
                message_id,
                Role::Assistant,
            )));

        let result = self.dispatcher.run_boundary(&provider, url, ctx).await;
        if result.is_error() {
            self.store.append(DomainEvent::error_raised(
                provider.descriptor().id.clone(),
                result.render_text(),
            ));
        }

        let mut patch = MessagePatch::resolved(result.render_text());
        patch.url = Some(
            result
                .url_extra()
                .map(str::to_string)
                .unwrap_or_else(|| url.to_string()),
        );
        self.store.append(DomainEvent::MessageUpdated {
            id: message_id,
            patch,
        });

        Ok(message_id)
    }
}
