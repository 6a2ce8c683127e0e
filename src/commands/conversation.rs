//! Conversation maintenance orchestrations: clearing history and exporting
//! the transcript.

use std::sync::Arc;

use crate::events::{DomainEvent, EventStore};
use crate::queries::GetTranscriptQuery;

/// Wipes the visible conversation. The `chat_cleared` fact itself stays in
/// the log, so the wipe is as auditable as everything else.
pub struct ClearChatCommand {
    store: Arc<EventStore>,
}

impl ClearChatCommand {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self) {
        self.store.append(DomainEvent::ChatCleared);
    }
}

/// Renders the current conversation as plain text for the clipboard.
///
/// Read-only: this is the one command that appends nothing; it exists on
/// the bus so callers reach it the same way as every other operation.
pub struct CopyContextCommand {
    transcript: GetTranscriptQuery,
}

impl CopyContextCommand {
    pub fn new(transcript: GetTranscriptQuery) -> Self {
        Self { transcript }
    }

    pub fn execute(&self) -> String {
        self.transcript.execute()
    }
}
