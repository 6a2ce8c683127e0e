//! Domain event types and the chat message model.
//!
//! Every event round-trips through the wire shape
//! `{ "type": <string>, "payload"?: <object>, "timestamp"?: <number> }`.
//! Chat variants carry no timestamp; extended variants always do. Tags this
//! core does not know are preserved verbatim as [`DomainEvent::Unknown`];
//! an event log written by a newer build must survive a round trip through
//! an older one.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// Speaker role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single conversation message.
///
/// The id is assigned by the command layer from one monotonically increasing
/// counter and is never reused. Once a message is in the log, only
/// `message_updated` may alter its other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    /// Optional link the presentation layer renders alongside the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Suggested follow-up actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// True while a command is still resolving this message's content.
    #[serde(default)]
    pub loading: bool,
    /// Structured payload for rich message kinds (tables, media manifests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ChatMessage {
    /// Create a plain message.
    pub fn new(id: u64, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            url: None,
            suggestions: Vec::new(),
            loading: false,
            payload: None,
        }
    }

    /// Create a message in the loading state, to be resolved by a later
    /// `message_updated`.
    pub fn pending(id: u64, role: Role) -> Self {
        let mut msg = Self::new(id, role, "");
        msg.loading = true;
        msg
    }
}

/// Partial update merged onto an existing message. Absent fields are left
/// untouched; this is never a full replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl MessagePatch {
    /// A patch that resolves a loading message with final text.
    pub fn resolved(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            loading: Some(false),
            ..Default::default()
        }
    }

    /// Merge this patch onto a message. The id is not touchable.
    pub fn apply_to(&self, message: &mut ChatMessage) {
        if let Some(text) = &self.text {
            message.text = text.clone();
        }
        if let Some(url) = &self.url {
            message.url = Some(url.clone());
        }
        if let Some(suggestions) = &self.suggestions {
            message.suggestions = suggestions.clone();
        }
        if let Some(loading) = self.loading {
            message.loading = loading;
        }
        if let Some(payload) = &self.payload {
            message.payload = Some(payload.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// The persisted/streamed shape of every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Payload of a `message_updated` event: the target id plus the patch fields
/// flattened alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MessageUpdatePayload {
    id: u64,
    #[serde(flatten)]
    patch: MessagePatch,
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// An immutable fact appended to the event store.
///
/// The three chat variants drive the conversation projection. The extended
/// variants are known tags whose payloads stay opaque to the projector.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    MessageAdded(ChatMessage),
    MessageUpdated { id: u64, patch: MessagePatch },
    ChatCleared,
    BrowseOpened { payload: Value, timestamp: i64 },
    SearchPerformed { payload: Value, timestamp: i64 },
    SummaryReady { payload: Value, timestamp: i64 },
    ErrorRaised { payload: Value, timestamp: i64 },
    SettingsChanged { payload: Value, timestamp: i64 },
    DeviceConnected { payload: Value, timestamp: i64 },
    DeviceDisconnected { payload: Value, timestamp: i64 },
    /// Any tag this build does not know. Preserved verbatim.
    Unknown(RawEvent),
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl DomainEvent {
    /// The wire tag of this event.
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::MessageAdded(_) => "message_added",
            DomainEvent::MessageUpdated { .. } => "message_updated",
            DomainEvent::ChatCleared => "chat_cleared",
            DomainEvent::BrowseOpened { .. } => "browse_opened",
            DomainEvent::SearchPerformed { .. } => "search_performed",
            DomainEvent::SummaryReady { .. } => "summary_ready",
            DomainEvent::ErrorRaised { .. } => "error_raised",
            DomainEvent::SettingsChanged { .. } => "settings_changed",
            DomainEvent::DeviceConnected { .. } => "device_connected",
            DomainEvent::DeviceDisconnected { .. } => "device_disconnected",
            DomainEvent::Unknown(raw) => &raw.event_type,
        }
    }

    /// Browse navigation fact, stamped now.
    pub fn browse_opened(url: impl Into<String>) -> Self {
        DomainEvent::BrowseOpened {
            payload: json!({ "url": url.into() }),
            timestamp: now_millis(),
        }
    }

    /// Error fact persisted permanently in history.
    pub fn error_raised(source: impl Into<String>, message: impl Into<String>) -> Self {
        DomainEvent::ErrorRaised {
            payload: json!({ "source": source.into(), "message": message.into() }),
            timestamp: now_millis(),
        }
    }

    /// Settings mutation fact carrying the applied patch.
    pub fn settings_changed(patch: Value) -> Self {
        DomainEvent::SettingsChanged {
            payload: patch,
            timestamp: now_millis(),
        }
    }

    /// Device presence fact (camera or other peripheral appearing/vanishing).
    pub fn device_presence(device: impl Into<String>, connected: bool) -> Self {
        let payload = json!({ "device": device.into() });
        let timestamp = now_millis();
        if connected {
            DomainEvent::DeviceConnected { payload, timestamp }
        } else {
            DomainEvent::DeviceDisconnected { payload, timestamp }
        }
    }

    /// Convert to the wire shape.
    pub fn to_raw(&self) -> Result<RawEvent, serde_json::Error> {
        let raw = match self {
            DomainEvent::MessageAdded(msg) => RawEvent {
                event_type: "message_added".into(),
                payload: Some(serde_json::to_value(msg)?),
                timestamp: None,
            },
            DomainEvent::MessageUpdated { id, patch } => RawEvent {
                event_type: "message_updated".into(),
                payload: Some(serde_json::to_value(MessageUpdatePayload {
                    id: *id,
                    patch: patch.clone(),
                })?),
                timestamp: None,
            },
            DomainEvent::ChatCleared => RawEvent {
                event_type: "chat_cleared".into(),
                payload: None,
                timestamp: None,
            },
            DomainEvent::BrowseOpened { payload, timestamp }
            | DomainEvent::SearchPerformed { payload, timestamp }
            | DomainEvent::SummaryReady { payload, timestamp }
            | DomainEvent::ErrorRaised { payload, timestamp }
            | DomainEvent::SettingsChanged { payload, timestamp }
            | DomainEvent::DeviceConnected { payload, timestamp }
            | DomainEvent::DeviceDisconnected { payload, timestamp } => RawEvent {
                event_type: self.event_type().to_string(),
                payload: Some(payload.clone()),
                timestamp: Some(*timestamp),
            },
            DomainEvent::Unknown(raw) => raw.clone(),
        };
        Ok(raw)
    }

    /// Interpret a wire event. A known tag whose payload does not parse is
    /// kept as [`DomainEvent::Unknown`] rather than rejected, so a corrupt
    /// or future-shaped entry still round-trips.
    pub fn from_raw(raw: RawEvent) -> Self {
        match raw.event_type.as_str() {
            "message_added" => match raw
                .payload
                .clone()
                .map(serde_json::from_value::<ChatMessage>)
            {
                Some(Ok(msg)) => DomainEvent::MessageAdded(msg),
                _ => DomainEvent::Unknown(raw),
            },
            "message_updated" => match raw
                .payload
                .clone()
                .map(serde_json::from_value::<MessageUpdatePayload>)
            {
                Some(Ok(update)) => DomainEvent::MessageUpdated {
                    id: update.id,
                    patch: update.patch,
                },
                _ => DomainEvent::Unknown(raw),
            },
            "chat_cleared" => DomainEvent::ChatCleared,
            "browse_opened" | "search_performed" | "summary_ready" | "error_raised"
            | "settings_changed" | "device_connected" | "device_disconnected" => {
                match (raw.payload.clone(), raw.timestamp) {
                    (Some(payload), Some(timestamp)) => match raw.event_type.as_str() {
                        "browse_opened" => DomainEvent::BrowseOpened { payload, timestamp },
                        "search_performed" => DomainEvent::SearchPerformed { payload, timestamp },
                        "summary_ready" => DomainEvent::SummaryReady { payload, timestamp },
                        "error_raised" => DomainEvent::ErrorRaised { payload, timestamp },
                        "settings_changed" => DomainEvent::SettingsChanged { payload, timestamp },
                        "device_connected" => DomainEvent::DeviceConnected { payload, timestamp },
                        _ => DomainEvent::DeviceDisconnected { payload, timestamp },
                    },
                    // Missing half of the shape: keep the original bytes.
                    _ => DomainEvent::Unknown(raw),
                }
            }
            _ => DomainEvent::Unknown(raw),
        }
    }
}

impl Serialize for DomainEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let raw = self.to_raw().map_err(serde::ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DomainEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEvent::deserialize(deserializer)?;
        Ok(DomainEvent::from_raw(raw))
    }
}
