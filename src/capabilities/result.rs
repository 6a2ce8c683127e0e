//! Capability result values — status, ordered content blocks, metadata.
//!
//! Results are pure values with no side channel: everything a capability
//! wants the conversation to see travels through here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome class of a capability execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Error,
    Partial,
}

/// One entry in a result's ordered content sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Image {
        /// Base64 bytes or a host-resolvable URL.
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Audio {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Video {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    Data {
        data: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl ContentBlock {
    pub fn text(data: impl Into<String>) -> Self {
        ContentBlock::Text {
            data: data.into(),
            title: None,
            mime_type: None,
        }
    }

    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ContentBlock::Image {
            data: data.into(),
            title: None,
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn data(data: Value) -> Self {
        ContentBlock::Data {
            data,
            title: None,
            mime_type: None,
        }
    }

    pub fn with_title(mut self, new_title: impl Into<String>) -> Self {
        match &mut self {
            ContentBlock::Text { title, .. }
            | ContentBlock::Image { title, .. }
            | ContentBlock::Audio { title, .. }
            | ContentBlock::Video { title, .. }
            | ContentBlock::Data { title, .. } => *title = Some(new_title.into()),
        }
        self
    }
}

/// Result metadata: the mandatory trio plus free-form extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub truncated: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// What a capability execution hands back to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityResult {
    pub status: ResultStatus,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub metadata: ResultMetadata,
}

impl CapabilityResult {
    pub fn success(content: Vec<ContentBlock>) -> Self {
        Self {
            status: ResultStatus::Success,
            content,
            metadata: ResultMetadata::default(),
        }
    }

    /// Successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![ContentBlock::text(text)])
    }

    /// Error result with a human-readable explanation block.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            content: vec![ContentBlock::text(message)],
            metadata: ResultMetadata::default(),
        }
    }

    /// Partial result: some content produced, some failed.
    pub fn partial(content: Vec<ContentBlock>) -> Self {
        Self {
            status: ResultStatus::Partial,
            content,
            metadata: ResultMetadata::default(),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = duration_ms;
        self
    }

    pub fn cached(mut self) -> Self {
        self.metadata.cached = true;
        self
    }

    pub fn truncated(mut self) -> Self {
        self.metadata.truncated = true;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.extra.insert(key.into(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == ResultStatus::Error
    }

    /// Render the result as plain message text: text blocks joined by blank
    /// lines, non-text blocks referenced by their title or kind.
    pub fn render_text(&self) -> String {
        let mut parts = Vec::new();
        for block in &self.content {
            match block {
                ContentBlock::Text { data, .. } => parts.push(data.clone()),
                ContentBlock::Image { title, .. } => {
                    parts.push(format!("[image: {}]", title.as_deref().unwrap_or("untitled")))
                }
                ContentBlock::Audio { title, .. } => {
                    parts.push(format!("[audio: {}]", title.as_deref().unwrap_or("untitled")))
                }
                ContentBlock::Video { title, .. } => {
                    parts.push(format!("[video: {}]", title.as_deref().unwrap_or("untitled")))
                }
                ContentBlock::Data { data, title, .. } => match title {
                    Some(title) => parts.push(format!("[{title}]")),
                    None => parts.push(data.to_string()),
                },
            }
        }
        parts.join("\n\n")
    }

    /// The `url` metadata extra, when a capability attached one.
    pub fn url_extra(&self) -> Option<&str> {
        self.metadata.extra.get("url").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_result() {
        let result = CapabilityResult::text("two cameras online");
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.render_text(), "two cameras online");
        assert!(!result.is_error());
    }

    #[test]
    fn test_error_result_embeds_message() {
        let result = CapabilityResult::error("host unreachable");
        assert!(result.is_error());
        assert_eq!(result.render_text(), "host unreachable");
    }

    #[test]
    fn test_metadata_builders() {
        let result = CapabilityResult::text("cached answer")
            .with_duration(12)
            .cached()
            .with_extra("url", json!("https://example.org"));
        assert_eq!(result.metadata.duration_ms, 12);
        assert!(result.metadata.cached);
        assert!(!result.metadata.truncated);
        assert_eq!(result.url_extra(), Some("https://example.org"));
    }

    #[test]
    fn test_content_block_tagging() {
        let block = ContentBlock::image("aGVsbG8=", "image/jpeg").with_title("garage");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["type"], "image");
        assert_eq!(value["title"], "garage");
        assert_eq!(value["mime_type"], "image/jpeg");
    }

    #[test]
    fn test_render_text_mixes_block_kinds() {
        let result = CapabilityResult::success(vec![
            ContentBlock::text("snapshot taken"),
            ContentBlock::image("...", "image/png").with_title("driveway"),
            ContentBlock::data(json!({ "motion": true })),
        ]);
        let rendered = result.render_text();
        assert!(rendered.contains("snapshot taken"));
        assert!(rendered.contains("[image: driveway]"));
        assert!(rendered.contains("motion"));
    }

    #[test]
    fn test_metadata_extra_flattens_on_the_wire() {
        let result = CapabilityResult::text("ok").with_extra("attempts", json!(3));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["metadata"]["attempts"], 3);
        assert_eq!(value["metadata"]["cached"], false);
    }
}
