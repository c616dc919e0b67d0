//! Chat messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions to the model
    System,
    /// Human participant
    User,
    /// Assistant reply
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// Reference to an attached image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Data or remote URL
    pub url: String,
}

/// Typed part of a multi-part message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text {
        /// Text body
        text: String,
    },
    /// Attached image
    ImageUrl {
        /// Image location
        image_url: ImageRef,
    },
    /// Attached file of another kind
    File {
        /// File name
        name: String,
    },
}

impl ContentPart {
    /// Text part
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Image part
    #[inline]
    #[must_use]
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageRef { url: url.into() },
        }
    }

    /// Wire name of the part type
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ImageUrl { .. } => "image_url",
            Self::File { .. } => "file",
        }
    }
}

/// Message body: plain text or a list of typed parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Multi-part content
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten to text; non-text parts render as `[kind]`
    #[must_use]
    pub fn to_text(&self) -> String {
        self.render(" ", |part| format!("[{}]", part.kind()))
    }

    /// Flatten to text for summaries; images render as `[Attached Image]`
    #[must_use]
    pub fn to_summary_text(&self) -> String {
        self.render("\n", |part| match part {
            ContentPart::ImageUrl { .. } => "[Attached Image]".to_string(),
            other => format!("[{}]", other.kind()),
        })
    }

    fn render(&self, sep: &str, placeholder: impl Fn(&ContentPart) -> String) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text { text } => text.clone(),
                    other => placeholder(other),
                })
                .collect::<Vec<_>>()
                .join(sep),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        Self::Parts(parts)
    }
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Body
    pub content: MessageContent,
    /// When the message was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Create a message
    #[inline]
    #[must_use]
    pub fn new(role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    /// User message
    #[inline]
    #[must_use]
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::User, content)
    }

    /// Assistant message
    #[inline]
    #[must_use]
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// System message
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::new(Role::System, content)
    }

    /// With timestamp
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Body flattened to text
    #[inline]
    #[must_use]
    pub fn text(&self) -> String {
        self.content.to_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_flatten_with_placeholders() {
        let content = MessageContent::Parts(vec![
            ContentPart::text("See the mockup"),
            ContentPart::image("data:image/png;base64,AAAA"),
        ]);
        assert_eq!(content.to_text(), "See the mockup [image_url]");
        assert_eq!(content.to_summary_text(), "See the mockup\n[Attached Image]");
    }

    #[test]
    fn content_deserializes_both_shapes() {
        let plain: Message = serde_json::from_str(r#"{"role":"user","content":"hello"}"#).unwrap();
        assert_eq!(plain.text(), "hello");

        let json = serde_json::json!({
            "role": "user",
            "content": [
                { "type": "text", "text": "hi" },
                { "type": "image_url", "image_url": { "url": "x" } },
            ],
        });
        let parts: Message = serde_json::from_value(json).unwrap();
        assert_eq!(parts.text(), "hi [image_url]");
    }
}
