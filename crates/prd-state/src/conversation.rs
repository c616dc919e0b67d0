//! Conversation region: messages plus transient generation flags

use crate::message::Message;
use im::Vector;
use serde::{Deserialize, Serialize};

/// Opening assistant message of a new document
pub const GREETING: &str = "Hi there! It looks like we're starting fresh with a new Product \
    Requirement Document (PRD). Would you like to begin by focusing on:\n\
    1. Describing a prototype or solution idea you have in mind?\n\
    2. Exploring a business process that needs improvement?\n\n\
    Let me know what works best for you, or feel free to share any existing documentation or \
    ideas you already have!";

/// Transient flags describing an in-flight turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStatus {
    /// A turn is being processed
    pub is_loading: bool,
    /// Reply tokens are arriving
    pub is_streaming: bool,
    /// Reply text received so far
    pub streaming_content: String,
    /// Pipeline is working before the first token
    pub is_thinking: bool,
    /// Progress log of the pipeline
    pub thinking_flow: String,
}

impl GenerationStatus {
    /// Status at the start of a turn
    #[must_use]
    pub fn started() -> Self {
        Self {
            is_loading: true,
            is_thinking: true,
            ..Self::default()
        }
    }

    /// Append a pipeline progress entry, marking errors, completions and steps
    pub fn append_thinking(&mut self, entry: &str) {
        let marked = if entry.contains("Error:") {
            format!("❌ {entry}")
        } else if entry.contains("Completed") || entry.contains("Success") {
            format!("✅ {entry}")
        } else if entry.contains("Step") || entry.contains("Processing") {
            format!("🔄 {entry}")
        } else {
            entry.to_string()
        };

        if self.thinking_flow.is_empty() {
            self.thinking_flow = marked;
        } else {
            self.thinking_flow.push('\n');
            self.thinking_flow.push_str(&marked);
        }
        self.is_thinking = true;
    }

    /// Record a streamed token; the first one ends the thinking phase
    pub fn append_token(&mut self, token: &str, is_first: bool) {
        if is_first {
            self.is_thinking = false;
            self.thinking_flow.clear();
            self.is_streaming = true;
        }
        self.streaming_content.push_str(token);
    }
}

/// Ordered message log with generation flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Messages in conversation order
    pub messages: Vector<Message>,
    /// Flags of the current turn
    #[serde(default)]
    pub status: GenerationStatus,
}

impl ConversationState {
    /// Empty conversation
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation opened by the assistant greeting
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut state = Self::default();
        state.push(Message::assistant(GREETING));
        state
    }

    /// Append a message
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Number of messages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when there are no messages
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message past `len`
    pub fn truncate(&mut self, len: usize) {
        if len < self.messages.len() {
            self.messages.truncate(len);
        }
    }

    /// The last `n` messages in order
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(start).cloned().collect()
    }

    /// Copy with transient flags cleared
    #[must_use]
    pub fn settled(&self) -> Self {
        Self {
            messages: self.messages.clone(),
            status: GenerationStatus::default(),
        }
    }
}
