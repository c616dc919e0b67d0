//! Checkpoint values and their validation
//!
//! A [`Checkpoint`] is an immutable copy of the whole session triple. On the
//! wire it uses the [`RawCheckpoint`] layout, where every part is optional so
//! that incomplete records can be detected and rejected instead of silently
//! defaulted.

use crate::error::CheckpointError;
use chrono::{DateTime, TimeZone, Utc};
use im::{OrdMap, Vector};
use prd_state::{
    ConversationState, DiffState, DocumentState, Message, Section, SectionHistory, SectionId,
    SessionState,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of validating a checkpoint record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the record can be stored
    pub is_valid: bool,
    /// Reason when it cannot
    pub error: Option<String>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn invalid(reason: &str) -> Self {
        Self {
            is_valid: false,
            error: Some(reason.to_string()),
        }
    }
}

/// Conversation part of a checkpoint record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChatState {
    /// Messages at capture time
    #[serde(default)]
    pub messages: Option<Vector<Message>>,
}

/// Document part of a checkpoint record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMarkdownState {
    /// Sections at capture time
    #[serde(default)]
    pub sections: Option<Vector<Section>>,
    /// Section histories at capture time
    #[serde(default)]
    pub section_history: OrdMap<SectionId, SectionHistory>,
}

/// Wire layout of a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCheckpoint {
    /// Identity
    #[serde(default)]
    pub id: Option<String>,
    /// Capture time, milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Conversation region
    #[serde(default)]
    pub chat_state: Option<RawChatState>,
    /// Document region
    #[serde(default)]
    pub markdown_state: Option<RawMarkdownState>,
    /// Diff region
    #[serde(default)]
    pub diff_state: Option<DiffState>,
}

impl RawCheckpoint {
    /// Check that identity, timestamp and all three regions are present
    ///
    /// Empty regions are valid; missing ones are not.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let has_id = self.id.as_deref().is_some_and(|id| !id.is_empty());
        let has_timestamp = self.timestamp.is_some_and(|t| t != 0);
        if !has_id || !has_timestamp {
            return ValidationResult::invalid("Missing required checkpoint metadata");
        }
        if self.chat_state.as_ref().and_then(|c| c.messages.as_ref()).is_none() {
            return ValidationResult::invalid("Missing chat state data");
        }
        if self.markdown_state.as_ref().and_then(|m| m.sections.as_ref()).is_none() {
            return ValidationResult::invalid("Missing markdown state data");
        }
        if self.diff_state.is_none() {
            return ValidationResult::invalid("Missing diff state data");
        }
        ValidationResult::valid()
    }
}

/// Immutable snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCheckpoint", into = "RawCheckpoint")]
pub struct Checkpoint {
    id: String,
    timestamp: DateTime<Utc>,
    state: SessionState,
}

impl Checkpoint {
    /// Capture `state` with a fresh id; transient generation flags are
    /// not captured
    #[must_use]
    pub fn capture(state: &SessionState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            state: SessionState {
                conversation: state.conversation.settled(),
                document: state.document.clone(),
                diff: state.diff.clone(),
            },
        }
    }

    /// Identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capture time
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Captured triple
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Number of messages when captured; the lookup key of a checkpoint
    #[inline]
    #[must_use]
    pub fn conversation_len(&self) -> usize {
        self.state.conversation.len()
    }
}

impl From<Checkpoint> for RawCheckpoint {
    fn from(cp: Checkpoint) -> Self {
        let SessionState {
            conversation,
            document,
            diff,
        } = cp.state;
        Self {
            id: Some(cp.id),
            timestamp: Some(cp.timestamp.timestamp_millis()),
            chat_state: Some(RawChatState {
                messages: Some(conversation.messages),
            }),
            markdown_state: Some(RawMarkdownState {
                sections: Some(document.sections),
                section_history: document.history,
            }),
            diff_state: Some(diff),
        }
    }
}

impl TryFrom<RawCheckpoint> for Checkpoint {
    type Error = CheckpointError;

    fn try_from(raw: RawCheckpoint) -> Result<Self, Self::Error> {
        let verdict = raw.validate();
        if !verdict.is_valid {
            return Err(CheckpointError::Invalid(verdict.error.unwrap_or_default()));
        }
        let invalid = |reason: &str| CheckpointError::Invalid(reason.to_string());

        let millis = raw.timestamp.ok_or_else(|| invalid("Missing required checkpoint metadata"))?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| invalid("timestamp out of range"))?;
        let messages = raw
            .chat_state
            .and_then(|c| c.messages)
            .ok_or_else(|| invalid("Missing chat state data"))?;
        let markdown = raw.markdown_state.ok_or_else(|| invalid("Missing markdown state data"))?;
        let sections = markdown.sections.ok_or_else(|| invalid("Missing markdown state data"))?;

        Ok(Self {
            id: raw.id.ok_or_else(|| invalid("Missing required checkpoint metadata"))?,
            timestamp,
            state: SessionState {
                conversation: ConversationState {
                    messages,
                    status: prd_state::GenerationStatus::default(),
                },
                document: DocumentState {
                    sections,
                    history: markdown.section_history,
                },
                diff: raw.diff_state.ok_or_else(|| invalid("Missing diff state data"))?,
            },
        })
    }
}
