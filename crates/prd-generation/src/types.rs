//! Request and reply types

use prd_state::Message;
use serde::{Deserialize, Serialize};

/// Sampling and bookkeeping options for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Log label identifying the caller
    pub label: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Expected output used as a prediction hint
    pub prediction: Option<String>,
}

impl GenerationOptions {
    /// Options with a label and temperature
    #[inline]
    #[must_use]
    pub fn new(label: impl Into<String>, temperature: f32) -> Self {
        Self {
            label: label.into(),
            temperature,
            max_tokens: None,
            prediction: None,
        }
    }

    /// With max tokens
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// With prediction hint
    #[inline]
    #[must_use]
    pub fn with_prediction(mut self, prediction: Option<String>) -> Self {
        self.prediction = prediction;
        self
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new("generation", 0.7)
    }
}

/// Full request handed to a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt
    pub system_prompt: String,
    /// Message context
    pub messages: Vec<Message>,
    /// Call options
    pub options: GenerationOptions,
}

/// Prediction bookkeeping reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prediction tokens the backend reused
    pub accepted_prediction_tokens: u32,
    /// Prediction tokens the backend discarded
    pub rejected_prediction_tokens: u32,
}

/// One-shot reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,
    /// Prediction statistics, when reported
    pub usage: Option<Usage>,
}

impl Completion {
    /// Reply without usage data
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// One streamed event: the raw chunk and the text it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Raw chunk as received from the backend
    pub raw: String,
    /// Text delta carried by the chunk
    pub delta: String,
}

impl StreamEvent {
    /// Event whose raw form is its delta
    #[inline]
    #[must_use]
    pub fn delta(delta: impl Into<String>) -> Self {
        let delta = delta.into();
        Self { raw: delta.clone(), delta }
    }
}
