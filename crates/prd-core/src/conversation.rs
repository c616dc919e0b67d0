//! Conversational agent
//!
//! Produces the user-facing reply of a turn and folds the exchange into the
//! running conversation summary.

use crate::config::PipelineConfig;
use crate::prompts::conversation_prompt;
use crate::summary::{ellipsize, ConversationSummarizer, MESSAGE_CHAR_LIMIT};
use prd_generation::{
    CancellationToken, GenerationClient, GenerationError, GenerationOptions, StreamCallbacks,
};
use prd_state::{Message, Role};

/// Reply used when generation fails
pub const TROUBLE_REPLY: &str =
    "I'm having trouble generating a response right now. Could you try again?";

/// Inputs of one reply
#[derive(Clone, Copy, Default)]
pub struct ConversationRequest<'a> {
    /// Recent messages, latest last
    pub messages: &'a [Message],
    /// Current document, as built by [`crate::context::conversation_context`]
    pub document_context: &'a str,
    /// Running summary before this turn
    pub previous_summary: &'a str,
    /// What the pipeline changed this turn; empty when nothing
    pub update_summary: &'a str,
    /// Stream the reply through these callbacks
    pub callbacks: Option<&'a dyn StreamCallbacks>,
    /// Abort signal for the reply
    pub cancel: Option<&'a CancellationToken>,
}

/// Reply text and the summary to carry into the next turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationReply {
    /// Text shown to the user
    pub response: String,
    /// Running summary after this turn
    pub updated_summary: String,
}

/// Talks with the user about the document
#[derive(Debug, Clone)]
pub struct ConversationAgent {
    client: GenerationClient,
    summarizer: ConversationSummarizer,
    temperature: f32,
}

impl ConversationAgent {
    /// Create agent
    #[must_use]
    pub fn new(client: GenerationClient, config: &PipelineConfig) -> Self {
        Self {
            summarizer: ConversationSummarizer::new(client.clone(), config),
            client,
            temperature: config.conversation_temperature,
        }
    }

    /// Reply to the latest message
    ///
    /// Generation failures produce [`TROUBLE_REPLY`] and keep the previous
    /// summary.
    ///
    /// # Errors
    /// Only [`GenerationError::Cancelled`].
    pub async fn respond(
        &self,
        request: ConversationRequest<'_>,
    ) -> Result<ConversationReply, GenerationError> {
        let recent = self.summarizer.summarize_recent(request.messages).await;
        let combined = if request.previous_summary.is_empty() {
            format!("Summary of recent messages:\n{recent}")
        } else {
            format!(
                "Previous conversation summary: {}\n\nSummary of recent messages:\n{recent}",
                request.previous_summary
            )
        };

        let prompt = conversation_prompt(
            &format_messages_for_prompt(request.messages),
            request.document_context,
            &combined,
            request.update_summary,
        );
        let latest: Vec<Message> = request.messages.last().cloned().into_iter().collect();

        let reply = match request.callbacks {
            Some(callbacks) => {
                let options =
                    GenerationOptions::new("Conversation Agent Streaming", self.temperature);
                self.client
                    .stream(prompt, latest, callbacks, options, request.cancel)
                    .await
            }
            None => {
                let options = GenerationOptions::new("Conversation Agent", self.temperature);
                let call = self.client.complete(prompt, latest, options);
                match request.cancel {
                    Some(token) => tokio::select! {
                        biased;
                        () = token.cancelled() => Err(GenerationError::Cancelled),
                        result = call => result.map(|c| c.text),
                    },
                    None => call.await.map(|c| c.text),
                }
            }
        };

        let response = match reply {
            Ok(text) => text,
            Err(GenerationError::Cancelled) => return Err(GenerationError::Cancelled),
            Err(e) => {
                tracing::error!(stage = "conversation", error = %e, "conversation reply failed");
                return Ok(ConversationReply {
                    response: TROUBLE_REPLY.to_string(),
                    updated_summary: request.previous_summary.to_string(),
                });
            }
        };

        let user_request = request
            .messages
            .last()
            .map(|m| m.content.to_summary_text())
            .unwrap_or_default();
        let updated_summary = self
            .summarizer
            .update(Some(request.previous_summary), &user_request, &response)
            .await;

        Ok(ConversationReply {
            response,
            updated_summary,
        })
    }
}

/// Messages as `### **role**: text`, each cut to 2500 characters
#[must_use]
pub fn format_messages_for_prompt(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No recent messages.".to_string();
    }
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            format!("### **{role}**: {}", ellipsize(&m.text(), MESSAGE_CHAR_LIMIT))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
