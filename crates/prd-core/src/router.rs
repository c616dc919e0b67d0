//! Relevance routing
//!
//! A [`Router`] decides whether a turn carries document content. Both
//! implementations fail closed: any failure means "not related".

use crate::config::PipelineConfig;
use crate::prompts::ROUTER_PROMPT;
use async_trait::async_trait;
use prd_generation::{GenerationClient, GenerationOptions};
use prd_state::{Message, Role, SectionCatalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Routing verdict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Whether the turn should update document sections
    pub is_prd_section_related: bool,
}

impl RouteDecision {
    /// Verdict used whenever routing cannot decide
    pub const NOT_RELATED: Self = Self {
        is_prd_section_related: false,
    };
}

/// Decides whether a turn concerns the document
#[async_trait]
pub trait Router: Send + Sync {
    /// Classify `messages`; never fails
    async fn route(&self, messages: &[Message]) -> RouteDecision;
}

/// Router backed by the generation capability
#[derive(Debug, Clone)]
pub struct ModelRouter {
    client: GenerationClient,
    temperature: f32,
    max_tokens: u32,
}

impl ModelRouter {
    /// Create router
    #[must_use]
    pub fn new(client: GenerationClient, config: &PipelineConfig) -> Self {
        Self {
            client,
            temperature: config.router_temperature,
            max_tokens: config.router_max_tokens,
        }
    }
}

#[async_trait]
impl Router for ModelRouter {
    async fn route(&self, messages: &[Message]) -> RouteDecision {
        let options = GenerationOptions::new("Router Agent", self.temperature)
            .with_max_tokens(self.max_tokens);
        match self
            .client
            .complete_json::<RouteDecision>(ROUTER_PROMPT, messages.to_vec(), options)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    stage = "routing",
                    error = %e,
                    "router failed, treating turn as unrelated"
                );
                RouteDecision::NOT_RELATED
            }
        }
    }
}

/// Router matching the latest user message against catalog triggers
#[derive(Debug, Clone)]
pub struct RuleRouter {
    catalog: Arc<SectionCatalog>,
}

impl RuleRouter {
    /// Create router
    #[inline]
    #[must_use]
    pub fn new(catalog: Arc<SectionCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Router for RuleRouter {
    async fn route(&self, messages: &[Message]) -> RouteDecision {
        let Some(latest) = messages.iter().rev().find(|m| m.role == Role::User) else {
            return RouteDecision::NOT_RELATED;
        };
        let text = latest.text();
        RouteDecision {
            is_prd_section_related: self
                .catalog
                .entries()
                .iter()
                .any(|e| e.should_update_when(&text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prd_generation::{Completion, GenerationError, MockGenerationBackend};

    fn client(reply: Result<&'static str, GenerationError>) -> GenerationClient {
        let mut backend = MockGenerationBackend::new();
        backend.expect_complete().returning(move |request| {
            assert_eq!(request.options.temperature, 0.0);
            assert_eq!(request.options.max_tokens, Some(1500));
            reply.clone().map(Completion::text)
        });
        GenerationClient::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn model_router_parses_verdict() {
        let router = ModelRouter::new(
            client(Ok(r#"{"is_prd_section_related": true}"#)),
            &PipelineConfig::default(),
        );
        assert!(router.route(&[Message::user("Budget is $500k")]).await.is_prd_section_related);
    }

    #[tokio::test]
    async fn model_router_fails_closed() {
        let config = PipelineConfig::default();
        let broken = ModelRouter::new(client(Ok("sure, it is related")), &config);
        assert_eq!(broken.route(&[Message::user("x")]).await, RouteDecision::NOT_RELATED);

        let down = ModelRouter::new(client(Err(GenerationError::Backend("503".into()))), &config);
        assert_eq!(down.route(&[Message::user("x")]).await, RouteDecision::NOT_RELATED);
    }

    #[tokio::test]
    async fn rule_router_uses_triggers() {
        let router = RuleRouter::new(Arc::new(SectionCatalog::prd_default()));
        let stories = router.route(&[Message::user("The user stories are ready")]).await;
        assert!(stories.is_prd_section_related);
        assert!(!router.route(&[Message::user("hello there")]).await.is_prd_section_related);
        assert!(!router.route(&[]).await.is_prd_section_related);
    }
}
