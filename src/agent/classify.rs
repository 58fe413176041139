use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::prompts::{CLASSIFICATION_PROMPT, REJECTION_MESSAGE};
use super::schemas::QueryClassification;
use super::PipelineCtx;
use crate::graph::Node;
use crate::state::{ConversationState, Status};
use crate::traits::Message;

/// Classify whether the query is in scope (profiling / performance).
pub struct ClassifyNode {
    pub ctx: Arc<PipelineCtx>,
}

#[async_trait]
impl Node<ConversationState> for ClassifyNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let mut messages: Vec<Value> =
            vec![serde_json::json!({"role": "system", "content": CLASSIFICATION_PROMPT})];
        messages.extend(state.wire_messages());

        let raw = self
            .ctx
            .provider
            .chat_structured(
                &self.ctx.model,
                &messages,
                QueryClassification::SCHEMA_NAME,
                &QueryClassification::schema(),
            )
            .await?;
        let classification: QueryClassification = serde_json::from_value(raw)?;

        info!(
            is_profiling = classification.is_profiling,
            query = state.user_query(),
            "Classified query"
        );
        state.is_profiling = Some(classification.is_profiling);
        Ok(())
    }
}

/// Terminal node for out-of-scope queries — bypasses all planning, agent,
/// and tool machinery.
pub struct RejectNode;

#[async_trait]
impl Node<ConversationState> for RejectNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        info!("Rejecting non-profiling query");
        state.push(Message::assistant(REJECTION_MESSAGE));
        state.agent_summary = Some(REJECTION_MESSAGE.to_string());
        state.status = Some(Status::Rejected);
        Ok(())
    }
}

/// Routing after classification: in scope → plan, otherwise → reject.
pub fn route_classification(state: &ConversationState) -> String {
    if state.is_profiling == Some(true) {
        "plan".to_string()
    } else {
        "reject".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reject_sets_terminal_fields() {
        let mut state = ConversationState::new("what's the weather today");
        RejectNode.run(&mut state).await.unwrap();
        assert_eq!(state.status, Some(Status::Rejected));
        assert_eq!(state.agent_summary.as_deref(), Some(REJECTION_MESSAGE));
        assert_eq!(state.messages.last().unwrap().role, "assistant");
    }

    #[test]
    fn routing_follows_classification() {
        let mut state = ConversationState::new("q");
        state.is_profiling = Some(true);
        assert_eq!(route_classification(&state), "plan");
        state.is_profiling = Some(false);
        assert_eq!(route_classification(&state), "reject");
        state.is_profiling = None;
        assert_eq!(route_classification(&state), "reject");
    }
}
