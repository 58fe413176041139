use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::prompts::FINALIZE_OUTPUT_PROMPT;
use super::schemas::{FinalStatus, FinalSummary};
use super::PipelineCtx;
use crate::graph::Node;
use crate::state::{ConversationState, Status};
use crate::traits::Message;

/// Produce the terminal summary from the final accumulated metadata.
pub struct FinalizeNode {
    pub ctx: Arc<PipelineCtx>,
}

impl FinalizeNode {
    fn final_values(state: &ConversationState) -> String {
        format!(
            "Final extracted values:\n  username: {}\n  start_time: {}\n  end_time: {}",
            state.username.as_deref().unwrap_or("None"),
            state.start_time.as_deref().unwrap_or("None"),
            state.end_time.as_deref().unwrap_or("None"),
        )
    }

    /// Deterministic fallback when the summary call fails — the query still
    /// resolves to a normal structured response.
    fn fallback_summary(state: &ConversationState) -> String {
        format!(
            "Extracted profiling metadata: username={}, start_time={}, end_time={}.",
            state.username.as_deref().unwrap_or("unknown"),
            state.start_time.as_deref().unwrap_or("unknown"),
            state.end_time.as_deref().unwrap_or("unknown"),
        )
    }
}

#[async_trait]
impl Node<ConversationState> for FinalizeNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        // Transcript form: when the iteration ceiling forces finalization,
        // the history can still hold an unanswered tool-call batch.
        let messages: Vec<Value> = vec![serde_json::json!({
            "role": "user",
            "content": format!(
                "CONVERSATION:\n{}\n\n{}\n\n{}",
                state.transcript(),
                FINALIZE_OUTPUT_PROMPT,
                Self::final_values(state)
            ),
        })];

        let summary = match self
            .ctx
            .provider
            .chat_structured(
                &self.ctx.model,
                &messages,
                FinalSummary::SCHEMA_NAME,
                &FinalSummary::schema(),
            )
            .await
            .and_then(|raw| Ok(serde_json::from_value::<FinalSummary>(raw)?))
        {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Finalization call failed, using fallback summary");
                FinalSummary {
                    agent_summary: Self::fallback_summary(state),
                    status: FinalStatus::Partial,
                }
            }
        };

        let status = match summary.status {
            FinalStatus::Success => Status::Success,
            FinalStatus::Partial => Status::Partial,
        };
        info!(%status, "Finalized query");

        state.push(Message::assistant(summary.agent_summary.clone()));
        state.agent_summary = Some(summary.agent_summary);
        state.status = Some(status);
        Ok(())
    }
}
