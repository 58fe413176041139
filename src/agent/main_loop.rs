use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::prompts::{
    metadata_extraction_prompt, GLOBAL_SYSTEM_PROMPT, METADATA_PULL_PROMPT, REFLECTION_PROMPT,
};
use super::schemas::MetadataExtraction;
use super::PipelineCtx;
use crate::graph::Node;
use crate::state::ConversationState;
use crate::traits::Message;

/// The decision step: reflect, then choose tool calls or a terminal answer,
/// then opportunistically pull metadata from the whole conversation.
pub struct DecisionNode {
    pub ctx: Arc<PipelineCtx>,
}

impl DecisionNode {
    /// Two-sentence reflection appended as an assistant message.
    async fn reflect(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let mut messages = state.wire_messages();
        messages.push(serde_json::json!({"role": "user", "content": REFLECTION_PROMPT}));

        let response = self
            .ctx
            .provider
            .chat(&self.ctx.model, &messages, &[])
            .await?;
        if let Some(reflection) = response.content.filter(|c| !c.trim().is_empty()) {
            debug!(reflection = %reflection, "Reflection");
            state.push(Message::assistant(reflection));
        }
        Ok(())
    }

    /// Tool-binding invocation: zero or more tool calls, or a final answer.
    async fn decide(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let prompt = metadata_extraction_prompt(&self.ctx.registry.catalog_text());
        let mut messages: Vec<Value> =
            vec![serde_json::json!({"role": "system", "content": prompt})];
        messages.extend(state.wire_messages());

        let tool_defs = self.ctx.registry.definitions();
        let response = self
            .ctx
            .provider
            .chat(&self.ctx.model, &messages, &tool_defs)
            .await?;

        // Providers occasionally return calls without ids; every call needs
        // one so its observation can reference it.
        let mut calls = response.tool_calls;
        for call in calls.iter_mut() {
            if call.id.is_empty() {
                call.id = format!("call_{}", Uuid::new_v4());
            }
        }

        if let Some(usage) = &response.usage {
            debug!(
                model = %usage.model,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Decision usage"
            );
        }
        info!(
            tool_calls = calls.len(),
            iteration = state.tool_iteration_count,
            "Decision step"
        );
        state.push(Message::assistant_with_tool_calls(response.content, &calls));
        Ok(())
    }

    /// Structured metadata pull over the full conversation, merged with
    /// last-non-null-wins semantics. Extraction is opportunistic: a failed
    /// pull is logged and skipped, never fatal.
    async fn extract_metadata(&self, state: &mut ConversationState) {
        // The transcript form keeps the request valid even while the latest
        // decision's tool calls are still unanswered.
        let messages = vec![serde_json::json!({
            "role": "user",
            "content": format!(
                "CONVERSATION:\n{}\n\n{}",
                state.transcript(),
                METADATA_PULL_PROMPT
            ),
        })];

        let raw = match self
            .ctx
            .provider
            .chat_structured(
                &self.ctx.model,
                &messages,
                MetadataExtraction::SCHEMA_NAME,
                &MetadataExtraction::schema(),
            )
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Metadata extraction failed, skipping this pass");
                return;
            }
        };

        match serde_json::from_value::<MetadataExtraction>(raw) {
            Ok(extracted) => {
                debug!(
                    username = ?extracted.username,
                    start_time = ?extracted.start_time,
                    end_time = ?extracted.end_time,
                    "Extracted metadata"
                );
                state.set_username_if_missing(extracted.username);
                state.refresh_time_window(extracted.start_time, extracted.end_time);
            }
            Err(e) => warn!(error = %e, "Malformed metadata extraction, skipping this pass"),
        }
    }
}

#[async_trait]
impl Node<ConversationState> for DecisionNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        if !state.has_system_message(GLOBAL_SYSTEM_PROMPT) {
            state.push(Message::system(GLOBAL_SYSTEM_PROMPT));
        }

        self.reflect(state).await?;
        self.decide(state).await?;
        self.extract_metadata(state).await;
        Ok(())
    }
}

/// Execute the most recent decision's tool calls, one observation per call,
/// in call order. Failures become observations; the batch never aborts.
pub struct ToolExecutionNode {
    pub ctx: Arc<PipelineCtx>,
}

#[async_trait]
impl Node<ConversationState> for ToolExecutionNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let calls = state.pending_tool_calls();

        for call in &calls {
            let observation = match self.ctx.registry.lookup(&call.name) {
                None => {
                    let available = self
                        .ctx
                        .registry
                        .names()
                        .into_iter()
                        .collect::<Vec<_>>()
                        .join(", ");
                    warn!(tool = %call.name, "Unknown tool requested");
                    format!(
                        "Unknown tool '{}'. Available tools: [{}]. Use one of these or respond with text only.",
                        call.name, available
                    )
                }
                Some(tool) => match tool.call(&call.arguments).await {
                    Ok(result) => {
                        info!(tool = %call.name, "Tool executed");
                        result
                    }
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool execution failed");
                        format!("Error executing tool '{}': {}", call.name, e)
                    }
                },
            };
            state.push(Message::tool_result(&call.id, &call.name, observation));
        }

        // One increment per batch, not per call.
        state.tool_iteration_count += 1;
        info!(
            batch_size = calls.len(),
            iteration = state.tool_iteration_count,
            "Completed tool batch"
        );
        Ok(())
    }
}

/// Transition rule evaluated after each decision. The iteration ceiling wins
/// over pending calls, so the loop always terminates (fail-open).
pub fn route_decision(max_tool_iterations: usize) -> impl Fn(&ConversationState) -> String {
    move |state: &ConversationState| {
        if state.tool_iteration_count >= max_tool_iterations {
            "finalize".to_string()
        } else if !state.pending_tool_calls().is_empty() {
            "tools".to_string()
        } else {
            "finalize".to_string()
        }
    }
}
