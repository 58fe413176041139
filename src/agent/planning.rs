use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::prompts::{approved_plan_message, plan_prompt, PLAN_ANALYSIS_PROMPT};
use super::schemas::PlanToolAudit;
use super::PipelineCtx;
use crate::graph::Node;
use crate::state::{ConversationState, Status};
use crate::traits::Message;

/// Generate a numbered tool-usage plan before the loop starts.
pub struct PlanNode {
    pub ctx: Arc<PipelineCtx>,
}

#[async_trait]
impl Node<ConversationState> for PlanNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let prompt = plan_prompt(&self.ctx.registry.catalog_text());
        let mut messages: Vec<Value> =
            vec![serde_json::json!({"role": "system", "content": prompt})];
        messages.extend(state.wire_messages());

        let response = self
            .ctx
            .provider
            .chat(&self.ctx.model, &messages, &[])
            .await?;

        match response.content.filter(|c| !c.trim().is_empty()) {
            Some(plan) => {
                info!(steps = plan.lines().count(), "Generated plan");
                state.push(Message::assistant(plan.clone()));
                state.plan = Some(plan);
            }
            None => {
                // No plan is not an error: analysis is skipped and the loop
                // starts unguided.
                warn!("Planner returned no content, proceeding without a plan");
            }
        }
        Ok(())
    }
}

/// Audit the generated plan against the registry before any tool runs.
pub struct AnalyzePlanNode {
    pub ctx: Arc<PipelineCtx>,
}

#[async_trait]
impl Node<ConversationState> for AnalyzePlanNode {
    async fn run(&self, state: &mut ConversationState) -> anyhow::Result<()> {
        let Some(plan) = state.plan.clone() else {
            // Routing never sends a plan-less state here; treat it as a no-op.
            state.tools_missing = Some(false);
            return Ok(());
        };

        let messages = vec![serde_json::json!({
            "role": "user",
            "content": format!("{}\n\nPLAN:\n{}", PLAN_ANALYSIS_PROMPT, plan),
        })];
        let raw = self
            .ctx
            .provider
            .chat_structured(
                &self.ctx.model,
                &messages,
                PlanToolAudit::SCHEMA_NAME,
                &PlanToolAudit::schema(),
            )
            .await?;
        let audit: PlanToolAudit = serde_json::from_value(raw)?;

        let registered = self.ctx.registry.names();
        let missing: Vec<_> = audit
            .referenced_tools
            .iter()
            .filter(|t| !registered.contains(&t.name))
            .collect();

        if missing.is_empty() {
            info!(
                referenced = audit.referenced_tools.len(),
                "Plan audit passed"
            );
            state.tools_missing = Some(false);
            state.push(Message::system(approved_plan_message(&plan)));
            return Ok(());
        }

        let listing = missing
            .iter()
            .map(|t| format!("{} ({})", t.name, t.purpose))
            .collect::<Vec<_>>()
            .join("; ");
        let summary = format!(
            "MISSING_TOOLS: the plan references tools that are not registered: {}",
            listing
        );
        warn!(missing = %listing, "Plan references unregistered tools");

        state.tools_missing = Some(true);
        state.status = Some(Status::Failure);
        state.agent_summary = Some(summary.clone());
        state.push(Message::assistant(summary));
        Ok(())
    }
}

/// After plan generation: audit it, or skip straight to the loop when the
/// planner produced nothing.
pub fn route_plan(state: &ConversationState) -> String {
    if state.plan.is_some() {
        "analyze_plan".to_string()
    } else {
        "agent".to_string()
    }
}

/// After the audit: missing tools end the pipeline, otherwise enter the loop.
pub fn route_plan_analysis(state: &ConversationState) -> String {
    if state.tools_missing == Some(true) {
        "end".to_string()
    } else {
        "agent".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_routing_skips_analysis_without_a_plan() {
        let mut state = ConversationState::new("q");
        assert_eq!(route_plan(&state), "agent");
        state.plan = Some("1. get_current_datetime_info".to_string());
        assert_eq!(route_plan(&state), "analyze_plan");
    }

    #[test]
    fn analysis_routing_ends_on_missing_tools() {
        let mut state = ConversationState::new("q");
        state.tools_missing = Some(false);
        assert_eq!(route_plan_analysis(&state), "agent");
        state.tools_missing = Some(true);
        assert_eq!(route_plan_analysis(&state), "end");
    }
}
