//! Pipeline assembly: the state graph wiring every node from classification
//! through finalization, and the per-query entry point.

mod classify;
mod finalize;
mod main_loop;
mod planning;
pub mod prompts;
pub mod schemas;

use std::sync::Arc;

use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

pub use classify::{ClassifyNode, RejectNode};
pub use finalize::FinalizeNode;
pub use main_loop::{DecisionNode, ToolExecutionNode};
pub use planning::{AnalyzePlanNode, PlanNode};

use crate::graph::{GraphEvent, GraphExecutor, END};
use crate::state::{ConversationState, Status};
use crate::tools::ToolRegistry;
use crate::traits::{Message, ModelProvider};

/// Shared, read-only context injected into every node: the model capability,
/// the tool registry, and the loop bound. Built once at startup.
pub struct PipelineCtx {
    pub provider: Arc<dyn ModelProvider>,
    pub model: String,
    pub registry: Arc<ToolRegistry>,
    pub max_tool_iterations: usize,
}

/// Structured result of one query run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    pub username: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub agent_summary: String,
    pub status: Status,
    pub messages: Vec<Message>,
}

impl AgentOutput {
    fn from_state(state: ConversationState) -> Self {
        Self {
            username: state.username,
            start_time: state.start_time,
            end_time: state.end_time,
            agent_summary: state.agent_summary.unwrap_or_default(),
            // A missing status here means a terminal node was skipped by a
            // wiring bug; report partial rather than inventing success.
            status: state.status.unwrap_or(Status::Partial),
            messages: state.messages,
        }
    }
}

/// The query pipeline: a compiled state graph plus its shared context.
///
/// One `Agent` serves many concurrent queries; each `handle_query` run owns
/// a fresh [`ConversationState`].
pub struct Agent {
    graph: GraphExecutor<ConversationState>,
    max_tool_iterations: usize,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: String,
        tz: Tz,
        max_tool_iterations: usize,
    ) -> Self {
        let ctx = Arc::new(PipelineCtx {
            provider,
            model,
            registry: Arc::new(ToolRegistry::new(tz)),
            max_tool_iterations,
        });
        Self {
            graph: build_graph(ctx),
            max_tool_iterations,
        }
    }

    /// Run one query through the pipeline. When `events` is provided, every
    /// appended message is streamed out as it is produced.
    pub async fn handle_query(
        &self,
        query: &str,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> anyhow::Result<AgentOutput> {
        info!(query, max_tool_iterations = self.max_tool_iterations, "Handling query");
        let mut state = ConversationState::new(query);
        self.graph.run(&mut state, events).await?;
        Ok(AgentOutput::from_state(state))
    }
}

/// Wire the pipeline graph:
/// classify → {plan | reject}; plan → {analyze_plan | agent};
/// analyze_plan → {agent | END}; agent ⇄ tools; agent → finalize → END.
fn build_graph(ctx: Arc<PipelineCtx>) -> GraphExecutor<ConversationState> {
    // Worst case per loop round is decision + tools (2 steps); the fixed
    // prologue/epilogue nodes add a handful more. Anything past this ceiling
    // is a routing bug, independent of the loop's own iteration bound.
    let step_limit = ctx.max_tool_iterations * 2 + 8;
    let mut graph = GraphExecutor::new(step_limit);

    graph.add_node("classify", Box::new(ClassifyNode { ctx: ctx.clone() }));
    graph.add_node("reject", Box::new(RejectNode));
    graph.add_node("plan", Box::new(PlanNode { ctx: ctx.clone() }));
    graph.add_node("analyze_plan", Box::new(AnalyzePlanNode { ctx: ctx.clone() }));
    graph.add_node("agent", Box::new(DecisionNode { ctx: ctx.clone() }));
    graph.add_node("tools", Box::new(ToolExecutionNode { ctx: ctx.clone() }));
    graph.add_node("finalize", Box::new(FinalizeNode { ctx: ctx.clone() }));

    graph.set_entry_point("classify");
    graph.add_conditional_edges(
        "classify",
        classify::route_classification,
        &[("plan", "plan"), ("reject", "reject")],
    );
    graph.add_conditional_edges(
        "plan",
        planning::route_plan,
        &[("analyze_plan", "analyze_plan"), ("agent", "agent")],
    );
    graph.add_conditional_edges(
        "analyze_plan",
        planning::route_plan_analysis,
        &[("agent", "agent"), ("end", END)],
    );
    graph.add_conditional_edges(
        "agent",
        main_loop::route_decision(ctx.max_tool_iterations),
        &[("tools", "tools"), ("finalize", "finalize")],
    );
    graph.add_edge("tools", "agent");
    graph.add_edge("finalize", END);
    graph.add_edge("reject", END);

    graph
}
