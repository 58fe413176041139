//! Generic state-graph executor: named nodes, conditional edges keyed by a
//! routing function's return label, and a hard step ceiling so the whole
//! graph halts even if a routing bug would otherwise loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::traits::Message;

/// Sentinel routing target marking graph termination.
pub const END: &str = "__end__";

/// State types the executor can stream messages out of.
pub trait GraphState {
    fn messages(&self) -> &[Message];
}

/// A single pipeline step. Nodes mutate the state and append messages; they
/// never route — routing lives in the edge table.
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn run(&self, state: &mut S) -> anyhow::Result<()>;
}

type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

enum Edge<S> {
    Direct(String),
    Conditional {
        router: RouterFn<S>,
        targets: HashMap<String, String>,
    },
}

/// Incremental execution events for streaming consumers. Messages are
/// observed in the exact append order used internally; no reordering or
/// coalescing across node boundaries.
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// One newly appended message.
    Message { node: String, message: Message },
    /// The batch of messages a node appended, emitted at the node boundary.
    NodeUpdate { node: String, messages: Vec<Message> },
}

pub struct GraphExecutor<S> {
    nodes: HashMap<String, Box<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    entry: Option<String>,
    step_limit: usize,
}

impl<S: GraphState + Send> GraphExecutor<S> {
    /// `step_limit` bounds total node executions per run, independent of any
    /// bound a node enforces internally.
    pub fn new(step_limit: usize) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            step_limit,
        }
    }

    pub fn add_node(&mut self, name: &str, node: Box<dyn Node<S>>) {
        self.nodes.insert(name.to_string(), node);
    }

    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.edges.insert(from.to_string(), Edge::Direct(to.to_string()));
    }

    /// Route `from` through `router`: its return label is looked up in
    /// `targets` (label → node name, or [`END`]).
    pub fn add_conditional_edges(
        &mut self,
        from: &str,
        router: impl Fn(&S) -> String + Send + Sync + 'static,
        targets: &[(&str, &str)],
    ) {
        self.edges.insert(
            from.to_string(),
            Edge::Conditional {
                router: Arc::new(router),
                targets: targets
                    .iter()
                    .map(|(label, node)| (label.to_string(), node.to_string()))
                    .collect(),
            },
        );
    }

    pub fn set_entry_point(&mut self, name: &str) {
        self.entry = Some(name.to_string());
    }

    /// Execute nodes strictly sequentially from the entry point until an
    /// edge routes to [`END`]. When `events` is provided, every appended
    /// message is emitted as it is produced, plus one batch event per node.
    ///
    /// Exceeding the step ceiling is a fatal configuration/logic error, not
    /// a retryable condition.
    pub async fn run(
        &self,
        state: &mut S,
        events: Option<&mpsc::Sender<GraphEvent>>,
    ) -> anyhow::Result<()> {
        let mut current = self
            .entry
            .clone()
            .ok_or_else(|| anyhow::anyhow!("graph has no entry point"))?;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.step_limit {
                anyhow::bail!(
                    "graph exceeded step ceiling ({}) at node '{}' — routing bug or misconfigured limit",
                    self.step_limit,
                    current
                );
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| anyhow::anyhow!("edge routed to unknown node '{}'", current))?;

            debug!(node = %current, step = steps, "Running graph node");
            let before = state.messages().len();
            node.run(state).await?;

            if let Some(tx) = events {
                let appended: Vec<Message> = state.messages()[before..].to_vec();
                for message in &appended {
                    let _ = tx
                        .send(GraphEvent::Message {
                            node: current.clone(),
                            message: message.clone(),
                        })
                        .await;
                }
                if !appended.is_empty() {
                    let _ = tx
                        .send(GraphEvent::NodeUpdate {
                            node: current.clone(),
                            messages: appended,
                        })
                        .await;
                }
            }

            let next = match self.edges.get(&current) {
                Some(Edge::Direct(to)) => to.clone(),
                Some(Edge::Conditional { router, targets }) => {
                    let label = router(state);
                    targets.get(&label).cloned().ok_or_else(|| {
                        anyhow::anyhow!(
                            "node '{}' routed to unmapped label '{}'",
                            current,
                            label
                        )
                    })?
                }
                None => anyhow::bail!("node '{}' has no outgoing edge", current),
            };

            if next == END {
                debug!(node = %current, steps, "Graph reached END");
                return Ok(());
            }
            current = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CounterState {
        messages: Vec<Message>,
        visits: usize,
    }

    impl GraphState for CounterState {
        fn messages(&self) -> &[Message] {
            &self.messages
        }
    }

    struct AppendNode(&'static str);

    #[async_trait]
    impl Node<CounterState> for AppendNode {
        async fn run(&self, state: &mut CounterState) -> anyhow::Result<()> {
            state.visits += 1;
            state.messages.push(Message::assistant(self.0));
            Ok(())
        }
    }

    struct SilentNode;

    #[async_trait]
    impl Node<CounterState> for SilentNode {
        async fn run(&self, state: &mut CounterState) -> anyhow::Result<()> {
            state.visits += 1;
            Ok(())
        }
    }

    fn two_node_graph() -> GraphExecutor<CounterState> {
        let mut graph = GraphExecutor::new(10);
        graph.add_node("first", Box::new(AppendNode("from first")));
        graph.add_node("second", Box::new(AppendNode("from second")));
        graph.set_entry_point("first");
        graph.add_edge("first", "second");
        graph.add_edge("second", END);
        graph
    }

    #[tokio::test]
    async fn runs_nodes_in_edge_order() {
        let graph = two_node_graph();
        let mut state = CounterState::default();
        graph.run(&mut state, None).await.unwrap();
        assert_eq!(state.visits, 2);
        let contents: Vec<_> = state
            .messages
            .iter()
            .map(|m| m.content.clone().unwrap())
            .collect();
        assert_eq!(contents, vec!["from first", "from second"]);
    }

    #[tokio::test]
    async fn conditional_edges_follow_router_label() {
        let mut graph = GraphExecutor::new(10);
        graph.add_node("start", Box::new(SilentNode));
        graph.add_node("left", Box::new(AppendNode("left")));
        graph.add_node("right", Box::new(AppendNode("right")));
        graph.set_entry_point("start");
        graph.add_conditional_edges(
            "start",
            |state: &CounterState| {
                if state.visits % 2 == 1 { "odd".to_string() } else { "even".to_string() }
            },
            &[("odd", "left"), ("even", "right")],
        );
        graph.add_edge("left", END);
        graph.add_edge("right", END);

        let mut state = CounterState::default();
        graph.run(&mut state, None).await.unwrap();
        assert_eq!(state.messages[0].content.as_deref(), Some("left"));
    }

    #[tokio::test]
    async fn step_ceiling_halts_cyclic_graphs() {
        let mut graph = GraphExecutor::new(5);
        graph.add_node("a", Box::new(SilentNode));
        graph.add_node("b", Box::new(SilentNode));
        graph.set_entry_point("a");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");

        let mut state = CounterState::default();
        let err = graph.run(&mut state, None).await.unwrap_err();
        assert!(err.to_string().contains("step ceiling"), "{}", err);
        assert_eq!(state.visits, 5);
    }

    #[tokio::test]
    async fn unmapped_router_label_is_an_error() {
        let mut graph = GraphExecutor::new(5);
        graph.add_node("start", Box::new(SilentNode));
        graph.set_entry_point("start");
        graph.add_conditional_edges(
            "start",
            |_: &CounterState| "nowhere".to_string(),
            &[("somewhere", END)],
        );
        let mut state = CounterState::default();
        let err = graph.run(&mut state, None).await.unwrap_err();
        assert!(err.to_string().contains("unmapped label"), "{}", err);
    }

    #[tokio::test]
    async fn streams_messages_in_append_order_with_node_batches() {
        let graph = two_node_graph();
        let (tx, mut rx) = mpsc::channel(16);
        let mut state = CounterState::default();
        graph.run(&mut state, Some(&tx)).await.unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }
        // message + batch per node, in order
        assert_eq!(events.len(), 4);
        match (&events[0], &events[1]) {
            (GraphEvent::Message { node, message }, GraphEvent::NodeUpdate { messages, .. }) => {
                assert_eq!(node, "first");
                assert_eq!(message.content.as_deref(), Some("from first"));
                assert_eq!(messages.len(), 1);
            }
            other => panic!("unexpected event order: {:?}", other),
        }
        match &events[2] {
            GraphEvent::Message { node, message } => {
                assert_eq!(node, "second");
                assert_eq!(message.content.as_deref(), Some("from second"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
