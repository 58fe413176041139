//! SSE chunk shapes for streaming consumers.
//!
//! Chunk types mirror the executor's two granularities: `message` for each
//! message as it is produced, `message_chain` for per-node batches, and a
//! terminal `final` chunk carrying the structured payload.

use serde_json::Value;

use crate::agent::AgentOutput;
use crate::graph::GraphEvent;

/// Wrap content as a typed chunk: `{"type": ..., "content": ...}`.
pub fn chunk(chunk_type: &str, content: Value) -> Value {
    serde_json::json!({"type": chunk_type, "content": content})
}

/// Chunks for one graph event, in emission order.
pub fn event_chunks(event: &GraphEvent) -> Vec<Value> {
    match event {
        GraphEvent::Message { message, .. } => {
            vec![chunk("message", serde_json::to_value(message).unwrap_or(Value::Null))]
        }
        GraphEvent::NodeUpdate { messages, .. } => messages
            .iter()
            .map(|m| chunk("message_chain", serde_json::to_value(m).unwrap_or(Value::Null)))
            .collect(),
    }
}

/// The terminal chunk carrying the full structured output.
pub fn final_chunk(output: &AgentOutput) -> Value {
    chunk("final", serde_json::to_value(output).unwrap_or(Value::Null))
}
