use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the per-query conversation. Immutable once appended to
/// [`crate::state::ConversationState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "system", "user", "assistant", or "tool".
    pub role: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Serialized `Vec<ToolCall>` attached to an assistant message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    /// An assistant message carrying tool calls (content may be empty).
    pub fn assistant_with_tool_calls(content: Option<String>, calls: &[ToolCall]) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            tool_call_id: None,
            tool_name: None,
            tool_calls_json: serde_json::to_string(calls).ok(),
            created_at: Utc::now(),
        }
    }

    /// A tool-result observation answering one tool call.
    pub fn tool_result(call_id: &str, tool_name: &str, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_call_id: Some(call_id.to_string()),
            tool_name: Some(tool_name.to_string()),
            tool_calls_json: None,
            created_at: Utc::now(),
        }
    }

    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_name: None,
            tool_calls_json: None,
            created_at: Utc::now(),
        }
    }

    /// Tool calls attached to this message, if any.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.tool_calls_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// OpenAI chat-completions wire format for this message.
    pub fn to_wire(&self) -> Value {
        let mut msg = serde_json::json!({
            "role": self.role,
            "content": self.content.clone().unwrap_or_default(),
        });
        if let Some(ref id) = self.tool_call_id {
            msg["tool_call_id"] = Value::String(id.clone());
        }
        let calls = self.tool_calls();
        if !calls.is_empty() {
            let calls: Vec<Value> = calls
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments },
                    })
                })
                .collect();
            msg["tool_calls"] = Value::Array(calls);
        }
        msg
    }
}

/// A single tool call as returned by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

/// A deterministic, registry-bound tool the decision node may invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// OpenAI-format function schema as a JSON Value.
    fn schema(&self) -> Value;
    /// Execute with a JSON arguments string, returning observation text.
    async fn call(&self, arguments: &str) -> anyhow::Result<String>;
}

/// Token usage statistics from an LLM API response.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub model: String,
}

/// The LLM's response: content text, tool calls, or both.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<TokenUsage>,
}

/// Model provider — sends messages (+ optional tool defs) to an LLM.
///
/// Constructed once at startup and shared as `Arc<dyn ModelProvider>`;
/// providers hold no per-query state, so concurrent use is safe.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        messages: &[Value],
        tools: &[Value],
    ) -> anyhow::Result<ProviderResponse>;

    /// Structured output: constrain the response to `schema` and return the
    /// parsed JSON object.
    async fn chat_structured(
        &self,
        model: &str,
        messages: &[Value],
        schema_name: &str,
        schema: &Value,
    ) -> anyhow::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_calls_round_trip_through_json() {
        let calls = vec![ToolCall {
            id: "call_1".to_string(),
            name: "get_one_hour_ago".to_string(),
            arguments: "{}".to_string(),
        }];
        let msg = Message::assistant_with_tool_calls(None, &calls);
        let parsed = msg.tool_calls();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "get_one_hour_ago");
    }

    #[test]
    fn wire_format_includes_tool_call_id_for_tool_results() {
        let msg = Message::tool_result("call_9", "check_weekday", "Date 2025-11-01 is a Saturday");
        let wire = msg.to_wire();
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_9");
        assert_eq!(wire["content"], "Date 2025-11-01 is a Saturday");
    }

    #[test]
    fn wire_format_omits_tool_calls_when_absent() {
        let msg = Message::assistant("done");
        let wire = msg.to_wire();
        assert!(wire.get("tool_calls").is_none());
    }
}
