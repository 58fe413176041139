//! Test infrastructure: MockProvider and MockTool.
//!
//! Provides a scripted LLM so integration tests can exercise the real
//! pipeline graph end to end.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::traits::{ModelProvider, ProviderResponse, TokenUsage, Tool, ToolCall};

/// A recorded call to `MockProvider::chat()` or `chat_structured()`.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct MockChatCall {
    pub model: String,
    pub messages: Vec<Value>,
    pub tools: Vec<Value>,
    /// Schema name for structured calls, `None` for plain chat.
    pub schema: Option<String>,
}

/// Mock LLM provider that returns scripted responses.
///
/// `chat` pops from a FIFO queue of [`ProviderResponse`]s; `chat_structured`
/// pops from a separate FIFO queue of JSON values. When a queue is empty, a
/// schema-appropriate default is returned so tests only script the turns
/// they care about.
pub struct MockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    structured: Mutex<Vec<Value>>,
    /// When set, an empty chat queue yields this tool call forever —
    /// used to prove the loop bound holds regardless of model behavior.
    endless_tool_call: Option<(String, String)>,
    pub call_log: Mutex<Vec<MockChatCall>>,
}

impl MockProvider {
    /// A provider that always answers "Mock response" / schema defaults.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            structured: Mutex::new(Vec::new()),
            endless_tool_call: None,
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// FIFO queue of scripted chat responses.
    pub fn with_responses(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            ..Self::new()
        }
    }

    /// Add a FIFO queue of scripted structured-output values.
    pub fn and_structured(mut self, values: Vec<Value>) -> Self {
        self.structured = Mutex::new(values);
        self
    }

    /// Once the chat queue drains, emit this tool call on every chat turn.
    pub fn and_endless_tool_call(mut self, name: &str, args: &str) -> Self {
        self.endless_tool_call = Some((name.to_string(), args.to_string()));
        self
    }

    /// Helper: build a text-only ProviderResponse.
    pub fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                model: "mock".to_string(),
            }),
        }
    }

    /// Helper: build a single-tool-call ProviderResponse.
    pub fn tool_call_response(tool_name: &str, args: &str) -> ProviderResponse {
        Self::tool_calls_response(&[(tool_name, args)])
    }

    /// Helper: build a multi-call ProviderResponse (one batch).
    pub fn tool_calls_response(calls: &[(&str, &str)]) -> ProviderResponse {
        ProviderResponse {
            content: None,
            tool_calls: calls
                .iter()
                .map(|(name, args)| ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4()),
                    name: name.to_string(),
                    arguments: args.to_string(),
                })
                .collect(),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                model: "mock".to_string(),
            }),
        }
    }

    /// How many chat (non-structured) calls were made.
    pub async fn chat_call_count(&self) -> usize {
        self.call_log
            .lock()
            .await
            .iter()
            .filter(|c| c.schema.is_none())
            .count()
    }

    /// How many structured calls were made.
    pub async fn structured_call_count(&self) -> usize {
        self.call_log
            .lock()
            .await
            .iter()
            .filter(|c| c.schema.is_some())
            .count()
    }

    fn default_structured(schema_name: &str) -> Value {
        match schema_name {
            "query_classification" => json!({"is_profiling": true}),
            "metadata_extraction" => {
                json!({"username": null, "start_time": null, "end_time": null})
            }
            "plan_tool_audit" => json!({"referenced_tools": []}),
            "final_summary" => json!({"agent_summary": "Mock summary", "status": "partial"}),
            _ => json!({}),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Value],
        tools: &[Value],
    ) -> anyhow::Result<ProviderResponse> {
        self.call_log.lock().await.push(MockChatCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            schema: None,
        });

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            if let Some((name, args)) = &self.endless_tool_call {
                return Ok(MockProvider::tool_call_response(name, args));
            }
            Ok(MockProvider::text_response("Mock response"))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn chat_structured(
        &self,
        model: &str,
        messages: &[Value],
        schema_name: &str,
        _schema: &Value,
    ) -> anyhow::Result<Value> {
        self.call_log.lock().await.push(MockChatCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: vec![],
            schema: Some(schema_name.to_string()),
        });

        let mut structured = self.structured.lock().await;
        if structured.is_empty() {
            Ok(Self::default_structured(schema_name))
        } else {
            Ok(structured.remove(0))
        }
    }
}

/// A configurable fake tool for simulating registry entries in tests.
#[allow(dead_code)]
pub struct MockTool {
    tool_name: String,
    tool_description: String,
    return_value: String,
}

#[allow(dead_code)]
impl MockTool {
    pub fn new(name: &str, description: &str, return_value: &str) -> Self {
        Self {
            tool_name: name.to_string(),
            tool_description: description.to_string(),
            return_value: return_value.to_string(),
        }
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.tool_name
    }

    fn description(&self) -> &str {
        &self.tool_description
    }

    fn schema(&self) -> Value {
        json!({
            "name": self.tool_name,
            "description": self.tool_description,
            "parameters": {
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }
        })
    }

    async fn call(&self, _args: &str) -> anyhow::Result<String> {
        Ok(self.return_value.clone())
    }
}
