use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::GraphState;
use crate::traits::{Message, ToolCall};

/// Terminal status of a query, set exactly once per pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Partial,
    Failure,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failure => "failure",
            Status::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// The single mutable record threaded through every pipeline node.
///
/// Created fresh per incoming query and discarded after the terminal node.
/// `messages` is append-only and is the sole channel through which the model
/// capability receives context: every tool result, reflection, and system
/// instruction must land here before the next model invocation.
#[derive(Debug, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// Incremented exactly once per completed tool-execution batch.
    pub tool_iteration_count: usize,
    pub is_profiling: Option<bool>,
    pub username: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub plan: Option<String>,
    pub tools_missing: Option<bool>,
    pub agent_summary: Option<String>,
    pub status: Option<Status>,
}

impl ConversationState {
    pub fn new(query: &str) -> Self {
        Self {
            messages: vec![Message::user(query)],
            ..Default::default()
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// The original user query (first user message).
    pub fn user_query(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == "user")
            .and_then(|m| m.content.as_deref())
            .unwrap_or_default()
    }

    /// OpenAI wire format of the full history.
    pub fn wire_messages(&self) -> Vec<Value> {
        self.messages.iter().map(Message::to_wire).collect()
    }

    /// Tool calls attached to the most recent assistant message, i.e. the
    /// pending batch from the last decision step.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "assistant")
            .map(Message::tool_calls)
            .unwrap_or_default()
    }

    /// Plain-text transcript of the conversation, used by structured
    /// extraction calls. Tool calls and observations render inline so the
    /// transcript stays valid even when a decision's calls are still
    /// unanswered (e.g. when the iteration ceiling forces finalization).
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                let content = m.content.as_deref().unwrap_or_default();
                if m.role == "tool" {
                    format!("tool[{}]: {}", m.tool_name.as_deref().unwrap_or("?"), content)
                } else {
                    let mut line = format!("{}: {}", m.role, content);
                    for call in m.tool_calls() {
                        line.push_str(&format!(
                            "\n{} -> tool call {}({})",
                            m.role, call.name, call.arguments
                        ));
                    }
                    line
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True if a system message with exactly this content is already present.
    pub fn has_system_message(&self, content: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == "system" && m.content.as_deref() == Some(content))
    }

    /// Fill `username` only if unset — once extracted, a later null or
    /// conflicting extraction never downgrades it.
    pub fn set_username_if_missing(&mut self, username: Option<String>) {
        if self.username.is_none() {
            if let Some(name) = username.filter(|s| !s.trim().is_empty()) {
                self.username = Some(name);
            }
        }
    }

    /// Refresh the time window with freshly extracted values. A present value
    /// replaces the previous one; a null extraction leaves it untouched
    /// (last-non-null-wins, not last-write-wins).
    pub fn refresh_time_window(&mut self, start: Option<String>, end: Option<String>) {
        if let Some(s) = start.filter(|s| !s.trim().is_empty()) {
            self.start_time = Some(s);
        }
        if let Some(e) = end.filter(|s| !s.trim().is_empty()) {
            self.end_time = Some(e);
        }
    }
}

impl GraphState for ConversationState {
    fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_never_downgraded() {
        let mut state = ConversationState::new("show me cpu for alice");
        state.set_username_if_missing(Some("alice".to_string()));
        state.set_username_if_missing(None);
        state.set_username_if_missing(Some("bob".to_string()));
        state.set_username_if_missing(Some("".to_string()));
        assert_eq!(state.username.as_deref(), Some("alice"));
    }

    #[test]
    fn empty_extraction_does_not_set_username() {
        let mut state = ConversationState::new("q");
        state.set_username_if_missing(Some("  ".to_string()));
        assert!(state.username.is_none());
    }

    #[test]
    fn time_window_refreshes_on_non_null_only() {
        let mut state = ConversationState::new("q");
        state.refresh_time_window(
            Some("2025-01-01T00:00:00-05:00".to_string()),
            Some("2025-01-02T00:00:00-05:00".to_string()),
        );
        state.refresh_time_window(Some("2025-01-03T00:00:00-05:00".to_string()), None);
        assert_eq!(
            state.start_time.as_deref(),
            Some("2025-01-03T00:00:00-05:00")
        );
        assert_eq!(state.end_time.as_deref(), Some("2025-01-02T00:00:00-05:00"));
    }

    #[test]
    fn pending_tool_calls_come_from_most_recent_assistant_message() {
        let mut state = ConversationState::new("q");
        let calls = vec![ToolCall {
            id: "call_1".to_string(),
            name: "get_one_hour_ago".to_string(),
            arguments: "{}".to_string(),
        }];
        state.push(Message::assistant_with_tool_calls(None, &calls));
        state.push(Message::tool_result("call_1", "get_one_hour_ago", "Time one hour ago: x"));
        assert_eq!(state.pending_tool_calls().len(), 1);

        state.push(Message::assistant("all done"));
        assert!(state.pending_tool_calls().is_empty());
    }

    #[test]
    fn transcript_renders_tool_calls_and_observations_inline() {
        let mut state = ConversationState::new("profile alice");
        state.push(Message::assistant_with_tool_calls(
            None,
            &[ToolCall {
                id: "call_1".to_string(),
                name: "check_weekday".to_string(),
                arguments: r#"{"date_str": "2025-11-01"}"#.to_string(),
            }],
        ));
        state.push(Message::tool_result(
            "call_1",
            "check_weekday",
            "Date 2025-11-01 is a Saturday",
        ));

        let transcript = state.transcript();
        assert!(transcript.starts_with("user: profile alice"));
        assert!(transcript.contains("assistant -> tool call check_weekday("));
        assert!(transcript.contains("tool[check_weekday]: Date 2025-11-01 is a Saturday"));
    }

    #[test]
    fn system_message_dedupe_check() {
        let mut state = ConversationState::new("q");
        assert!(!state.has_system_message("instruction"));
        state.push(Message::system("instruction"));
        assert!(state.has_system_message("instruction"));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Rejected).unwrap(), "\"rejected\"");
        assert_eq!(Status::Partial.to_string(), "partial");
    }
}
