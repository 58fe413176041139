//! Structured-output payloads and their JSON schemas.
//!
//! Schemas follow the strict OpenAI `json_schema` response-format rules:
//! every property listed in `required`, `additionalProperties: false`, and
//! nullable fields typed `["string", "null"]`.

use serde::Deserialize;
use serde_json::{json, Value};

/// Classification result: is the query about profiling at all?
#[derive(Debug, Deserialize)]
pub struct QueryClassification {
    pub is_profiling: bool,
}

impl QueryClassification {
    pub const SCHEMA_NAME: &'static str = "query_classification";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_profiling": {
                    "type": "boolean",
                    "description": "True if the query is about profiling, performance analysis, CPU usage, or similar performance-related topics"
                }
            },
            "required": ["is_profiling"],
            "additionalProperties": false
        })
    }
}

/// Opportunistic metadata pulled from the conversation on every decision pass.
#[derive(Debug, Deserialize)]
pub struct MetadataExtraction {
    pub username: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl MetadataExtraction {
    pub const SCHEMA_NAME: &'static str = "metadata_extraction";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {
                    "type": ["string", "null"],
                    "description": "Username extracted from the user's message, or null if not found"
                },
                "start_time": {
                    "type": ["string", "null"],
                    "description": "Start time in ISO 8601 format extracted from the conversation, or null if not found"
                },
                "end_time": {
                    "type": ["string", "null"],
                    "description": "End time in ISO 8601 format extracted from the conversation, or null if not found"
                }
            },
            "required": ["username", "start_time", "end_time"],
            "additionalProperties": false
        })
    }
}

/// One tool explicitly referenced in the generated plan.
#[derive(Debug, Deserialize)]
pub struct ReferencedTool {
    pub name: String,
    pub purpose: String,
}

/// Audit of the generated plan against the tool registry.
#[derive(Debug, Deserialize)]
pub struct PlanToolAudit {
    pub referenced_tools: Vec<ReferencedTool>,
}

impl PlanToolAudit {
    pub const SCHEMA_NAME: &'static str = "plan_tool_audit";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "referenced_tools": {
                    "type": "array",
                    "description": "Every tool name explicitly referenced in the plan",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Exact tool name as written in the plan"
                            },
                            "purpose": {
                                "type": "string",
                                "description": "What the plan expects this tool to do"
                            }
                        },
                        "required": ["name", "purpose"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["referenced_tools"],
            "additionalProperties": false
        })
    }
}

/// Terminal summary produced by the finalize node.
#[derive(Debug, Deserialize)]
pub struct FinalSummary {
    pub agent_summary: String,
    pub status: FinalStatus,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalStatus {
    Success,
    Partial,
}

impl FinalSummary {
    pub const SCHEMA_NAME: &'static str = "final_summary";

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent_summary": {
                    "type": "string",
                    "description": "Single-paragraph summary of what was accomplished and the final result"
                },
                "status": {
                    "type": "string",
                    "enum": ["success", "partial"],
                    "description": "success when username and both times were extracted; partial otherwise"
                }
            },
            "required": ["agent_summary", "status"],
            "additionalProperties": false
        })
    }
}
