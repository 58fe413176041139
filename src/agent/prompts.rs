//! Prompt text for the pipeline's model invocations.

/// Classification instruction (classify node).
pub const CLASSIFICATION_PROMPT: &str =
    "Determine if the user's message is about profiling, performance analysis, \
     CPU/memory usage, or similar performance-related topics.";

/// Global instruction injected once into the agent loop's history.
pub const GLOBAL_SYSTEM_PROMPT: &str =
    "You are a profiling assistant. Extract time ranges and metadata from user queries. \
     Do NOT retrieve profiling data (CPU, memory, etc.) - that functionality is not implemented. \
     Focus on extracting time windows and user information. Keep responses concise and accurate.";

/// Fixed notice returned for out-of-scope queries (reject node).
pub const REJECTION_MESSAGE: &str =
    "I'm sorry, but this agent only processes queries related to user profiling, \
     performance analysis, CPU usage, and similar performance-related topics. \
     Please ask about profiling data.";

/// Decision-node instruction for the tool-binding call.
pub fn metadata_extraction_prompt(catalog: &str) -> String {
    format!(
        "Extract start_time and end_time in ISO 8601 format, and username from the user's message.\n\n\
         AVAILABLE TOOLS:\n{catalog}\n\n\
         INSTRUCTIONS:\n\
         - Absolute times (e.g., \"2024-01-15 14:00\"): Construct ISO 8601 directly without tools\n\
         - Relative times (e.g., \"last Tuesday\", \"yesterday\", \"1 hour ago\"): Use tools - get current time first\n\
         - Use tools for parsing ambiguous formats, timezone conversions, or date calculations\n\
         - CRITICAL: Only use tools listed above. Use EXACT parameter names from tool signatures\n\
         - Continue until both start_time and end_time are extracted in ISO 8601, or determined unavailable\n\
         - Extract username from user's message\n\
         - Return None for any field if not found"
    )
}

/// Plan-generation instruction (plan node).
pub fn plan_prompt(catalog: &str) -> String {
    format!(
        "Write a short numbered plan for extracting the username and the start/end time \
         window from the user's query.\n\n\
         AVAILABLE TOOLS:\n{catalog}\n\n\
         RULES:\n\
         - Name only tools from the list above\n\
         - Reference tool parameters by NAME only; never invent example values\n\
         - Mark steps that need no tool as \"no tool needed\"\n\
         - Keep it to the minimum number of steps"
    )
}

/// Plan-audit instruction (analyze_plan node).
pub const PLAN_ANALYSIS_PROMPT: &str =
    "Extract every tool name EXPLICITLY referenced in the plan below. \
     Ignore narrative text, ignore steps marked \"no tool needed\", and ignore implicit \
     actions (direct timestamp construction, text extraction) that do not name a tool. \
     For each referenced tool, state its expected purpose in the plan.";

/// Reflection instruction (decision node, first invocation).
pub const REFLECTION_PROMPT: &str =
    "Provide exactly 2 sentences:\n\
     1. What has been done so far (information gathered)\n\
     2. Next step (specific tool to call, or provide final answer)";

/// Extraction instruction for the structured metadata pull over the full
/// conversation (decision node, final invocation).
pub const METADATA_PULL_PROMPT: &str =
    "From the conversation above, extract the username and the start_time and end_time \
     in ISO 8601 format. Prefer values computed from real tool outputs over guesses. \
     Return null for any field not yet determined.";

/// Finalization instruction.
pub const FINALIZE_OUTPUT_PROMPT: &str =
    "Review the conversation and generate a SINGLE PARAGRAPH summary of what was accomplished \
     and the final result. Write one continuous paragraph - no bullets, sections, or line breaks.\n\n\
     **CRITICAL: Use ONLY the final extracted values below for dates/times. \
     Do NOT reference intermediate or incorrect dates from the conversation.**";

/// System message embedding an approved plan for the agent loop.
pub fn approved_plan_message(plan: &str) -> String {
    format!(
        "Approved plan:\n{plan}\n\n\
         Follow this plan step by step using REAL tool outputs. \
         Never reuse example values from the plan text."
    )
}
