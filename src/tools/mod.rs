mod clock;
mod convert;
mod delta;
mod weekday;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono_tz::Tz;
use serde_json::Value;

pub use clock::{CurrentDatetimeInfoTool, OneHourAgoTool};
pub use convert::{
    FormatTimeForDisplayTool, ParseAndFormatTimeTool, ParseTimeToTimezoneTool, SafeParseTimeTool,
};
pub use delta::{AddTimeDeltaTool, SubtractTimeDeltaTool};
pub use weekday::CheckWeekdayTool;

use crate::traits::Tool;

/// Fixed catalog of the deterministic time tools, immutable after startup.
///
/// Shared read-only across concurrent query pipelines.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Build the full registry bound to the configured timezone.
    pub fn new(tz: Tz) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(CurrentDatetimeInfoTool::new(tz)),
            Arc::new(OneHourAgoTool::new(tz)),
            Arc::new(ParseTimeToTimezoneTool::new(tz)),
            Arc::new(FormatTimeForDisplayTool::new(tz)),
            Arc::new(ParseAndFormatTimeTool::new(tz)),
            Arc::new(SafeParseTimeTool::new(tz)),
            Arc::new(AddTimeDeltaTool::new(tz)),
            Arc::new(SubtractTimeDeltaTool::new(tz)),
            Arc::new(CheckWeekdayTool::new(tz)),
        ];
        Self { tools }
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Formatted `- name: description` listing for inclusion in prompts.
    pub fn catalog_text(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// OpenAI-format tool definitions for the tool-binding model call.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": t.schema(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::US::Eastern;

    #[test]
    fn registry_holds_all_time_tools() {
        let registry = ToolRegistry::new(Eastern);
        let names = registry.names();
        for expected in [
            "get_current_datetime_info",
            "get_one_hour_ago",
            "parse_time_to_timezone",
            "format_time_for_display",
            "parse_and_format_time",
            "safe_parse_time",
            "add_time_delta",
            "subtract_time_delta",
            "check_weekday",
        ] {
            assert!(names.contains(expected), "missing tool {}", expected);
        }
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn lookup_by_name() {
        let registry = ToolRegistry::new(Eastern);
        assert!(registry.lookup("check_weekday").is_some());
        assert!(registry.lookup("fetch_profiling_data").is_none());
    }

    #[test]
    fn catalog_text_lists_one_line_per_tool() {
        let registry = ToolRegistry::new(Eastern);
        let catalog = registry.catalog_text();
        assert_eq!(catalog.lines().count(), 9);
        assert!(catalog
            .lines()
            .all(|line| line.starts_with("- ") && line.contains(": ")));
    }

    #[test]
    fn definitions_are_openai_function_format() {
        let registry = ToolRegistry::new(Eastern);
        let defs = registry.definitions();
        assert_eq!(defs.len(), 9);
        for def in defs {
            assert_eq!(def["type"], "function");
            assert!(def["function"]["name"].is_string());
            assert!(def["function"]["parameters"].is_object());
        }
    }
}
