use anyhow::Context;
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::time_utils::{format_for_display, iso_micro, parse_to_timezone, safe_parse};
use crate::traits::Tool;

/// Convert an ISO 8601 string into the configured timezone.
pub struct ParseTimeToTimezoneTool {
    tz: Tz,
}

impl ParseTimeToTimezoneTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[derive(Deserialize)]
struct ParseTimeArgs {
    time_str: String,
}

#[async_trait]
impl Tool for ParseTimeToTimezoneTool {
    fn name(&self) -> &str {
        "parse_time_to_timezone"
    }

    fn description(&self) -> &str {
        "Parse an ISO 8601 time string (supports trailing Z, offsets, or naive strings) and convert it to the configured timezone."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "parse_time_to_timezone",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {
                    "time_str": {
                        "type": "string",
                        "description": "Time string in ISO 8601 format"
                    }
                },
                "required": ["time_str"]
            }
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: ParseTimeArgs =
            serde_json::from_str(arguments).context("invalid arguments for parse_time_to_timezone")?;
        let dt = parse_to_timezone(&args.time_str, self.tz)?;
        Ok(format!("Converted time to app timezone: {}", iso_micro(&dt)))
    }
}

/// Format an ISO 8601 time for user-friendly display.
pub struct FormatTimeForDisplayTool {
    tz: Tz,
}

impl FormatTimeForDisplayTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[derive(Deserialize)]
struct FormatTimeArgs {
    time_str: String,
    #[serde(default = "default_true")]
    include_microseconds: bool,
}

fn default_true() -> bool {
    true
}

#[async_trait]
impl Tool for FormatTimeForDisplayTool {
    fn name(&self) -> &str {
        "format_time_for_display"
    }

    fn description(&self) -> &str {
        "Format an ISO 8601 time for user-friendly display with the timezone abbreviation, e.g. '2024-01-01 12:34:56.123456 EST'."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "format_time_for_display",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {
                    "time_str": {
                        "type": "string",
                        "description": "ISO 8601 time string to format"
                    },
                    "include_microseconds": {
                        "type": "boolean",
                        "description": "Whether to show fractional seconds (default true)"
                    }
                },
                "required": ["time_str"]
            }
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: FormatTimeArgs =
            serde_json::from_str(arguments).context("invalid arguments for format_time_for_display")?;
        let dt = parse_to_timezone(&args.time_str, self.tz)?;
        Ok(format!(
            "Formatted time: {}",
            format_for_display(&dt, args.include_microseconds)
        ))
    }
}

/// Parse and format for display, falling back to a default when invalid.
pub struct ParseAndFormatTimeTool {
    tz: Tz,
}

impl ParseAndFormatTimeTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[derive(Deserialize)]
struct ParseAndFormatArgs {
    #[serde(default)]
    time_str: Option<String>,
    #[serde(default)]
    default_time: Option<String>,
}

#[async_trait]
impl Tool for ParseAndFormatTimeTool {
    fn name(&self) -> &str {
        "parse_and_format_time"
    }

    fn description(&self) -> &str {
        "Parse a time string and format it for display; falls back to default_time when the input is missing or invalid."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "parse_and_format_time",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {
                    "time_str": {
                        "type": "string",
                        "description": "ISO 8601 time string (may be omitted or invalid)"
                    },
                    "default_time": {
                        "type": "string",
                        "description": "ISO 8601 fallback used when time_str cannot be parsed"
                    }
                },
                "required": []
            }
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: ParseAndFormatArgs =
            serde_json::from_str(arguments).context("invalid arguments for parse_and_format_time")?;

        let display_default = || {
            args.default_time
                .as_deref()
                .and_then(|d| parse_to_timezone(d, self.tz).ok())
                .map(|dt| format_for_display(&dt, true))
        };

        let Some(time_str) = args.time_str.as_deref().filter(|s| !s.trim().is_empty()) else {
            let formatted = display_default().unwrap_or_else(|| "unknown time".to_string());
            return Ok(format!("Parsed and formatted time (using default): {}", formatted));
        };

        match parse_to_timezone(time_str, self.tz) {
            Ok(dt) => Ok(format!(
                "Parsed and formatted time: {}",
                format_for_display(&dt, true)
            )),
            Err(e) => {
                warn!(time_str, error = %e, "Could not parse time, using fallback");
                let formatted = display_default().unwrap_or_else(|| time_str.to_string());
                Ok(format!("Parsed and formatted time (using fallback): {}", formatted))
            }
        }
    }
}

/// Safely parse a time string to ISO 8601; on failure return the default.
pub struct SafeParseTimeTool {
    tz: Tz,
}

impl SafeParseTimeTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[derive(Deserialize)]
struct SafeParseArgs {
    #[serde(default)]
    time_str: Option<String>,
    default_time: String,
}

#[async_trait]
impl Tool for SafeParseTimeTool {
    fn name(&self) -> &str {
        "safe_parse_time"
    }

    fn description(&self) -> &str {
        "Safely parse a time string to ISO 8601 in the configured timezone; on missing or invalid input, return the provided default time instead of failing."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "safe_parse_time",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {
                    "time_str": {
                        "type": "string",
                        "description": "ISO 8601 time string (may be omitted or invalid)"
                    },
                    "default_time": {
                        "type": "string",
                        "description": "ISO 8601 fallback time used when parsing fails"
                    }
                },
                "required": ["default_time"]
            }
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: SafeParseArgs =
            serde_json::from_str(arguments).context("invalid arguments for safe_parse_time")?;

        // The default itself must parse; only the primary input is forgiven.
        let default = parse_to_timezone(&args.default_time, self.tz)?;
        let time_str = args.time_str.as_deref().filter(|s| !s.trim().is_empty());
        let parsed = safe_parse(time_str, default, self.tz);

        let annotation = match time_str {
            None => " (using default)",
            Some(s) if parse_to_timezone(s, self.tz).is_err() => {
                warn!(time_str = s, "Could not parse time, using default");
                " (using fallback)"
            }
            Some(_) => "",
        };
        Ok(format!("Parsed time{}: {}", annotation, iso_micro(&parsed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::US::Eastern;

    #[tokio::test]
    async fn parse_time_converts_offset_input() {
        let tool = ParseTimeToTimezoneTool::new(Eastern);
        let out = tool
            .call(r#"{"time_str": "2025-06-01T12:00:00Z"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Converted time to app timezone: 2025-06-01T08:00:00.000000-04:00"
        );
    }

    #[tokio::test]
    async fn parse_time_rejects_bad_input() {
        let tool = ParseTimeToTimezoneTool::new(Eastern);
        assert!(tool.call(r#"{"time_str": "whenever"}"#).await.is_err());
        assert!(tool.call(r#"{"wrong_param": "x"}"#).await.is_err());
    }

    #[tokio::test]
    async fn format_time_defaults_to_microseconds() {
        let tool = FormatTimeForDisplayTool::new(Eastern);
        let out = tool
            .call(r#"{"time_str": "2025-01-15T10:00:00.250000-05:00"}"#)
            .await
            .unwrap();
        assert_eq!(out, "Formatted time: 2025-01-15 10:00:00.25 EST");

        let out = tool
            .call(r#"{"time_str": "2025-01-15T10:00:00.250000-05:00", "include_microseconds": false}"#)
            .await
            .unwrap();
        assert_eq!(out, "Formatted time: 2025-01-15 10:00:00 EST");
    }

    #[tokio::test]
    async fn parse_and_format_uses_default_when_missing() {
        let tool = ParseAndFormatTimeTool::new(Eastern);
        let out = tool
            .call(r#"{"default_time": "2025-01-15T10:00:00-05:00"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Parsed and formatted time (using default): 2025-01-15 10:00:00 EST"
        );

        let out = tool.call("{}").await.unwrap();
        assert_eq!(out, "Parsed and formatted time (using default): unknown time");
    }

    #[tokio::test]
    async fn parse_and_format_falls_back_on_invalid_input() {
        let tool = ParseAndFormatTimeTool::new(Eastern);
        let out = tool
            .call(r#"{"time_str": "garbage", "default_time": "2025-01-15T10:00:00-05:00"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Parsed and formatted time (using fallback): 2025-01-15 10:00:00 EST"
        );
    }

    #[tokio::test]
    async fn safe_parse_prefers_valid_input() {
        let tool = SafeParseTimeTool::new(Eastern);
        let out = tool
            .call(r#"{"time_str": "2025-01-15T10:00:00", "default_time": "2025-01-01T00:00:00"}"#)
            .await
            .unwrap();
        assert_eq!(out, "Parsed time: 2025-01-15T10:00:00.000000-05:00");

        let out = tool
            .call(r#"{"time_str": "nope", "default_time": "2025-01-01T00:00:00"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Parsed time (using fallback): 2025-01-01T00:00:00.000000-05:00"
        );

        let out = tool
            .call(r#"{"default_time": "2025-01-01T00:00:00"}"#)
            .await
            .unwrap();
        assert_eq!(
            out,
            "Parsed time (using default): 2025-01-01T00:00:00.000000-05:00"
        );
    }
}
