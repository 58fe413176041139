use anyhow::Context;
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::time_utils::{check_weekday, parse_to_timezone};
use crate::traits::Tool;

/// Verify the weekday of a computed date. Relative weekday references
/// ("last Friday") are only trusted after passing through this check.
pub struct CheckWeekdayTool {
    tz: Tz,
}

impl CheckWeekdayTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[derive(Deserialize)]
struct WeekdayArgs {
    date_str: String,
}

#[async_trait]
impl Tool for CheckWeekdayTool {
    fn name(&self) -> &str {
        "check_weekday"
    }

    fn description(&self) -> &str {
        "Check the weekday of a given date. Always verify computed dates for relative weekday references (e.g. 'last Friday') with this tool. Accepts date-only or full datetime strings; only the date portion is used."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "check_weekday",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {
                    "date_str": {
                        "type": "string",
                        "description": "Date in ISO 8601 format, e.g. '2025-11-01' or '2025-11-01T12:00:00-05:00'"
                    }
                },
                "required": ["date_str"]
            }
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: WeekdayArgs =
            serde_json::from_str(arguments).context("invalid arguments for check_weekday")?;
        let weekday = check_weekday(&args.date_str, self.tz)?;
        let date = parse_to_timezone(&args.date_str, self.tz)?
            .format("%Y-%m-%d")
            .to_string();
        Ok(format!("Date {} is a {}", date, weekday))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::US::Eastern;

    #[tokio::test]
    async fn reports_weekday_for_date_only_input() {
        let tool = CheckWeekdayTool::new(Eastern);
        let out = tool.call(r#"{"date_str": "2025-11-01"}"#).await.unwrap();
        assert_eq!(out, "Date 2025-11-01 is a Saturday");
    }

    #[tokio::test]
    async fn uses_date_portion_of_full_datetime() {
        let tool = CheckWeekdayTool::new(Eastern);
        let out = tool
            .call(r#"{"date_str": "2025-11-01T12:00:00-05:00"}"#)
            .await
            .unwrap();
        assert_eq!(out, "Date 2025-11-01 is a Saturday");
    }

    #[tokio::test]
    async fn empty_date_is_an_error() {
        let tool = CheckWeekdayTool::new(Eastern);
        assert!(tool.call(r#"{"date_str": ""}"#).await.is_err());
    }
}
