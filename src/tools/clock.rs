use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::{json, Value};

use crate::time_utils::{current_info, iso_micro, one_hour_ago};
use crate::traits::Tool;

/// Current instant with weekday/date/time breakdown — the anchor for any
/// relative-date calculation ("yesterday", "last Friday").
pub struct CurrentDatetimeInfoTool {
    tz: Tz,
}

impl CurrentDatetimeInfoTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[async_trait]
impl Tool for CurrentDatetimeInfoTool {
    fn name(&self) -> &str {
        "get_current_datetime_info"
    }

    fn description(&self) -> &str {
        "Get comprehensive current datetime information in the configured timezone: ISO 8601 timestamp, weekday name, date, time, and timezone abbreviation. Use this first when resolving relative references like 'yesterday' or 'last Friday'."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "get_current_datetime_info",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {},
                "required": []
            }
        })
    }

    async fn call(&self, _arguments: &str) -> anyhow::Result<String> {
        let info = current_info(self.tz);
        Ok(format!(
            "Current datetime info:\n  ISO 8601: {}\n  Weekday: {}\n  Date: {}\n  Time: {}\n  Timezone: {}",
            info.iso, info.weekday, info.date, info.time, info.tz_abbrev
        ))
    }
}

/// The time one hour ago in the configured timezone.
pub struct OneHourAgoTool {
    tz: Tz,
}

impl OneHourAgoTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[async_trait]
impl Tool for OneHourAgoTool {
    fn name(&self) -> &str {
        "get_one_hour_ago"
    }

    fn description(&self) -> &str {
        "Get the time one hour ago in the configured timezone as an ISO 8601 string with microseconds."
    }

    fn schema(&self) -> Value {
        json!({
            "name": "get_one_hour_ago",
            "description": self.description(),
            "parameters": {
                "type": "object",
                "properties": {},
                "required": []
            }
        })
    }

    async fn call(&self, _arguments: &str) -> anyhow::Result<String> {
        Ok(format!(
            "Time one hour ago: {}",
            iso_micro(&one_hour_ago(self.tz))
        ))
    }
}
