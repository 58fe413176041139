use anyhow::Context;
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::time_utils::{add_delta, iso_micro, parse_to_timezone, TimeError};
use crate::traits::Tool;

#[derive(Deserialize)]
struct DeltaArgs {
    time_str: String,
    amount: i64,
    unit: String,
}

fn unit_label(amount: i64, unit: &str) -> String {
    let lower = unit.to_lowercase();
    if amount.abs() == 1 {
        lower.trim_end_matches('s').to_string()
    } else if lower == "year" {
        "years".to_string()
    } else {
        lower
    }
}

/// Add a time delta to a timestamp.
pub struct AddTimeDeltaTool {
    tz: Tz,
}

impl AddTimeDeltaTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

fn delta_schema(name: &str, description: &str, verb: &str) -> Value {
    json!({
        "name": name,
        "description": description,
        "parameters": {
            "type": "object",
            "properties": {
                "time_str": {
                    "type": "string",
                    "description": "ISO 8601 time string (supports trailing Z, offsets, or naive strings)"
                },
                "amount": {
                    "type": "integer",
                    "description": format!("Amount to {} (can be negative)", verb)
                },
                "unit": {
                    "type": "string",
                    "description": "One of: seconds, minutes, hours, days, weeks, years"
                }
            },
            "required": ["time_str", "amount", "unit"]
        }
    })
}

#[async_trait]
impl Tool for AddTimeDeltaTool {
    fn name(&self) -> &str {
        "add_time_delta"
    }

    fn description(&self) -> &str {
        "Add a time delta to a timestamp and return ISO 8601 in the configured timezone. For relative day references, get the current weekday first and compute the exact number of days."
    }

    fn schema(&self) -> Value {
        delta_schema(self.name(), self.description(), "add")
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: DeltaArgs =
            serde_json::from_str(arguments).context("invalid arguments for add_time_delta")?;
        let base = parse_to_timezone(&args.time_str, self.tz)?;
        match add_delta(base, args.amount, &args.unit) {
            Ok(dt) => Ok(format!(
                "Time after adding {} {}: {}",
                args.amount,
                unit_label(args.amount, &args.unit),
                iso_micro(&dt)
            )),
            // The model can read and correct an unsupported unit, so it is an
            // observation rather than a hard failure.
            Err(e @ TimeError::UnsupportedUnit(_)) => Ok(format!("Error: {}", e)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Subtract a time delta from a timestamp — addition with the sign inverted.
pub struct SubtractTimeDeltaTool {
    tz: Tz,
}

impl SubtractTimeDeltaTool {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

#[async_trait]
impl Tool for SubtractTimeDeltaTool {
    fn name(&self) -> &str {
        "subtract_time_delta"
    }

    fn description(&self) -> &str {
        "Subtract a time delta from a timestamp and return ISO 8601 in the configured timezone. For relative weekday references, verify the current weekday first rather than assuming a fixed offset."
    }

    fn schema(&self) -> Value {
        delta_schema(self.name(), self.description(), "subtract")
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: DeltaArgs =
            serde_json::from_str(arguments).context("invalid arguments for subtract_time_delta")?;
        let base = parse_to_timezone(&args.time_str, self.tz)?;
        match add_delta(base, -args.amount, &args.unit) {
            Ok(dt) => Ok(format!(
                "Time after subtracting {} {}: {}",
                args.amount,
                unit_label(args.amount, &args.unit),
                iso_micro(&dt)
            )),
            Err(e @ TimeError::UnsupportedUnit(_)) => Ok(format!("Error: {}", e)),
            Err(e) => Err(e.into()),
        }
    }
}
