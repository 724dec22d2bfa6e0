use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::args::as_f64;
use super::expression;
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

/// Arithmetic over numbers the model already pulled from other tools.
pub struct CalculatorTool;

#[derive(Debug, Deserialize)]
pub struct CalculatorArgs {
    #[serde(default)]
    pub operation: String,
    /// A list for `average`/`sum`/`min`/`max`/`divide`, an object for
    /// `win_percentage`/`percent_change`, a string for `expression`.
    #[serde(default)]
    pub values: Value,
}

const DESCRIPTION: &str = r#"Perform mathematical calculations.

Supported operations:
- average: Calculate mean of a list of numbers
- sum: Add up numbers
- min/max: Find minimum or maximum
- win_percentage: Calculate win % from {"wins": X, "losses": Y}
- percent_change: Calculate % change from {"old": X, "new": Y}
- divide: Divide first number by second
- expression: Evaluate an arithmetic expression (+ - * / and parentheses)

Examples:
- {"operation": "average", "values": [280, 310, 295, 340]}
- {"operation": "win_percentage", "values": {"wins": 8, "losses": 2}}
- {"operation": "percent_change", "values": {"old": 4000, "new": 4500}}
- {"operation": "expression", "values": "324 / 18"}
"#;

#[async_trait]
impl TypedTool for CalculatorTool {
    type Args = CalculatorArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "calculator".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["average", "sum", "min", "max", "win_percentage",
                                 "percent_change", "divide", "expression"]
                    },
                    "values": {
                        "description": "Numbers, a {wins, losses} / {old, new} object, or an expression string"
                    }
                },
                "required": ["operation", "values"]
            }),
        }
    }

    async fn execute(&self, args: CalculatorArgs) -> Result<ToolResult, ToolError> {
        debug!(operation = %args.operation, "calculator");
        let operation = args.operation.trim().to_lowercase();

        let outcome = match operation.as_str() {
            "average" => numbers(&args.values).map(|v| {
                if v.is_empty() {
                    0.0
                } else {
                    v.iter().sum::<f64>() / v.len() as f64
                }
            }),
            "sum" => numbers(&args.values).map(|v| v.iter().sum()),
            "min" => numbers(&args.values).and_then(|v| {
                v.into_iter()
                    .reduce(f64::min)
                    .ok_or_else(|| "min requires at least one value".to_string())
            }),
            "max" => numbers(&args.values).and_then(|v| {
                v.into_iter()
                    .reduce(f64::max)
                    .ok_or_else(|| "max requires at least one value".to_string())
            }),
            "win_percentage" => {
                let wins = field(&args.values, "wins");
                let losses = field(&args.values, "losses");
                let total = wins + losses;
                Ok(if total > 0.0 {
                    round_to(wins / total * 100.0, 1)
                } else {
                    0.0
                })
            }
            "percent_change" => {
                let old = field(&args.values, "old");
                let new = field(&args.values, "new");
                Ok(if old == 0.0 {
                    0.0
                } else {
                    round_to((new - old) / old * 100.0, 1)
                })
            }
            "divide" => numbers(&args.values).and_then(|v| match v.as_slice() {
                [_, divisor, ..] if *divisor == 0.0 => Ok(0.0),
                [dividend, divisor, ..] => Ok(dividend / divisor),
                _ => Err("divide requires two values".to_string()),
            }),
            "expression" => expression_text(&args.values)
                .and_then(|text| expression::evaluate(&text).map_err(|e| e.to_string())),
            _ => {
                return Ok(ToolResult::failure(format!(
                    "Unknown operation: {}",
                    args.operation
                )))
            }
        };

        Ok(match outcome {
            Ok(result) if !result.is_finite() => {
                ToolResult::failure(format!("{operation} produced a non-finite result"))
            }
            Ok(result) => ToolResult::ok(json!({
                "result": number_value(result),
                "operation": operation,
            })),
            Err(message) => ToolResult::failure(message),
        })
    }
}

fn numbers(values: &Value) -> Result<Vec<f64>, String> {
    match values {
        Value::Array(items) => items
            .iter()
            .map(|item| as_f64(item).ok_or_else(|| format!("not a number: {item}")))
            .collect(),
        Value::Null => Ok(Vec::new()),
        single => as_f64(single)
            .map(|n| vec![n])
            .ok_or_else(|| format!("expected a list of numbers, got {single}")),
    }
}

fn field(values: &Value, key: &str) -> f64 {
    values.get(key).and_then(as_f64).unwrap_or(0.0)
}

fn expression_text(values: &Value) -> Result<String, String> {
    match values {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expression must be a string, got {other}")),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Whole results render as integers; everything else is rounded to 2 dp.
/// Callers reject non-finite values first.
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        return Value::from(value as i64);
    }
    Value::from(round_to(value, 2))
}
