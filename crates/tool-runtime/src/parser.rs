//! Extract a tool invocation from free-form model text.
//!
//! Precedence is fixed:
//! 1. a ```` ```json ```` fenced block, parsed as a JSON object;
//! 2. if there is no such block or it does not parse, the span from the
//!    first `{` to the last `}`;
//! 3. otherwise no call.
//!
//! A parsed object is only a call when it carries a string `tool` key.
//! Anything else means the model is answering in prose.

use serde_json::{Map, Value};
use tracing::{debug, warn};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// A structured tool invocation recovered from model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub tool: String,
    /// Always a JSON object; missing or non-object arguments become `{}`.
    pub arguments: Value,
}

impl ParsedToolCall {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments: normalize_arguments(Some(arguments)),
        }
    }

    /// Render the call the way the model is instructed to emit it.
    pub fn to_fenced_block(&self) -> String {
        let body = serde_json::json!({
            "tool": self.tool,
            "arguments": self.arguments,
        });
        let pretty = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        format!("{FENCE_OPEN}\n{pretty}\n{FENCE_CLOSE}")
    }
}

/// Parse `response`, returning `None` when the model gave a final answer.
pub fn parse_tool_call(response: &str) -> Option<ParsedToolCall> {
    if let Some(block) = fenced_json_block(response) {
        match serde_json::from_str::<Value>(block) {
            Ok(Value::Object(map)) => {
                debug!("Parsed JSON object from fenced block");
                return as_tool_call(map);
            }
            Ok(_) => warn!("Fenced json block is not an object; trying brace scan"),
            Err(e) => warn!(error = %e, "Failed to parse fenced json block; trying brace scan"),
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Object(map)) => {
            debug!("Parsed JSON object from brace scan");
            as_tool_call(map)
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "No valid JSON tool call found");
            None
        }
    }
}

/// Contents of the first closed ```` ```json ```` block, trimmed.
fn fenced_json_block(response: &str) -> Option<&str> {
    let open = response.find(FENCE_OPEN)?;
    let body_start = open + FENCE_OPEN.len();
    let body_len = response[body_start..].find(FENCE_CLOSE)?;
    Some(response[body_start..body_start + body_len].trim())
}

fn as_tool_call(mut map: Map<String, Value>) -> Option<ParsedToolCall> {
    let tool = match map.remove("tool") {
        Some(Value::String(name)) => name,
        _ => {
            debug!("JSON object has no string 'tool' key; treating as final answer");
            return None;
        }
    };
    Some(ParsedToolCall {
        tool,
        arguments: normalize_arguments(map.remove("arguments")),
    })
}

fn normalize_arguments(arguments: Option<Value>) -> Value {
    match arguments {
        Some(Value::Object(map)) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_block() {
        let response = "```json\n{\"tool\": \"rankings\", \"arguments\": {\"stat\": \"passing_yards\", \"season\": 2024}}\n```";
        let parsed = parse_tool_call(response).unwrap();
        assert_eq!(parsed.tool, "rankings");
        assert_eq!(parsed.arguments["stat"], "passing_yards");
    }

    #[test]
    fn test_parse_raw_json() {
        let response = r#"I will use the rankings tool. {"tool": "rankings", "arguments": {"stat": "passing_yards", "season": 2024}}"#;
        let parsed = parse_tool_call(response).unwrap();
        assert_eq!(parsed.tool, "rankings");
        assert_eq!(parsed.arguments["season"], 2024);
    }

    #[test]
    fn test_returns_none_for_no_json() {
        let response = "The answer is that Joe Burrow led the league with 4918 yards.";
        assert!(parse_tool_call(response).is_none());
    }

    #[test]
    fn test_ignores_non_tool_json() {
        assert!(parse_tool_call(r#"{"player": "Mahomes", "yards": 4500}"#).is_none());
        assert!(parse_tool_call("```json\n{\"player\": \"Mahomes\"}\n```").is_none());
    }

    #[test]
    fn test_non_string_tool_key_is_not_a_call() {
        assert!(parse_tool_call(r#"{"tool": 7, "arguments": {}}"#).is_none());
    }

    #[test]
    fn test_round_trip_through_fenced_block() {
        let call = ParsedToolCall::new(
            "calculator",
            json!({"operation": "win_percentage", "values": {"wins": 8, "losses": 2}}),
        );
        let text = format!("Let me compute that.\n{}\n", call.to_fenced_block());
        assert_eq!(parse_tool_call(&text), Some(call));
    }

    #[test]
    fn test_broken_fence_falls_through_to_brace_scan() {
        // Invalid fence and the brace span is the same broken object.
        let response = "```json\n{\"tool\": \"rankings\",,}\n```";
        assert!(parse_tool_call(response).is_none());

        // Fence content is not an object; the brace span is.
        let response = "```json\n[1, 2]\n``` then {\"tool\": \"sql_query\", \"arguments\": {\"sql\": \"SELECT 1\"}}";
        let parsed = parse_tool_call(response).unwrap();
        assert_eq!(parsed.tool, "sql_query");
    }

    #[test]
    fn test_unterminated_fence_uses_brace_scan() {
        let response = "```json\n{\"tool\": \"rankings\", \"arguments\": {\"stat\": \"rushing_tds\"}}";
        let parsed = parse_tool_call(response).unwrap();
        assert_eq!(parsed.arguments["stat"], "rushing_tds");
    }

    #[test]
    fn test_missing_or_bad_arguments_become_empty_object() {
        let parsed = parse_tool_call(r#"{"tool": "rankings"}"#).unwrap();
        assert_eq!(parsed.arguments, json!({}));

        let parsed = parse_tool_call(r#"{"tool": "rankings", "arguments": "stat=x"}"#).unwrap();
        assert_eq!(parsed.arguments, json!({}));
    }

    #[test]
    fn test_prose_with_braces_is_answer() {
        let response = "Burrow {the Bengals QB} threw for 4,918 yards}.";
        assert!(parse_tool_call(response).is_none());
        assert!(parse_tool_call("} backwards {").is_none());
    }

    #[test]
    fn test_fenced_block_wins_over_later_object() {
        let response = "```json\n{\"tool\": \"rankings\", \"arguments\": {}}\n```\nor maybe {\"tool\": \"calculator\"}";
        assert_eq!(parse_tool_call(response).unwrap().tool, "rankings");
    }

    #[test]
    fn test_every_truncation_is_handled() {
        let call = ParsedToolCall::new("rankings", json!({"stat": "passing_yards", "limit": 5}));
        let full = format!("Looking it up.\n{}\nDone.", call.to_fenced_block());

        for (idx, _) in full.char_indices() {
            // Must never panic; a truncated response either still yields the
            // intended call or is treated as prose.
            if let Some(parsed) = parse_tool_call(&full[..idx]) {
                assert_eq!(parsed, call, "prefix of length {idx}");
            }
        }
        assert_eq!(parse_tool_call(&full), Some(call));
    }
}
