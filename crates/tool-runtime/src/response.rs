//! Run trace and the final [`AgentResponse`].

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::tool::ToolResult;
use crate::tools::{player_stats, rankings};

/// One dispatched tool call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    /// Result data when the call succeeded.
    pub result: Option<Value>,
    /// Error text when it failed.
    pub error: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub answer: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Step-by-step notes. Empty unless the run was verbose.
    pub thinking: Vec<String>,
    pub total_time_ms: f64,
    /// Model calls made.
    pub iterations: u32,
}

impl AgentResponse {
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls.iter().map(|c| c.tool.as_str()).collect()
    }
}

/// Accumulates the trace of a single run.
#[derive(Debug, Default)]
pub struct RunTrace {
    tool_calls: Vec<ToolCallRecord>,
    thinking: Vec<String>,
}

impl RunTrace {
    pub fn record_call(&mut self, tool: String, arguments: Value, result: ToolResult) {
        let success = result.is_success();
        let (data, error) = result.into_parts();
        self.tool_calls.push(ToolCallRecord {
            tool,
            arguments,
            result: data,
            error,
            success,
        });
    }

    pub fn note(&mut self, entry: impl Into<String>) {
        self.thinking.push(entry.into());
    }

    pub fn last_note(&self) -> Option<&str> {
        self.thinking.last().map(String::as_str)
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    /// Answer used when the iteration budget runs out before the model
    /// stops asking for tools.
    pub fn budget_exhausted_answer(&self, max_iterations: u32) -> String {
        let mut answer = format!(
            "I reached the limit of {max_iterations} tool-calling steps without a final answer."
        );
        match self.last_note() {
            Some(note) => {
                answer.push_str(&format!(" Last step: {note}."));
                if let Some(summary) = self.data_summary() {
                    answer.push(' ');
                    answer.push_str(&summary);
                }
            }
            None => answer.push_str(" I couldn't find relevant data to answer this question."),
        }
        answer
    }

    /// Best-effort sentence from the first successful call with usable data.
    fn data_summary(&self) -> Option<String> {
        self.tool_calls
            .iter()
            .filter(|call| call.success)
            .find_map(|call| {
                let data = call.result.as_ref()?;
                match call.tool.as_str() {
                    "rankings" => rankings::leader_line(data.as_array()?),
                    "player_stats" => {
                        let player = call
                            .arguments
                            .get("player_name")
                            .and_then(Value::as_str)
                            .unwrap_or("The player");
                        player_stats::summary_line(player, data.get("summary")?.as_object()?)
                    }
                    "sql_query" => first_row_line(data.as_array()?),
                    _ => None,
                }
            })
    }

    pub fn finish(
        self,
        answer: String,
        elapsed: Duration,
        iterations: u32,
        verbose: bool,
    ) -> AgentResponse {
        AgentResponse {
            answer,
            tool_calls: self.tool_calls,
            thinking: if verbose { self.thinking } else { Vec::new() },
            total_time_ms: elapsed.as_secs_f64() * 1000.0,
            iterations,
        }
    }
}

/// "Based on the data: k: v, ..." from up to five non-null columns.
fn first_row_line(rows: &[Value]) -> Option<String> {
    let first = rows.first()?.as_object()?;
    let parts: Vec<String> = first
        .iter()
        .filter(|(_, v)| !v.is_null())
        .take(5)
        .map(|(k, v)| match v {
            Value::String(s) => format!("{k}: {s}"),
            other => format!("{k}: {other}"),
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!("Based on the data: {}", parts.join(", ")))
}

/// `4918` -> `"4,918"`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
