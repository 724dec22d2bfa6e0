use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Describes a tool's interface for the model-facing catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "sql_query", "rankings")
    pub name: String,
    /// Human-readable description; rendered verbatim into the system prompt
    pub description: String,
    /// JSON Schema describing the accepted arguments
    pub input_schema: Value,
}

/// Uniform envelope returned by every tool.
///
/// Exactly one of `data` (on success) or `error` (on failure) is populated;
/// the fields are private so the only way to build one is through
/// [`ToolResult::ok`] or [`ToolResult::failure`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Consume the result, yielding `(data, error)`.
    pub fn into_parts(self) -> (Option<Value>, Option<String>) {
        (self.data, self.error)
    }

    /// True when the call succeeded and returned something other than an
    /// empty list, empty object or null.
    pub fn has_useful_data(&self) -> bool {
        match &self.data {
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    /// Format the result for the model's context window.
    ///
    /// Lists longer than `max_rows` are truncated with a trailing count.
    pub fn to_context_string(&self, max_rows: usize) -> String {
        if !self.success {
            return format!("Error: {}", self.error.as_deref().unwrap_or("unknown error"));
        }

        match &self.data {
            Some(Value::Array(rows)) if rows.is_empty() => "No results found.".to_string(),
            Some(Value::Array(rows)) if rows.len() > max_rows => {
                let truncated = pretty(&Value::Array(rows[..max_rows].to_vec()));
                format!("{}\n... and {} more rows", truncated, rows.len() - max_rows)
            }
            Some(Value::String(text)) => text.clone(),
            Some(value) => pretty(value),
            None => "No results found.".to_string(),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_context_string(crate::DEFAULT_CONTEXT_ROWS))
    }
}

/// Object-safe tool interface held by the registry.
///
/// Most tools implement [`TypedTool`] instead and get this for free.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with a generic argument mapping.
    async fn invoke(&self, arguments: Value) -> Result<ToolResult, ToolError>;
}

/// A tool with a typed argument contract.
///
/// `Args` is the tool's parameter decoder: serde attributes on it declare
/// which keys are read, their aliases and their defaults.
#[async_trait]
pub trait TypedTool: Send + Sync {
    type Args: DeserializeOwned + Send;

    fn describe(&self) -> ToolDefinition;

    async fn execute(&self, args: Self::Args) -> Result<ToolResult, ToolError>;
}

#[async_trait]
impl<T: TypedTool> Tool for T {
    fn definition(&self) -> ToolDefinition {
        self.describe()
    }

    async fn invoke(&self, arguments: Value) -> Result<ToolResult, ToolError> {
        let args = decode_args::<T::Args>(arguments)?;
        self.execute(args).await
    }
}

/// Decode a generic argument mapping into a tool's parameter struct.
/// A missing (`null`) mapping decodes as `{}` so all-default tools still work.
pub fn decode_args<A: DeserializeOwned>(arguments: Value) -> Result<A, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

/// Simple echo tool for testing purposes.
#[cfg(any(test, feature = "test-utils"))]
pub struct EchoTool;

#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Deserialize)]
pub struct EchoArgs {
    pub message: String,
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TypedTool for EchoTool {
    type Args = EchoArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "echo".to_string(),
            description: "Echoes back the input message. For testing.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The message to echo back"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    async fn execute(&self, args: EchoArgs) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::ok(Value::String(args.message)))
    }
}
