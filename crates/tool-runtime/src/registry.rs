use crate::tool::{Tool, ToolResult};
use futures::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Manages available tools and dispatches calls to them by name.
///
/// Registration order is preserved so the model-facing catalogue is stable.
/// Built once per process and shared across runs behind an `Arc`.
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool. Returns error if name is empty or already registered.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let def = tool.definition();
        if def.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&def.name) {
            return Err(RegistryError::DuplicateName(def.name));
        }
        self.tools.insert(def.name, Arc::new(tool));
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute the named tool with a generic argument mapping.
    ///
    /// Never fails: unknown names, argument decode errors, tool errors and
    /// panics inside a tool all come back as a failed [`ToolResult`].
    pub async fn dispatch(&self, name: &str, arguments: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            error!(tool = name, "Unknown tool requested");
            return ToolResult::failure(format!("Unknown tool: {name}"));
        };

        info!(tool = name, args = %arguments, "Executing tool");

        let outcome = AssertUnwindSafe(tool.invoke(arguments)).catch_unwind().await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Tool returned an error");
                ToolResult::failure(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = name, panic = %message, "Tool panicked");
                ToolResult::failure(format!("Tool '{name}' panicked: {message}"))
            }
        };

        info!(tool = name, success = result.is_success(), "Tool completed");
        result
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Render the catalogue embedded in the system prompt.
    pub fn catalogue(&self) -> String {
        self.tools
            .values()
            .map(|t| {
                let def = t.definition();
                format!("## {}\n{}", def.name, def.description.trim_end())
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
    #[error("Tool name must not be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{EchoTool, ToolDefinition, ToolError, TypedTool};
    use async_trait::async_trait;
    use serde_json::json;

    struct PanickingTool;

    #[async_trait]
    impl TypedTool for PanickingTool {
        type Args = Value;

        fn describe(&self) -> ToolDefinition {
            ToolDefinition {
                name: "explode".to_string(),
                description: "Always panics.".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
            panic!("kaboom");
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        assert!(matches!(
            registry.register(EchoTool),
            Err(RegistryError::DuplicateName(name)) if name == "echo"
        ));
    }

    #[test]
    fn test_catalogue_lists_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        registry.register(PanickingTool).unwrap();

        assert_eq!(registry.names(), vec!["echo", "explode"]);
        let catalogue = registry.catalogue();
        assert!(catalogue.starts_with("## echo\n"));
        assert!(catalogue.contains("## explode\nAlways panics."));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.dispatch("teleport", json!({})).await;
        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Unknown tool: teleport"));
    }

    #[tokio::test]
    async fn test_dispatch_bad_arguments_is_failed_result() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();

        let result = registry.dispatch("echo", json!({"message": 42})).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("Invalid input"));
    }

    #[tokio::test]
    async fn test_dispatch_catches_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(PanickingTool).unwrap();

        let result = registry.dispatch("explode", json!({})).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("kaboom"));
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();

        let result = registry.dispatch("echo", json!({"message": "hi"})).await;
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!("hi")));
    }
}
