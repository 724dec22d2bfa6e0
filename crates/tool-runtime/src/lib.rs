pub mod conversation;
pub mod guard;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod registry;
pub mod response;
pub mod retrieval;
pub mod runtime;
pub mod store;
pub mod tool;
pub mod tools;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

/// Rows of a list result shown to the model before truncation.
pub const DEFAULT_CONTEXT_ROWS: usize = 15;

pub use conversation::{Conversation, Message, Role};
pub use guard::{check_read_only, SafetyViolation, WRITE_BLOCKED_MESSAGE};
pub use model::{ModelClient, ModelError, ModelReply};
pub use parser::{parse_tool_call, ParsedToolCall};
pub use registry::{RegistryError, ToolRegistry};
pub use response::{AgentResponse, ToolCallRecord};
pub use retrieval::{InMemoryRetriever, RetrievalError, RetrievalFilters, Retriever, ScoredFragment};
pub use runtime::{Agent, AgentError, AgentSettings};
pub use store::{AnalyticStore, QueryRows, SqlParam, SqliteStore, StoreError};
pub use tool::{Tool, ToolDefinition, ToolError, ToolResult, TypedTool};
pub use tools::{
    default_registry, CalculatorTool, NewsSearchTool, PlayerStatsTool, RankingsTool,
    SemanticSearchTool, SqlQueryTool,
};
