use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::args;
use crate::retrieval::{RetrievalFilters, Retriever, ScoredFragment};
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

const MAX_RESULTS: i64 = 20;

/// Narrative context ("tell me about the freezing playoff game").
pub struct SemanticSearchTool {
    retriever: Arc<dyn Retriever>,
}

impl SemanticSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[derive(Debug, Deserialize)]
pub struct SemanticSearchArgs {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_num_results", deserialize_with = "args::int")]
    pub num_results: i64,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub entity: Option<String>,
    #[serde(default, deserialize_with = "args::opt_int")]
    pub season: Option<i64>,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub category: Option<String>,
}

pub(crate) fn default_num_results() -> i64 {
    5
}

const DESCRIPTION: &str = r#"Search for relevant information using semantic similarity.

Best for narrative/contextual questions like:
- "Tell me about the famous Chiefs-Bills playoff game"
- "What happened in the freezing cold playoff game?"
- "Describe Mahomes' best performance"

NOT recommended for:
- Precise statistics (use sql_query or player_stats)
- Rankings or comparisons (use sql_query or rankings)
- Calculations (use calculator)

Arguments:
- query: Natural language search query
- num_results: Number of results to return (default 5)
- entity (optional): Player or team that must be mentioned
- season (optional): Restrict to one season
- category (optional): e.g. "game_recap", "season_summary"
"#;

#[async_trait]
impl TypedTool for SemanticSearchTool {
    type Args = SemanticSearchArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "semantic_search".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "num_results": {"type": "integer", "default": 5},
                    "entity": {"type": "string"},
                    "season": {"type": "integer"},
                    "category": {"type": "string"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: SemanticSearchArgs) -> Result<ToolResult, ToolError> {
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("query is required".to_string()));
        }
        let filters = RetrievalFilters {
            entity: args.entity,
            season: args.season,
            category: args.category,
            ..Default::default()
        };

        match self
            .retriever
            .retrieve(&args.query, &filters, clamp_results(args.num_results))
            .await
        {
            Ok(fragments) => Ok(ToolResult::ok(fragments_json(fragments))),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

pub(crate) fn clamp_results(requested: i64) -> usize {
    requested.clamp(1, MAX_RESULTS) as usize
}

/// `{text, score, metadata}` objects with scores rounded to 3 dp.
pub(crate) fn fragments_json(fragments: Vec<ScoredFragment>) -> Value {
    Value::Array(
        fragments
            .into_iter()
            .map(|f| {
                let score = (f64::from(f.score) * 1000.0).round() / 1000.0;
                json!({
                    "text": f.text,
                    "score": score,
                    "metadata": f.metadata,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{InMemoryRetriever, RetrievalError};
    use crate::testing::fixture_corpus;
    use crate::tool::Tool;

    struct BrokenRetriever;

    #[async_trait]
    impl Retriever for BrokenRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _filters: &RetrievalFilters,
            _limit: usize,
        ) -> Result<Vec<ScoredFragment>, RetrievalError> {
            Err(RetrievalError::Backend("index offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_returns_scored_fragments() {
        let tool = SemanticSearchTool::new(Arc::new(fixture_corpus()));
        let result = tool
            .invoke(json!({"query": "Chiefs Bills playoff overtime", "num_results": 2}))
            .await
            .unwrap();

        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert!(!rows.is_empty() && rows.len() <= 2);
        assert!(rows[0]["text"].as_str().unwrap().contains("overtime"));
        let score = rows[0]["score"].as_f64().unwrap();
        assert_eq!(score, (score * 1000.0).round() / 1000.0);
        assert_eq!(rows[0]["metadata"]["category"], "game_recap");
    }

    #[tokio::test]
    async fn test_filters_pass_through() {
        let tool = SemanticSearchTool::new(Arc::new(fixture_corpus()));
        let result = tool
            .invoke(json!({"query": "game", "season": 2023}))
            .await
            .unwrap();
        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["text"].as_str().unwrap().contains("freezing"));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_list() {
        let tool = SemanticSearchTool::new(Arc::new(InMemoryRetriever::empty()));
        let result = tool.invoke(json!({"query": "anything"})).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_backend_error_is_failed_result() {
        let tool = SemanticSearchTool::new(Arc::new(BrokenRetriever));
        let result = tool.invoke(json!({"query": "anything"})).await.unwrap();
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("index offline"));
    }
}
