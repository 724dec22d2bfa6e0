use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::args;
use super::semantic_search::{clamp_results, default_num_results, fragments_json};
use crate::retrieval::{RetrievalFilters, Retriever};
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

/// Returned as data (not an error) when the news corpus has nothing.
pub const NO_NEWS_MESSAGE: &str =
    "No news found. The news corpus may be empty; point STATLINE_NEWS_PATH at a JSONL file of articles.";

/// News and opinion search over a separate article corpus.
pub struct NewsSearchTool {
    retriever: Arc<dyn Retriever>,
}

impl NewsSearchTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsSearchArgs {
    #[serde(default)]
    pub query: String,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub team: Option<String>,
    #[serde(default = "default_num_results", deserialize_with = "args::int")]
    pub num_results: i64,
}

const DESCRIPTION: &str = r#"Search NFL news and opinions from ESPN, NFL.com, and Reddit.

Best for:
- Recent news and updates
- Trade rumors and speculation
- Injury reports
- Expert opinions and analysis
- Fan discussions and reactions

Arguments:
- query: What to search for (e.g., "Mahomes injury", "Chiefs trade rumors")
- source (optional): Filter by source - "espn", "nfl.com", "reddit"
- team (optional): Filter by team abbreviation (e.g., "KC", "BUF")
- num_results (optional): Number of results (default 5)

NOT for precise statistics (use sql_query or player_stats instead).
"#;

#[async_trait]
impl TypedTool for NewsSearchTool {
    type Args = NewsSearchArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "news_search".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "source": {"type": "string", "enum": ["espn", "nfl.com", "reddit"]},
                    "team": {"type": "string"},
                    "num_results": {"type": "integer", "default": 5}
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: NewsSearchArgs) -> Result<ToolResult, ToolError> {
        if args.query.trim().is_empty() {
            return Err(ToolError::InvalidInput("query is required".to_string()));
        }
        let filters = RetrievalFilters {
            source: args.source,
            team: args.team,
            ..Default::default()
        };

        match self
            .retriever
            .retrieve(&args.query, &filters, clamp_results(args.num_results))
            .await
        {
            Ok(fragments) if fragments.is_empty() => {
                Ok(ToolResult::ok(json!({ "message": NO_NEWS_MESSAGE })))
            }
            Ok(fragments) => Ok(ToolResult::ok(fragments_json(fragments))),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::InMemoryRetriever;
    use crate::testing::fixture_news;
    use crate::tool::Tool;

    #[tokio::test]
    async fn test_source_and_team_filters() {
        let tool = NewsSearchTool::new(Arc::new(fixture_news()));

        let result = tool
            .invoke(json!({"query": "Mahomes", "source": "reddit"}))
            .await
            .unwrap();
        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["metadata"]["source"], "reddit");

        let result = tool
            .invoke(json!({"query": "Mahomes", "team": "kc"}))
            .await
            .unwrap();
        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["metadata"]["team"], "KC");
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_message() {
        let tool = NewsSearchTool::new(Arc::new(InMemoryRetriever::empty()));
        let result = tool
            .invoke(json!({"query": "Chiefs trade rumors"}))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.data().unwrap()["message"], NO_NEWS_MESSAGE);
    }

    #[tokio::test]
    async fn test_query_required() {
        let tool = NewsSearchTool::new(Arc::new(fixture_news()));
        assert!(matches!(
            tool.invoke(json!({})).await,
            Err(ToolError::InvalidInput(_))
        ));
    }
}
