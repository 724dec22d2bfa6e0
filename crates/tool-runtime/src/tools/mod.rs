//! Built-in tools for the stats agent.
//!
//! - **Structured** (`sql_query`, `player_stats`, `rankings`): read the
//!   analytic store
//! - **Retrieval** (`semantic_search`, `news_search`): query a [`Retriever`]
//! - `calculator` is pure

pub mod args;
pub mod calculator;
pub mod expression;
pub mod news_search;
pub mod player_stats;
pub mod rankings;
pub mod semantic_search;
pub mod sql_query;

pub use calculator::CalculatorTool;
pub use news_search::NewsSearchTool;
pub use player_stats::PlayerStatsTool;
pub use rankings::RankingsTool;
pub use semantic_search::SemanticSearchTool;
pub use sql_query::SqlQueryTool;

use crate::registry::{RegistryError, ToolRegistry};
use crate::retrieval::Retriever;
use crate::store::AnalyticStore;
use std::sync::Arc;

/// Build the registry with every built-in tool, in catalogue order.
pub fn default_registry(
    store: Arc<dyn AnalyticStore>,
    corpus: Arc<dyn Retriever>,
    news: Arc<dyn Retriever>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(SqlQueryTool::new(Arc::clone(&store)))?;
    registry.register(PlayerStatsTool::new(Arc::clone(&store)))?;
    registry.register(CalculatorTool)?;
    registry.register(SemanticSearchTool::new(corpus))?;
    registry.register(RankingsTool::new(store))?;
    registry.register(NewsSearchTool::new(news))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_corpus, fixture_news, fixture_store};

    #[tokio::test]
    async fn test_default_registry_order() {
        let (_dir, store) = fixture_store().await;
        let registry = default_registry(
            Arc::new(store),
            Arc::new(fixture_corpus()),
            Arc::new(fixture_news()),
        )
        .unwrap();

        assert_eq!(
            registry.names(),
            vec![
                "sql_query",
                "player_stats",
                "calculator",
                "semantic_search",
                "rankings",
                "news_search"
            ]
        );
        let catalogue = registry.catalogue();
        assert!(catalogue.starts_with("## sql_query\n"));
        assert!(catalogue.contains("## news_search\n"));
    }
}
