use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::args;
use crate::prompt::current_season;
use crate::store::{AnalyticStore, SqlParam};
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

/// Columns that may be ranked. The stat name is interpolated into SQL, so
/// nothing outside this list ever reaches the store.
pub const RANKABLE_STATS: &[&str] = &[
    "attempts",
    "carries",
    "completions",
    "fantasy_points",
    "fantasy_points_ppr",
    "fg_att",
    "fg_long",
    "fg_made",
    "passing_interceptions",
    "passing_tds",
    "passing_yards",
    "receiving_tds",
    "receiving_yards",
    "receptions",
    "rushing_tds",
    "rushing_yards",
    "targets",
];

const MAX_LIMIT: i64 = 100;

/// Leaderboards ("who led the league") and trailing boards ("worst QB").
pub struct RankingsTool {
    store: Arc<dyn AnalyticStore>,
}

impl RankingsTool {
    pub fn new(store: Arc<dyn AnalyticStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
pub struct RankingsArgs {
    #[serde(default)]
    pub stat: String,
    /// Defaults to the most recent completed season.
    #[serde(default, deserialize_with = "args::opt_int")]
    pub season: Option<i64>,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub position: Option<String>,
    #[serde(default = "default_limit", deserialize_with = "args::int")]
    pub limit: i64,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub season_type: Option<String>,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub order: Option<String>,
    #[serde(default = "default_min_games", deserialize_with = "args::int")]
    pub min_games: i64,
}

fn default_limit() -> i64 {
    10
}

fn default_min_games() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    Best,
    Worst,
}

impl Order {
    /// Anything other than `asc` ranks best-first.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(o) if o.eq_ignore_ascii_case("asc") => Order::Worst,
            _ => Order::Best,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Order::Best => "DESC",
            Order::Worst => "ASC",
        }
    }

    fn rank_label(self) -> &'static str {
        match self {
            Order::Best => "rank",
            Order::Worst => "worst_rank",
        }
    }
}

const DESCRIPTION: &str = r#"Get players ranked by a statistic (best or worst).

Arguments:
- stat: Statistic to rank by. Options:
  - passing_yards, passing_tds, passing_interceptions, completions, attempts
  - rushing_yards, rushing_tds, carries
  - receiving_yards, receiving_tds, receptions, targets
  - fg_made, fg_att, fg_long (kicker stats)
  - fantasy_points, fantasy_points_ppr
- season: Year to rank, e.g., 2024
- position: Filter by position (optional): 'QB', 'RB', 'WR', 'TE', 'K' (kicker)
- limit: Number of players to return (default 10)
- season_type: 'REG' for regular season, 'POST' for playoffs (default 'REG')
- order: 'desc' for best/highest (default), 'asc' for worst/lowest
- min_games: Minimum games played to qualify (default 1, use higher like 10 for "worst" queries)

Examples:
- Best: {"stat": "passing_yards", "season": 2024, "position": "QB", "limit": 10}
- Worst: {"stat": "passing_yards", "season": 2024, "position": "QB", "order": "asc", "min_games": 10}
- Kickers: {"stat": "fg_made", "season": 2024, "position": "K"}
"#;

#[async_trait]
impl TypedTool for RankingsTool {
    type Args = RankingsArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "rankings".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "stat": {"type": "string", "enum": RANKABLE_STATS},
                    "season": {"type": "integer"},
                    "position": {"type": "string"},
                    "limit": {"type": "integer", "default": 10},
                    "season_type": {"type": "string", "enum": ["REG", "POST"], "default": "REG"},
                    "order": {"type": "string", "enum": ["desc", "asc"], "default": "desc"},
                    "min_games": {"type": "integer", "default": 1}
                },
                "required": ["stat"]
            }),
        }
    }

    async fn execute(&self, args: RankingsArgs) -> Result<ToolResult, ToolError> {
        let stat = args.stat.trim().to_lowercase();
        if !RANKABLE_STATS.contains(&stat.as_str()) {
            return Ok(ToolResult::failure(format!(
                "Invalid stat: {}. Valid options: {}",
                args.stat,
                RANKABLE_STATS.join(", ")
            )));
        }

        let order = Order::parse(args.order.as_deref());
        let season = args
            .season
            .unwrap_or_else(|| i64::from(current_season(Local::now().date_naive())));
        let season_type = args
            .season_type
            .as_deref()
            .unwrap_or("REG")
            .to_uppercase();
        let limit = args.limit.clamp(1, MAX_LIMIT);
        let min_games = args.min_games.max(1);

        let mut conditions = vec!["season = ?", "season_type = ?"];
        let mut params = vec![SqlParam::Int(season), SqlParam::Text(season_type)];
        if let Some(position) = &args.position {
            conditions.push("position = ?");
            params.push(SqlParam::Text(position.to_uppercase()));
        }
        params.push(SqlParam::Int(min_games));
        params.push(SqlParam::Int(limit));

        let sql = format!(
            "SELECT player_display_name AS player, position, team,
                    SUM({stat}) AS total_{stat}, COUNT(*) AS games
             FROM player_games
             WHERE {where_clause}
             GROUP BY player_display_name, position, team
             HAVING COUNT(*) >= ? AND SUM({stat}) > 0
             ORDER BY total_{stat} {direction}
             LIMIT ?",
            where_clause = conditions.join(" AND "),
            direction = order.sql(),
        );

        let rows = match self.store.query(&sql, &params).await {
            Ok(rows) => rows,
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };
        debug!(stat = %stat, season, rows = rows.row_count(), "rankings complete");

        let ranked: Vec<Value> = rows
            .rows
            .into_iter()
            .enumerate()
            .map(|(idx, mut row)| {
                row.insert(order.rank_label().to_string(), json!(idx + 1));
                Value::Object(row)
            })
            .collect();

        Ok(ToolResult::ok(Value::Array(ranked)))
    }
}

/// "X led with N stat in G games." from the first ranked row.
pub(crate) fn leader_line(rows: &[Value]) -> Option<String> {
    let first = rows.first()?.as_object()?;
    let (key, value) = first
        .iter()
        .find(|(key, value)| key.starts_with("total_") && value.is_number())?;

    let player = first
        .get("player")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    let stat_name = key.trim_start_matches("total_").replace('_', " ");
    let amount = match value.as_i64() {
        Some(n) => crate::response::group_thousands(n),
        None => value.to_string(),
    };
    let games = match first.get("games").and_then(Value::as_i64) {
        Some(g) if g > 0 => format!(" in {g} games"),
        _ => String::new(),
    };
    Some(format!(
        "Based on the data, {player} led with {amount} {stat_name}{games}."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use crate::tool::Tool;

    async fn tool() -> (tempfile::TempDir, RankingsTool) {
        let (dir, store) = fixture_store().await;
        (dir, RankingsTool::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_best_passers() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "passing_yards", "season": 2024, "position": "qb", "limit": 2}))
            .await
            .unwrap();

        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["player"], "Joe Burrow");
        assert_eq!(rows[0]["total_passing_yards"], 558);
        assert_eq!(rows[0]["rank"], 1);
        assert_eq!(rows[1]["player"], "Patrick Mahomes");
        assert_eq!(rows[1]["rank"], 2);
    }

    #[tokio::test]
    async fn test_worst_rank_excludes_zero_totals() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "passing_yards", "season": 2024, "order": "ASC", "min_games": 2}))
            .await
            .unwrap();

        let rows = result.data().unwrap().as_array().unwrap().clone();
        // Henry has zero passing yards and never qualifies.
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["player"], "Josh Allen");
        assert_eq!(rows[0]["worst_rank"], 1);
        assert!(rows[0].get("rank").is_none());
    }

    #[tokio::test]
    async fn test_unknown_order_falls_back_to_desc() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "rushing_yards", "season": 2024, "order": "sideways"}))
            .await
            .unwrap();
        let rows = result.data().unwrap().as_array().unwrap().clone();
        assert_eq!(rows[0]["player"], "Derrick Henry");
        assert_eq!(rows[0]["rank"], 1);
    }

    #[tokio::test]
    async fn test_invalid_stat() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "passing_yards; DROP TABLE games", "season": 2024}))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert!(result.error().unwrap().starts_with("Invalid stat:"));
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_success() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "passing_yards", "season": 1999}))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!([])));
    }

    #[tokio::test]
    async fn test_min_games_filters() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"stat": "passing_yards", "season": 2024, "min_games": 3}))
            .await
            .unwrap();
        assert_eq!(result.data(), Some(&json!([])));
    }

    #[test]
    fn test_leader_line() {
        let rows = vec![json!({"player": "Joe Burrow", "total_passing_yards": 4918, "games": 17, "rank": 1})];
        assert_eq!(
            leader_line(&rows).as_deref(),
            Some("Based on the data, Joe Burrow led with 4,918 passing yards in 17 games.")
        );
        assert!(leader_line(&[]).is_none());
    }
}
