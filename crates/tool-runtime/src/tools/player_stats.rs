use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::args;
use crate::store::{AnalyticStore, SqlParam};
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

/// Most recent games returned alongside the summary.
const RECENT_GAMES_LIMIT: i64 = 30;

/// Game log plus totals for one player, without the model writing SQL.
pub struct PlayerStatsTool {
    store: Arc<dyn AnalyticStore>,
}

impl PlayerStatsTool {
    pub fn new(store: Arc<dyn AnalyticStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayerStatsArgs {
    #[serde(default)]
    pub player_name: String,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub opponent: Option<String>,
    #[serde(default, deserialize_with = "args::opt_int")]
    pub season: Option<i64>,
    #[serde(default, deserialize_with = "args::opt_text")]
    pub season_type: Option<String>,
}

const DESCRIPTION: &str = r#"Look up stats for a specific player.

Arguments:
- player_name (required): Player name (partial match supported), e.g., "Patrick Mahomes" or "Mahomes"
- opponent (optional): Team abbreviation to filter by opponent, e.g., "BUF", "KC", "SF"
- season (optional): Year to filter by, e.g., 2024
- season_type (optional): 'REG' for regular season, 'POST' for playoffs

Returns game-by-game stats (most recent 30) and a summary with totals/averages.

Example: {"player_name": "Patrick Mahomes", "opponent": "BUF", "season_type": "POST"}
"#;

const GAMES_SQL: &str = "SELECT season, week, season_type, team, opponent_team,
       passing_yards, passing_tds, passing_interceptions,
       rushing_yards, rushing_tds,
       receiving_yards, receiving_tds
FROM player_games
WHERE {where}
ORDER BY season DESC, week DESC
LIMIT {limit}";

const SUMMARY_SQL: &str = "SELECT
    COUNT(*) AS games_played,
    SUM(CASE WHEN passing_yards > 0 OR rushing_yards > 0 THEN 1 ELSE 0 END) AS games_with_stats,
    ROUND(AVG(passing_yards), 1) AS avg_passing_yards,
    SUM(passing_yards) AS total_passing_yards,
    SUM(passing_tds) AS total_passing_tds,
    SUM(passing_interceptions) AS total_interceptions,
    ROUND(AVG(rushing_yards), 1) AS avg_rushing_yards,
    SUM(rushing_yards) AS total_rushing_yards,
    SUM(rushing_tds) AS total_rushing_tds,
    ROUND(AVG(receiving_yards), 1) AS avg_receiving_yards,
    SUM(receiving_yards) AS total_receiving_yards,
    SUM(receiving_tds) AS total_receiving_tds
FROM player_games
WHERE {where}";

#[async_trait]
impl TypedTool for PlayerStatsTool {
    type Args = PlayerStatsArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "player_stats".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "player_name": {"type": "string"},
                    "opponent": {"type": "string", "description": "Opponent team abbreviation"},
                    "season": {"type": "integer"},
                    "season_type": {"type": "string", "enum": ["REG", "POST"]}
                },
                "required": ["player_name"]
            }),
        }
    }

    async fn execute(&self, args: PlayerStatsArgs) -> Result<ToolResult, ToolError> {
        let player = args.player_name.trim();
        if player.is_empty() {
            return Err(ToolError::InvalidInput("player_name is required".to_string()));
        }

        let mut conditions = vec!["player_display_name LIKE ?"];
        let mut params = vec![SqlParam::Text(format!("%{player}%"))];

        if let Some(opponent) = &args.opponent {
            conditions.push("opponent_team = ?");
            params.push(SqlParam::Text(opponent.to_uppercase()));
        }
        if let Some(season) = args.season {
            conditions.push("season = ?");
            params.push(SqlParam::Int(season));
        }
        if let Some(season_type) = &args.season_type {
            conditions.push("season_type = ?");
            params.push(SqlParam::Text(season_type.to_uppercase()));
        }
        let where_clause = conditions.join(" AND ");

        let games_sql = GAMES_SQL
            .replace("{where}", &where_clause)
            .replace("{limit}", &RECENT_GAMES_LIMIT.to_string());
        let summary_sql = SUMMARY_SQL.replace("{where}", &where_clause);

        let games = match self.store.query(&games_sql, &params).await {
            Ok(rows) => rows,
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };
        let summary = match self.store.query(&summary_sql, &params).await {
            Ok(rows) => rows.rows.into_iter().next().unwrap_or_default(),
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };

        let total_games_found = games.row_count();
        Ok(ToolResult::ok(json!({
            "summary": Value::Object(summary),
            "recent_games": games.into_json(),
            "total_games_found": total_games_found,
        })))
    }
}

/// One-line passing summary used by degraded answers. `None` for non-passers.
pub(crate) fn summary_line(player: &str, summary: &Map<String, Value>) -> Option<String> {
    let yards = summary.get("total_passing_yards").and_then(Value::as_i64)?;
    if yards <= 0 {
        return None;
    }
    let tds = summary
        .get("total_passing_tds")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let games = summary
        .get("games_played")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    Some(format!(
        "{player} had {} passing yards and {tds} touchdowns in {games} games.",
        crate::response::group_thousands(yards)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_store;
    use crate::tool::Tool;

    async fn tool() -> (tempfile::TempDir, PlayerStatsTool) {
        let (dir, store) = fixture_store().await;
        (dir, PlayerStatsTool::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn test_playoff_games_vs_opponent() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"player_name": "Mahomes", "opponent": "buf", "season_type": "POST"}))
            .await
            .unwrap();

        let data = result.data().unwrap();
        assert_eq!(data["total_games_found"], 4);
        assert_eq!(data["summary"]["games_played"], 4);
        assert_eq!(data["summary"]["total_passing_tds"], 9);
        assert_eq!(data["summary"]["total_interceptions"], 0);
        // Most recent first.
        assert_eq!(data["recent_games"][0]["season"], 2024);
    }

    #[tokio::test]
    async fn test_season_filter_accepts_string() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"player_name": "Joe Burrow", "season": "2024"}))
            .await
            .unwrap();
        let data = result.data().unwrap();
        assert_eq!(data["summary"]["total_passing_yards"], 558);
        assert_eq!(data["summary"]["avg_passing_yards"], 279.0);
    }

    #[tokio::test]
    async fn test_unknown_player_is_empty_success() {
        let (_dir, tool) = tool().await;
        let result = tool
            .invoke(json!({"player_name": "Nobody McNoname"}))
            .await
            .unwrap();

        assert!(result.is_success());
        let data = result.data().unwrap();
        assert_eq!(data["total_games_found"], 0);
        assert_eq!(data["summary"]["games_played"], 0);
        assert_eq!(data["recent_games"], json!([]));
    }

    #[tokio::test]
    async fn test_player_name_required() {
        let (_dir, tool) = tool().await;
        assert!(matches!(
            tool.invoke(json!({"player_name": "  "})).await,
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_summary_line() {
        let summary = json!({"games_played": 2, "total_passing_yards": 4918, "total_passing_tds": 43});
        assert_eq!(
            summary_line("Joe Burrow", summary.as_object().unwrap()).as_deref(),
            Some("Joe Burrow had 4,918 passing yards and 43 touchdowns in 2 games.")
        );
        let rb = json!({"games_played": 2, "total_passing_yards": 0});
        assert!(summary_line("Derrick Henry", rb.as_object().unwrap()).is_none());
    }
}
