use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::guard::{check_read_only, WRITE_BLOCKED_MESSAGE};
use crate::store::AnalyticStore;
use crate::tool::{ToolDefinition, ToolError, ToolResult, TypedTool};

/// Run a model-authored, read-only SQL statement against the analytic store.
pub struct SqlQueryTool {
    store: Arc<dyn AnalyticStore>,
}

impl SqlQueryTool {
    pub fn new(store: Arc<dyn AnalyticStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
pub struct SqlQueryArgs {
    #[serde(default)]
    pub sql: Option<String>,
    /// Models often say `query` instead of `sql`.
    #[serde(default)]
    pub query: Option<String>,
}

impl SqlQueryArgs {
    fn statement(&self) -> Option<&str> {
        [self.sql.as_deref(), self.query.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

const DESCRIPTION: &str = r#"Execute a read-only SQL query against the NFL database (SQLite).

Available tables:
- player_games: Individual player stats per game
  Columns: player_id, player_display_name, position, season, week, season_type, team, opponent_team,
           passing_yards, passing_tds, passing_interceptions, completions, attempts,
           rushing_yards, rushing_tds, carries,
           receiving_yards, receiving_tds, receptions, targets,
           fantasy_points, fantasy_points_ppr, fg_made, fg_att, fg_long

- games: Game schedules and results
  Columns: game_id, season, game_type, week, home_team, away_team, home_score, away_score

- teams: Team metadata
  Columns: team_abbr, team_name, team_conf, team_division

season_type values: 'REG' (regular season), 'POST' (playoffs)
game_type values: 'REG', 'WC' (wild card), 'DIV' (divisional), 'CON' (conference), 'SB' (super bowl)

Only SELECT statements are allowed. LIKE is case-insensitive for ASCII.

Example queries:
- "SELECT * FROM player_games WHERE player_display_name LIKE '%Mahomes%' AND opponent_team = 'BUF'"
- "SELECT player_display_name, SUM(passing_yards) AS total FROM player_games WHERE season = 2024 GROUP BY player_display_name ORDER BY total DESC LIMIT 10"
"#;

#[async_trait]
impl TypedTool for SqlQueryTool {
    type Args = SqlQueryArgs;

    fn describe(&self) -> ToolDefinition {
        ToolDefinition {
            name: "sql_query".to_string(),
            description: DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "A single SELECT statement"
                    }
                },
                "required": ["sql"]
            }),
        }
    }

    async fn execute(&self, args: SqlQueryArgs) -> Result<ToolResult, ToolError> {
        let sql = args
            .statement()
            .ok_or_else(|| ToolError::InvalidInput("missing 'sql' argument".to_string()))?;

        if let Err(violation) = check_read_only(sql) {
            warn!(statement = %violation.statement, "Blocked write attempt");
            return Ok(ToolResult::failure(WRITE_BLOCKED_MESSAGE));
        }

        match self.store.query(sql, &[]).await {
            Ok(rows) => {
                debug!(rows = rows.row_count(), "sql_query complete");
                Ok(ToolResult::ok(rows.into_json()))
            }
            Err(e) => Ok(ToolResult::failure(format!("Query failed: {e}"))),
        }
    }
}
