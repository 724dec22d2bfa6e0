//! Shared fixtures: a small on-disk SQLite database and retrieval corpora.

use crate::retrieval::{CorpusDocument, InMemoryRetriever};
use crate::store::SqliteStore;
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    "CREATE TABLE player_games (
        player_id TEXT NOT NULL,
        player_display_name TEXT NOT NULL,
        position TEXT NOT NULL,
        season INTEGER NOT NULL,
        week INTEGER NOT NULL,
        season_type TEXT NOT NULL,
        team TEXT NOT NULL,
        opponent_team TEXT NOT NULL,
        passing_yards INTEGER DEFAULT 0,
        passing_tds INTEGER DEFAULT 0,
        passing_interceptions INTEGER DEFAULT 0,
        completions INTEGER DEFAULT 0,
        attempts INTEGER DEFAULT 0,
        rushing_yards INTEGER DEFAULT 0,
        rushing_tds INTEGER DEFAULT 0,
        carries INTEGER DEFAULT 0,
        receiving_yards INTEGER DEFAULT 0,
        receiving_tds INTEGER DEFAULT 0,
        receptions INTEGER DEFAULT 0,
        targets INTEGER DEFAULT 0,
        fantasy_points REAL DEFAULT 0,
        fantasy_points_ppr REAL DEFAULT 0,
        fg_made INTEGER DEFAULT 0,
        fg_att INTEGER DEFAULT 0,
        fg_long INTEGER DEFAULT 0
    )",
    "CREATE TABLE games (
        game_id TEXT PRIMARY KEY,
        season INTEGER NOT NULL,
        game_type TEXT NOT NULL,
        week INTEGER NOT NULL,
        home_team TEXT NOT NULL,
        away_team TEXT NOT NULL,
        home_score INTEGER,
        away_score INTEGER
    )",
    "CREATE TABLE teams (
        team_abbr TEXT PRIMARY KEY,
        team_name TEXT NOT NULL,
        team_conf TEXT NOT NULL,
        team_division TEXT NOT NULL
    )",
];

const SEED: &[&str] = &[
    "INSERT INTO teams VALUES
        ('KC', 'Kansas City Chiefs', 'AFC', 'AFC West'),
        ('BUF', 'Buffalo Bills', 'AFC', 'AFC East'),
        ('CIN', 'Cincinnati Bengals', 'AFC', 'AFC North'),
        ('BAL', 'Baltimore Ravens', 'AFC', 'AFC North')",
    "INSERT INTO games VALUES
        ('2024_01_BAL_KC', 2024, 'REG', 1, 'KC', 'BAL', 27, 20),
        ('2024_01_ARI_BUF', 2024, 'REG', 1, 'BUF', 'ARI', 34, 28),
        ('2024_02_CIN_KC', 2024, 'REG', 2, 'KC', 'CIN', 26, 25)",
    "INSERT INTO player_games
        (player_id, player_display_name, position, season, week, season_type, team, opponent_team,
         passing_yards, passing_tds, passing_interceptions, rushing_yards, rushing_tds, carries)
     VALUES
        ('burrow', 'Joe Burrow', 'QB', 2024, 1, 'REG', 'CIN', 'NE', 300, 2, 0, 10, 0, 3),
        ('burrow', 'Joe Burrow', 'QB', 2024, 2, 'REG', 'CIN', 'KC', 258, 2, 1, 5, 0, 2),
        ('mahomes', 'Patrick Mahomes', 'QB', 2024, 1, 'REG', 'KC', 'BAL', 291, 1, 1, 18, 0, 5),
        ('mahomes', 'Patrick Mahomes', 'QB', 2024, 2, 'REG', 'KC', 'CIN', 151, 1, 2, 2, 0, 2),
        ('allen', 'Josh Allen', 'QB', 2024, 1, 'REG', 'BUF', 'ARI', 232, 2, 0, 39, 2, 9),
        ('allen', 'Josh Allen', 'QB', 2024, 2, 'REG', 'BUF', 'MIA', 139, 0, 0, 11, 1, 4),
        ('henry', 'Derrick Henry', 'RB', 2024, 1, 'REG', 'BAL', 'KC', 0, 0, 0, 46, 1, 13),
        ('henry', 'Derrick Henry', 'RB', 2024, 2, 'REG', 'BAL', 'LV', 0, 0, 0, 84, 0, 18),
        ('mahomes', 'Patrick Mahomes', 'QB', 2020, 20, 'POST', 'KC', 'BUF', 325, 3, 0, 0, 0, 3),
        ('mahomes', 'Patrick Mahomes', 'QB', 2021, 19, 'POST', 'KC', 'BUF', 378, 3, 0, 69, 1, 7),
        ('mahomes', 'Patrick Mahomes', 'QB', 2023, 20, 'POST', 'KC', 'BUF', 215, 2, 0, 8, 0, 3),
        ('mahomes', 'Patrick Mahomes', 'QB', 2024, 21, 'POST', 'KC', 'BUF', 245, 1, 0, 43, 2, 11)",
];

/// Create and seed `nfl_stats.sqlite` inside `dir`, returning its path.
pub async fn seed_fixture_db(dir: &Path) -> PathBuf {
    let path = dir.join("nfl_stats.sqlite");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("create fixture db");

    for statement in SCHEMA.iter().chain(SEED) {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("seed fixture db");
    }
    pool.close().await;
    path
}

/// A seeded database opened read-only. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn fixture_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seed_fixture_db(dir.path()).await;
    let store = SqliteStore::open_read_only(&path, 2)
        .await
        .expect("open fixture store");
    (dir, store)
}

/// Narrative fragments for semantic search tests.
pub fn fixture_corpus() -> InMemoryRetriever {
    InMemoryRetriever::new(vec![
        CorpusDocument {
            text: "Patrick Mahomes led the Chiefs past the Bills 42-36 in overtime in the \
                   2021 divisional round, one of the greatest playoff games ever played."
                .to_string(),
            metadata: json!({"category": "game_recap", "season": 2021, "team": "KC", "entities": ["Patrick Mahomes", "KC", "BUF"]})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
        CorpusDocument {
            text: "Joe Burrow threw for over 4,900 yards in 2024 to lead the league in passing."
                .to_string(),
            metadata: json!({"category": "season_summary", "season": 2024, "team": "CIN", "entities": ["Joe Burrow"]})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
        CorpusDocument {
            text: "A freezing cold wild card game in Kansas City saw temperatures below zero."
                .to_string(),
            metadata: json!({"category": "game_recap", "season": 2023, "team": "KC"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
    ])
}

/// News articles for news search tests.
pub fn fixture_news() -> InMemoryRetriever {
    InMemoryRetriever::new(vec![
        CorpusDocument {
            text: "Chiefs activate Mahomes from injury report ahead of playoff opener.".to_string(),
            metadata: json!({"source": "espn", "team": "KC", "title": "Mahomes cleared"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
        CorpusDocument {
            text: "Fans debate whether the Bills can finally beat Mahomes in January.".to_string(),
            metadata: json!({"source": "reddit", "team": "BUF", "title": "Bills vs Mahomes"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        },
    ])
}
