//! End-to-end runs of the agent loop with a scripted model and the seeded
//! SQLite fixture.

use serde_json::json;
use statline_tool_runtime::model::mock::MockModelClient;
use statline_tool_runtime::testing::{fixture_corpus, fixture_news, fixture_store};
use statline_tool_runtime::{
    default_registry, Agent, AgentSettings, ParsedToolCall, Role, ToolRegistry,
    WRITE_BLOCKED_MESSAGE,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn registry() -> (TempDir, Arc<ToolRegistry>) {
    let (dir, store) = fixture_store().await;
    let registry = default_registry(
        Arc::new(store),
        Arc::new(fixture_corpus()),
        Arc::new(fixture_news()),
    )
    .expect("registry");
    (dir, Arc::new(registry))
}

fn call(tool: &str, arguments: serde_json::Value) -> String {
    format!(
        "Let me look that up.\n{}",
        ParsedToolCall::new(tool, arguments).to_fenced_block()
    )
}

#[tokio::test]
async fn rankings_then_calculator() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::new());
    model
        .queue_text(&call(
            "rankings",
            json!({"stat": "passing_yards", "season": 2024, "position": "QB", "limit": 3}),
        ))
        .queue_text(&call(
            "calculator",
            json!({"operation": "average", "values": [558, 442, 371]}),
        ))
        .queue_text("Joe Burrow led with 558 yards; the top three averaged 457 yards.");

    let agent = Agent::new(model.clone(), registry, AgentSettings::default());
    let response = agent.run("Who led in passing and what was the top-3 average?", true).await.unwrap();

    assert_eq!(response.tool_names(), vec!["rankings", "calculator"]);
    assert!(response.tool_calls.iter().all(|c| c.success));
    assert_eq!(
        response.tool_calls[0].result.as_ref().unwrap()[0]["player"],
        "Joe Burrow"
    );
    assert_eq!(
        response.tool_calls[1].result.as_ref().unwrap()["result"].as_f64(),
        Some(457.0)
    );
    assert!(response.answer.starts_with("Joe Burrow led"));
    assert_eq!(response.iterations, 3);
    assert_eq!(model.call_count(), 3);
}

#[tokio::test]
async fn drop_table_is_refused_and_loop_continues() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::new());
    model
        .queue_text(&call("sql_query", json!({"sql": "DROP TABLE games"})))
        .queue_text(&call("sql_query", json!({"sql": "SELECT COUNT(*) AS n FROM games"})))
        .queue_text("There are 3 games on record.");

    let agent = Agent::new(model.clone(), registry, AgentSettings::default());
    let response = agent.run("Drop the games table", false).await.unwrap();

    let first = &response.tool_calls[0];
    assert!(!first.success);
    assert_eq!(first.error.as_deref(), Some(WRITE_BLOCKED_MESSAGE));

    // The table is intact.
    assert_eq!(response.tool_calls[1].result, Some(json!([{"n": 3}])));
    assert_eq!(response.answer, "There are 3 games on record.");

    let refusal = &model.transcripts()[1][3];
    assert_eq!(refusal.role, Role::ToolResult);
    assert!(refusal
        .content
        .contains("Error: Write operations are not allowed"));
}

#[tokio::test]
async fn no_data_is_reported_to_the_model() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::new());
    model
        .queue_text(&call("player_stats", json!({"player_name": "Nobody McNoname"})))
        .queue_text("I couldn't find any games for that player.");

    let agent = Agent::new(model.clone(), registry, AgentSettings::default());
    let response = agent.run("How did Nobody McNoname do?", false).await.unwrap();

    let record = &response.tool_calls[0];
    assert!(record.success);
    assert_eq!(record.result.as_ref().unwrap()["total_games_found"], 0);
    assert!(response.answer.contains("couldn't find"));
}

#[tokio::test]
async fn empty_rankings_get_retry_directive() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::new());
    model
        .queue_text(&call("rankings", json!({"stat": "passing_yards", "season": 1990})))
        .queue_text("No data for 1990.");

    let agent = Agent::new(model.clone(), registry, AgentSettings::default());
    agent.run("Who led in 1990?", false).await.unwrap();

    let followup = &model.transcripts()[1][3].content;
    assert!(followup.starts_with("Tool result:\nNo results found."));
    assert!(followup.contains("Try a different approach or tool."));
}

#[tokio::test]
async fn budget_exhaustion_returns_degraded_answer() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::always(&call(
        "rankings",
        json!({"stat": "passing_yards", "season": 2024}),
    )));

    let agent = Agent::new(model.clone(), registry, AgentSettings::default()).with_max_iterations(2);
    let response = agent.run("Who led?", true).await.unwrap();

    assert!(model.call_count() <= 3);
    assert_eq!(response.tool_calls.len(), 2);
    assert!(response.answer.contains("limit of 2 tool-calling steps"));
    assert!(response
        .answer
        .contains("Joe Burrow led with 558 passing yards in 2 games."));
    assert_eq!(response.thinking.last().map(String::as_str), Some("Used rankings: success"));
}

#[tokio::test]
async fn unknown_tool_is_a_failed_call() {
    let (_dir, registry) = registry().await;
    let model = Arc::new(MockModelClient::new());
    model
        .queue_text(r#"{"tool": "weather", "arguments": {"city": "Buffalo"}}"#)
        .queue_text("I don't have weather data.");

    let agent = Agent::new(model, registry, AgentSettings::default());
    let response = agent.run("Weather in Buffalo?", false).await.unwrap();

    assert_eq!(response.tool_calls[0].error.as_deref(), Some("Unknown tool: weather"));
    assert_eq!(response.answer, "I don't have weather data.");
}

#[tokio::test]
async fn concurrent_runs_share_registry() {
    let (_dir, registry) = registry().await;

    let mut handles = Vec::new();
    for player in ["Joe Burrow", "Josh Allen", "Patrick Mahomes"] {
        let model = Arc::new(MockModelClient::new());
        model
            .queue_text(&call("player_stats", json!({"player_name": player, "season": 2024})))
            .queue_text("done");
        let agent = Agent::new(model, Arc::clone(&registry), AgentSettings::default());
        handles.push(tokio::spawn(async move { agent.run("stats?", false).await }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert!(response.tool_calls[0].success);
    }
}
