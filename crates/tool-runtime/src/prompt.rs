//! System prompt assembly.

use chrono::{Datelike, NaiveDate};

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an expert NFL statistics analyst with access to a database of NFL game and player data.

IMPORTANT - Current Date Context:
- Today's date is in {current_year}
- The most recent completed NFL season is {current_season}
- When users say "this year", "this season", or "current season", use season={current_season}

You have access to the following tools:

{tools_description}

## How to Use Tools

To use a tool, respond with a JSON block in this EXACT format:
```json
{
    "tool": "tool_name",
    "arguments": {
        "arg1": "value1",
        "arg2": "value2"
    }
}
```

## Tool Selection Guidelines

1. **For statistics questions** (averages, totals, records, comparisons):
   - Use `sql_query` for complex queries
   - Use `player_stats` for simple "how did X do against Y" questions

2. **For rankings - BEST performers** (top players, leaders, "who led the league"):
   - Use `rankings` with order="desc" (default)

3. **For rankings - WORST performers** (bottom players, "worst quarterback"):
   - Use `rankings` with order="asc" and min_games >= 10

4. **For calculations** (percentages, averages of results):
   - Use `calculator` after getting raw numbers from other tools

5. **For narrative/context** ("tell me about", "describe", famous games):
   - Use `semantic_search`

6. **For news and opinions** ("latest news", "what are people saying", rumors):
   - Use `news_search`, optionally filtered by source ("espn", "nfl.com", "reddit") or team

## Important Notes
- Always use tools to get data - NEVER make up statistics
- Player names: Use full names like "Patrick Mahomes", not just "Mahomes"
- Team abbreviations: KC, BUF, SF, DAL, etc.
- Season types: 'REG' for regular season, 'POST' for playoffs
- If a tool returns an error or no results, try a different approach

## Response Format
CRITICAL: After getting tool results, you MUST provide a final answer in natural language.
- Include specific numbers from the tool results
- DO NOT call more tools if you already have the answer
- DO NOT include any JSON in your final answer

IMPORTANT: If you have data from a tool, USE IT to answer. Don't keep searching for more data.
"#;

/// Most recent NFL season as of `today`.
///
/// A season spans two calendar years (September to February), so from
/// January through August the latest season started the previous year.
pub fn current_season(today: NaiveDate) -> i32 {
    if today.month() <= 8 {
        today.year() - 1
    } else {
        today.year()
    }
}

/// Render the system prompt with the tool catalogue and date context.
pub fn build_system_prompt(tools_description: &str, today: NaiveDate) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{current_year}", &today.year().to_string())
        .replace("{current_season}", &current_season(today).to_string())
        .replace("{tools_description}", tools_description)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_season_boundary() {
        assert_eq!(current_season(date(2025, 2, 9)), 2024);
        assert_eq!(current_season(date(2025, 8, 31)), 2024);
        assert_eq!(current_season(date(2025, 9, 1)), 2025);
        assert_eq!(current_season(date(2025, 12, 31)), 2025);
    }

    #[test]
    fn test_prompt_embeds_catalogue_and_dates() {
        let prompt = build_system_prompt("## rankings\nRank players.", date(2025, 3, 1));
        assert!(prompt.contains("## rankings\nRank players."));
        assert!(prompt.contains("Today's date is in 2025"));
        assert!(prompt.contains("use season=2024"));
        assert!(!prompt.contains("{current_season}"));
        assert!(prompt.contains("\"tool\": \"tool_name\""));
    }
}
