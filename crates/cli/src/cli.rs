use clap::Parser;
use statline_core::Config;
use std::path::PathBuf;

/// Ask NFL statistics questions in plain English.
///
/// The agent picks tools (SQL, rankings, player lookups, calculator,
/// narrative and news search), runs them against the local database and
/// answers with the numbers it found.
#[derive(Parser, Debug)]
#[command(name = "statline", about = "NFL stats question-answering agent")]
pub struct CliArgs {
    /// Question to ask (omit with --interactive)
    pub question: Option<String>,

    /// Start an interactive prompt
    #[arg(short, long)]
    pub interactive: bool,

    /// Show model responses, tool results and the step log
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Model name override (Ollama model or OpenAI model, per provider)
    #[arg(short, long)]
    pub model: Option<String>,

    /// LLM provider: ollama or openai
    #[arg(long)]
    pub provider: Option<String>,

    /// Maximum tool calls per question
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Path to the SQLite stats database
    #[arg(long, env = "STATLINE_DB_PATH")]
    pub db: Option<PathBuf>,
}

impl CliArgs {
    /// Command-line flags win over the environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.to_lowercase();
        }
        if let Some(model) = &self.model {
            if config.llm.provider == "openai" {
                config.llm.openai_model = model.clone();
            } else {
                config.ollama.model = model.clone();
            }
        }
        if let Some(max) = self.max_iterations {
            config.agent.max_iterations = max;
        }
        if let Some(db) = &self.db {
            config.store.db_path = db.clone();
        }
    }

    /// Log filter used when `RUST_LOG` is unset. `--verbose` needs `info` so
    /// the per-step model and tool logs are shown.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    /// Name of the model that will actually be used.
    pub fn effective_model(config: &Config) -> &str {
        if config.llm.provider == "openai" {
            &config.llm.openai_model
        } else {
            &config.ollama.model
        }
    }
}
