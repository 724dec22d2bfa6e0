use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatlineError};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f32(profile: &str, key: &str, default: f32) -> f32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STATLINE_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STATLINE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            ollama: OllamaConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
            retrieval: RetrievalConfig::from_env_profiled(p),
            agent: AgentConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  llm:         provider={}, timeout={}s", self.llm.provider, self.llm.timeout_secs);
        tracing::info!("  ollama:      url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!("  store:       db_path={}", self.store.db_path.display());
        tracing::info!(
            "  retrieval:   corpus={}, news={}",
            display_opt(&self.retrieval.corpus_path),
            display_opt(&self.retrieval.news_path)
        );
        tracing::info!(
            "  agent:       max_iterations={}, temperature={}",
            self.agent.max_iterations,
            self.agent.temperature
        );
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.llm.is_configured() {
            return Err(StatlineError::Config(match self.llm.provider.as_str() {
                "openai" => "LLM_PROVIDER=openai requires OPENAI_API_KEY".to_string(),
                other => format!("unknown LLM provider '{other}' (expected ollama or openai)"),
            }));
        }
        if !(0.0..=2.0).contains(&self.agent.temperature) {
            return Err(StatlineError::Config(format!(
                "AGENT_TEMPERATURE must be between 0 and 2, got {}",
                self.agent.temperature
            )));
        }
        if self.store.max_connections == 0 {
            return Err(StatlineError::Config(
                "STATLINE_DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Return a redacted view safe for display (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "provider": self.llm.provider,
                "openai_model": self.llm.openai_model,
                "timeout_secs": self.llm.timeout_secs,
                "configured": self.llm.is_configured(),
            },
            "ollama": { "url": self.ollama.url, "model": self.ollama.model },
            "store": { "db_path": self.store.db_path, "max_connections": self.store.max_connections },
            "retrieval": {
                "corpus_path": self.retrieval.corpus_path,
                "news_path": self.retrieval.news_path,
            },
            "agent": {
                "max_iterations": self.agent.max_iterations,
                "temperature": self.agent.temperature,
            },
        })
    }
}

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

// ── LLM provider selection ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "ollama"),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", "gpt-4o"),
            openai_base_url: profiled_env_opt(p, "OPENAI_BASE_URL"),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 2048),
            timeout_secs: profiled_env_u64(p, "LLM_TIMEOUT_SECS", 180),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl OllamaConfig {
    fn from_env_profiled(p: &str) -> Self {
        // AGENT_MODEL lets the agent run a different model than other tooling.
        let model = profiled_env_opt(p, "AGENT_MODEL")
            .unwrap_or_else(|| profiled_env_or(p, "OLLAMA_MODEL", "llama3.1"));
        Self {
            url: profiled_env_or(p, "OLLAMA_HOST", "http://localhost:11434"),
            model,
        }
    }
}

// ── Analytic store ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            db_path: PathBuf::from(profiled_env_or(p, "STATLINE_DB_PATH", "data/nfl_stats.sqlite")),
            max_connections: profiled_env_u32(p, "STATLINE_DB_MAX_CONNECTIONS", 4),
        }
    }
}

// ── Retrieval corpora ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// JSONL file of narrative fragments for semantic search.
    pub corpus_path: Option<PathBuf>,
    /// JSONL file of news articles for news search.
    pub news_path: Option<PathBuf>,
}

impl RetrievalConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            corpus_path: profiled_env_opt(p, "STATLINE_CORPUS_PATH").map(PathBuf::from),
            news_path: profiled_env_opt(p, "STATLINE_NEWS_PATH").map(PathBuf::from),
        }
    }
}

// ── Agent loop ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub temperature: f32,
}

impl AgentConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_iterations: profiled_env_u32(p, "AGENT_MAX_ITERATIONS", 5),
            temperature: profiled_env_f32(p, "AGENT_TEMPERATURE", 0.2),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            temperature: 0.2,
        }
    }
}
