mod cli;
mod terminal;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use statline_core::config::load_dotenv;
use statline_core::Config;
use statline_llm::{create_provider, LlmProvider, LlmProviderAdapter};
use statline_tool_runtime::{
    default_registry, Agent, AgentSettings, InMemoryRetriever, Retriever, SqliteStore,
    DEFAULT_CONTEXT_ROWS,
};

use crate::cli::CliArgs;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = CliArgs::parse();

    let default_level = args.log_level();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    if args.question.is_none() && !args.interactive {
        CliArgs::command().print_help()?;
        println!();
        return Ok(());
    }

    let terminal = Terminal::new();

    let mut config = Config::from_env();
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;
    config.log_summary();
    debug!(config = %config.redacted_summary(), "Effective configuration");

    let model_name = CliArgs::effective_model(&config).to_string();
    let provider = create_provider(&config.llm, &config.ollama)
        .context("failed to create LLM provider")?;

    if let Err(msg) = check_provider(provider.as_ref(), &config).await {
        terminal.print_error(&msg)?;
        std::process::exit(1);
    }

    let store = SqliteStore::open_read_only(&config.store.db_path, config.store.max_connections)
        .await
        .with_context(|| {
            format!(
                "failed to open stats database at {}",
                config.store.db_path.display()
            )
        })?;

    let corpus = load_retriever(config.retrieval.corpus_path.as_deref())
        .context("failed to load narrative corpus")?;
    let news = load_retriever(config.retrieval.news_path.as_deref())
        .context("failed to load news corpus")?;

    let registry = default_registry(Arc::new(store), corpus, news)
        .context("failed to build tool registry")?;
    let tool_count = registry.len();

    let model = LlmProviderAdapter::new(provider, config.llm.max_tokens);
    let agent = Agent::new(
        Arc::new(model),
        Arc::new(registry),
        AgentSettings {
            max_iterations: config.agent.max_iterations,
            temperature: config.agent.temperature,
            context_rows: DEFAULT_CONTEXT_ROWS,
        },
    );

    if let Some(question) = args.question.as_deref().filter(|_| !args.interactive) {
        return ask(&agent, &terminal, question, args.verbose).await;
    }

    terminal.print_banner(&config.llm.provider, &model_name, tool_count)?;
    if let Some(question) = args.question.as_deref() {
        ask(&agent, &terminal, question, args.verbose).await?;
    }

    loop {
        let input = match terminal.read_input()? {
            Some(text) => text,
            None => {
                terminal.print_info("Goodbye.")?;
                break;
            }
        };
        if input.is_empty() {
            continue;
        }
        ask(&agent, &terminal, &input, args.verbose).await?;
    }

    Ok(())
}

/// Run one question and print the outcome. Model failures are shown, not
/// propagated, so an interactive session survives a flaky provider.
async fn ask(agent: &Agent, terminal: &Terminal, question: &str, verbose: bool) -> Result<()> {
    info!(question, "Answering question");
    let spinner = terminal.start_spinner("Thinking...")?;
    let outcome = agent.run(question, verbose).await;
    spinner.stop();

    match outcome {
        Ok(response) => terminal.print_response(&response, verbose)?,
        Err(e) => {
            error!(error = %e, "Agent run failed");
            terminal.print_error(&e.to_string())?;
        }
    }
    Ok(())
}

/// Confirm the provider is reachable and the model is installed.
async fn check_provider(provider: &dyn LlmProvider, config: &Config) -> Result<(), String> {
    let is_ollama = config.llm.provider == "ollama";

    if !provider.is_available().await {
        return Err(if is_ollama {
            format!(
                "Ollama is not reachable at {}. Start it with: ollama serve",
                config.ollama.url
            )
        } else {
            format!("{} API is not reachable. Check your API key and network.", config.llm.provider)
        });
    }

    if !provider.model_exists().await {
        return Err(if is_ollama {
            format!(
                "Model '{}' is not installed. Install it with: ollama pull {}",
                provider.model(),
                provider.model()
            )
        } else {
            format!("Model '{}' is not available for this API key.", provider.model())
        });
    }

    Ok(())
}

fn load_retriever(path: Option<&Path>) -> Result<Arc<dyn Retriever>> {
    let retriever = match path {
        Some(path) => InMemoryRetriever::from_jsonl(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => InMemoryRetriever::empty(),
    };
    Ok(Arc::new(retriever))
}
