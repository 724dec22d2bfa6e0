use crate::conversation::Conversation;
use crate::model::{ModelClient, ModelError};
use crate::parser::parse_tool_call;
use crate::prompt::build_system_prompt;
use crate::registry::ToolRegistry;
use crate::response::{AgentResponse, RunTrace};
use crate::tool::ToolResult;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Loop limits and sampling settings.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Maximum tool dispatches per run. The model gets one extra call after
    /// the last dispatch to produce its answer.
    pub max_iterations: u32,
    pub temperature: f32,
    /// Rows of a list result shown to the model before truncation.
    pub context_rows: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            temperature: 0.2,
            context_rows: crate::DEFAULT_CONTEXT_ROWS,
        }
    }
}

/// The question-answering loop.
///
/// Flow: question → model → tool call? → dispatch → result → model → ... → answer
pub struct Agent {
    model: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    settings: AgentSettings,
    catalogue: String,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelClient>, registry: Arc<ToolRegistry>, settings: AgentSettings) -> Self {
        info!(
            model = model.name(),
            tools = ?registry.names(),
            max_iterations = settings.max_iterations,
            "Agent initialized"
        );
        let catalogue = registry.catalogue();
        Self {
            model,
            registry,
            settings,
            catalogue,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.settings.max_iterations = max;
        self
    }

    /// Answer one question.
    ///
    /// Only a model failure is an error. Tool failures are fed back to the
    /// model, and an exhausted budget yields a degraded answer.
    pub async fn run(&self, question: &str, verbose: bool) -> Result<AgentResponse, AgentError> {
        self.run_on(question, verbose, Local::now().date_naive()).await
    }

    /// The system prompt's date context is taken from `today`, once per run,
    /// so a long-lived agent follows the same season rollover as the tools.
    async fn run_on(
        &self,
        question: &str,
        verbose: bool,
        today: NaiveDate,
    ) -> Result<AgentResponse, AgentError> {
        info!(question = %preview(question, 100), "Agent processing question");
        let started = Instant::now();
        let max_iterations = self.settings.max_iterations;

        let system_prompt = build_system_prompt(&self.catalogue, today);
        let mut conversation = Conversation::new(&system_prompt, question);
        let mut trace = RunTrace::default();
        let mut dispatched = 0u32;
        let mut model_calls = 0u32;

        loop {
            model_calls += 1;
            debug!(call = model_calls, dispatched, max_iterations, "Awaiting model");

            let reply = self
                .model
                .chat(conversation.messages(), self.settings.temperature)
                .await?;
            let text = reply.content;
            if verbose {
                info!(call = model_calls, response = %preview(&text, 800), "Model response");
            }

            let Some(call) = parse_tool_call(&text) else {
                trace.note("Generated final answer");
                let response = trace.finish(text, started.elapsed(), model_calls, verbose);
                info!(
                    elapsed_ms = response.total_time_ms as u64,
                    tool_calls = response.tool_calls.len(),
                    "Agent completed"
                );
                return Ok(response);
            };

            if dispatched >= max_iterations {
                warn!(max_iterations, tool = %call.tool, "Agent hit max iterations without final answer");
                let answer = trace.budget_exhausted_answer(max_iterations);
                return Ok(trace.finish(answer, started.elapsed(), model_calls, verbose));
            }

            let result = self
                .registry
                .dispatch(&call.tool, call.arguments.clone())
                .await;
            if verbose {
                info!(tool = %call.tool, result = %preview(&result.to_string(), 500), "Tool result");
            }

            trace.note(format!(
                "Used {}: {}",
                call.tool,
                if result.is_success() { "success" } else { "failed" }
            ));
            conversation.push_assistant(text);
            conversation.push_tool_result(tool_result_message(&result, self.settings.context_rows));
            trace.record_call(call.tool, call.arguments, result);
            dispatched += 1;
        }
    }
}

/// The turn fed back to the model after a dispatch. Useful data gets a
/// push toward answering; anything else asks for a different approach.
fn tool_result_message(result: &ToolResult, max_rows: usize) -> String {
    let formatted = result.to_context_string(max_rows);
    if result.has_useful_data() {
        format!(
            "Tool result:\n{formatted}\n\n\
             You now have data to answer the question. \
             Provide your final answer as a clear sentence using the numbers above. \
             DO NOT call another tool - just answer the question."
        )
    } else {
        format!(
            "Tool result:\n{formatted}\n\n\
             The tool didn't return useful data. Try a different approach or tool."
        )
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}
