use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{api_messages, http_client, LlmError, LlmProvider, Message};

pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String, timeout_secs: u64) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            url: url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn request_body(&self, messages: &[Message], temperature: f32) -> Value {
        json!({
            "model": self.model,
            "messages": api_messages(messages),
            "stream": false,
            "options": {
                "temperature": temperature,
            },
        })
    }

    async fn installed_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.url);
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }
        let tags: Value = response.json().await?;
        Ok(model_names(&tags))
    }
}

fn parse_content(resp: &Value) -> Result<String, LlmError> {
    resp["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
}

fn model_names(tags: &Value) -> Vec<String> {
    tags["models"]
        .as_array()
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `llama3.1` matches an installed `llama3.1:latest`.
fn model_installed(installed: &[String], model: &str) -> bool {
    installed.iter().any(|name| {
        name == model
            || name
                .strip_prefix(model)
                .is_some_and(|rest| rest.starts_with(':'))
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        let body = self.request_body(&messages, temperature);

        debug!("Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: Value = response.json().await?;
        parse_content(&resp)
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        let available = self.installed_models().await.is_ok();
        debug!(url = %self.url, available, "Ollama availability check");
        available
    }

    async fn model_exists(&self) -> bool {
        match self.installed_models().await {
            Ok(installed) => model_installed(&installed, &self.model),
            Err(_) => false,
        }
    }
}
