use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{api_messages, http_client, LlmError, LlmProvider, Message};

/// OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        json!({
            "model": self.model,
            "messages": api_messages(messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
        })
    }
}

fn parse_content(resp: &Value) -> Result<String, LlmError> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.request_body(&messages, temperature, max_tokens);

        debug!("OpenAI request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
        let url = format!("{}/v1/models", self.base_url);
        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "OpenAI availability check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    #[test]
    fn test_request_body() {
        let provider =
            OpenAiProvider::new("sk-test".into(), "gpt-4o-mini".into(), "https://api.openai.com/".into(), 60)
                .unwrap();
        let body = provider.request_body(
            &[Message {
                role: Role::User,
                content: "hi".into(),
            }],
            0.0,
            512,
        );
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(provider.base_url, "https://api.openai.com");
    }

    #[test]
    fn test_parse_content() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "4,918 yards"}}]});
        assert_eq!(parse_content(&resp).unwrap(), "4,918 yards");
        assert!(parse_content(&json!({"choices": []})).is_err());
    }
}
