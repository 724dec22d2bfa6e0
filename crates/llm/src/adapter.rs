//! Bridges an [`LlmProvider`] to the agent loop's [`ModelClient`].

use async_trait::async_trait;
use statline_tool_runtime::conversation::{Message as AgentMessage, Role as AgentRole};
use statline_tool_runtime::model::{ModelClient, ModelError, ModelReply};

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// Wraps any boxed provider so the agent can drive it.
///
/// Chat APIs have no tool-result role for prompt-driven tool use, so
/// tool results are sent as user turns.
pub struct LlmProviderAdapter {
    provider: Box<dyn LlmProvider>,
    max_tokens: u32,
}

impl LlmProviderAdapter {
    pub fn new(provider: Box<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }
}

fn to_provider_message(message: &AgentMessage) -> Message {
    let role = match message.role {
        AgentRole::System => Role::System,
        AgentRole::User | AgentRole::ToolResult => Role::User,
        AgentRole::Assistant => Role::Assistant,
    };
    Message {
        role,
        content: message.content.clone(),
    }
}

impl From<LlmError> for ModelError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::HttpError(e) => ModelError::Unavailable(e.to_string()),
            LlmError::NotConfigured(msg) => ModelError::Unavailable(msg),
            e @ LlmError::ApiError { .. } => ModelError::Unavailable(e.to_string()),
            LlmError::ParseError(msg) => ModelError::InvalidResponse(msg),
        }
    }
}

#[async_trait]
impl ModelClient for LlmProviderAdapter {
    async fn chat(&self, messages: &[AgentMessage], temperature: f32) -> Result<ModelReply, ModelError> {
        let messages = messages.iter().map(to_provider_message).collect();
        let content = self
            .provider
            .complete(messages, temperature, self.max_tokens)
            .await?;
        Ok(ModelReply { content })
    }

    fn name(&self) -> &str {
        self.provider.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records what it was sent and replies with a canned string.
    struct RecordingProvider {
        seen: Arc<Mutex<Vec<Message>>>,
        reply: Result<String, String>,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            max_tokens: u32,
        ) -> Result<String, LlmError> {
            assert_eq!(max_tokens, 256);
            *self.seen.lock().unwrap() = messages;
            self.reply.clone().map_err(LlmError::ParseError)
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    fn adapter(reply: Result<String, String>) -> (Arc<Mutex<Vec<Message>>>, LlmProviderAdapter) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            seen: Arc::clone(&seen),
            reply,
        };
        (seen, LlmProviderAdapter::new(Box::new(provider), 256))
    }

    #[tokio::test]
    async fn test_tool_result_sent_as_user() {
        let (seen, adapter) = adapter(Ok("answer".into()));
        let conversation = vec![
            AgentMessage::new(AgentRole::System, "sys"),
            AgentMessage::new(AgentRole::User, "q"),
            AgentMessage::new(AgentRole::Assistant, "{\"tool\": \"rankings\"}"),
            AgentMessage::new(AgentRole::ToolResult, "Tool result:\n[]"),
        ];

        let reply = adapter.chat(&conversation, 0.2).await.unwrap();
        assert_eq!(reply.content, "answer");
        assert_eq!(adapter.name(), "recording");

        let sent = seen.lock().unwrap().clone();
        let roles: Vec<Role> = sent.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(sent[3].content, "Tool result:\n[]");
    }

    #[tokio::test]
    async fn test_errors_map_to_model_errors() {
        let (_seen, adapter) = adapter(Err("missing message.content".into()));
        let err = adapter.chat(&[], 0.2).await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse(_)));

        let err: ModelError = LlmError::ApiError {
            status: 503,
            body: "loading".into(),
        }
        .into();
        assert!(matches!(err, ModelError::Unavailable(m) if m.contains("503")));
    }
}
