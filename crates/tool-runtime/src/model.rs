use crate::conversation::Message;
use async_trait::async_trait;

/// Raw text produced by one model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
}

/// The language-model collaborator driven by the agent loop.
///
/// This trait lives in tool-runtime (not in crates/llm) because it's
/// defined by the consumer. `statline-llm` adapts its providers to it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send the full conversation and return the assistant's reply.
    async fn chat(&self, messages: &[Message], temperature: f32) -> Result<ModelReply, ModelError>;

    /// Provider/model name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Mock model for exercising the agent loop without a real backend.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Scripted {
        Text(String),
        Fail(String),
    }

    /// Returns scripted replies in FIFO order. Once the script runs out it
    /// repeats the `fallback` reply, or fails if none was set.
    pub struct MockModelClient {
        script: Mutex<VecDeque<Scripted>>,
        fallback: Option<String>,
        calls: AtomicUsize,
        transcripts: Mutex<Vec<Vec<Message>>>,
    }

    impl MockModelClient {
        pub fn new() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: None,
                calls: AtomicUsize::new(0),
                transcripts: Mutex::new(Vec::new()),
            }
        }

        /// A model that answers `text` forever.
        pub fn always(text: &str) -> Self {
            Self {
                fallback: Some(text.to_string()),
                ..Self::new()
            }
        }

        pub fn queue_text(&self, text: &str) -> &Self {
            self.script
                .lock()
                .unwrap()
                .push_back(Scripted::Text(text.to_string()));
            self
        }

        pub fn queue_error(&self, message: &str) -> &Self {
            self.script
                .lock()
                .unwrap()
                .push_back(Scripted::Fail(message.to_string()));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Conversation as it was sent on each call.
        pub fn transcripts(&self) -> Vec<Vec<Message>> {
            self.transcripts.lock().unwrap().clone()
        }
    }

    impl Default for MockModelClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ModelClient for MockModelClient {
        async fn chat(&self, messages: &[Message], _temperature: f32) -> Result<ModelReply, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.transcripts.lock().unwrap().push(messages.to_vec());

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Text(content)) => Ok(ModelReply { content }),
                Some(Scripted::Fail(message)) => Err(ModelError::Unavailable(message)),
                None => match &self.fallback {
                    Some(content) => Ok(ModelReply {
                        content: content.clone(),
                    }),
                    None => Err(ModelError::Unavailable("mock script exhausted".to_string())),
                },
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
