use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Output of a tool call, fed back to the model as the next turn.
    ToolResult,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only conversation for a single agent run.
///
/// Seeded with the system prompt and the question; afterwards messages can
/// only be pushed, never edited or removed.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: &str, question: &str) -> Self {
        Self {
            messages: vec![
                Message::new(Role::System, system_prompt),
                Message::new(Role::User, question),
            ],
        }
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(Role::Assistant, text));
    }

    pub fn push_tool_result(&mut self, text: impl Into<String>) {
        self.messages.push(Message::new(Role::ToolResult, text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Approximate token count using character count / 4 heuristic.
    pub fn approximate_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len()).sum::<usize>() / 4
    }
}
