//! Conversation state shared between the agent loop and the session store
//!
//! A conversation is an ordered message sequence. It is only ever appended to,
//! or pruned from the front by the token budget trimmer; the system message,
//! when present, stays at index zero.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
///
/// `arguments` is kept as the raw JSON-encoded string exactly as the model
/// produced it; decoding happens at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function_name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            function_name: function_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A message in a conversation
///
/// Final answers carry two texts: `content` is what gets persisted (including
/// the trailing tool-context annotation that later turns rely on) and
/// `content_display` is the clean, linkified text shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_display: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tool_calls: Vec<ToolCall>,
    /// Correlates a tool result back to the call that produced it
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
    /// Tool name, set on tool result messages
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            content_display: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            content_display: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            content_display: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            content_display: None,
            tool_calls,
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a final assistant message with separate stored and display texts
    pub fn assistant_final(content: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            content_display: Some(display.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a tool result message correlated to a tool call
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            content_display: None,
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }

    /// Number of whitespace-delimited words in the content
    pub fn word_count(&self) -> usize {
        self.content
            .as_deref()
            .map(|c| c.split_whitespace().count())
            .unwrap_or(0)
    }
}

/// An ordered message sequence owned by one request execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a conversation from the session store's serialized form.
    ///
    /// An empty or whitespace-only string is an empty conversation, not an
    /// error; a session that has never been written stores no messages.
    pub fn from_stored(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let messages: Vec<Message> = serde_json::from_str(json)?;
        Ok(Self { messages })
    }

    /// Serialize for the session store, stripping the system message
    pub fn to_stored(&self) -> Result<String> {
        let stored: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();
        Ok(serde_json::to_string(&stored)?)
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Insert a system message at the front unless one is already there
    pub fn ensure_system_message(&mut self, content: impl Into<String>) {
        if self.messages.first().map(|m| m.role) != Some(Role::System) {
            self.messages.insert(0, Message::system(content));
        }
    }

    /// Remove the oldest message whose role is not `system`.
    ///
    /// Returns false when nothing removable remains.
    pub fn remove_oldest_non_system(&mut self) -> bool {
        if let Some(pos) = self.messages.iter().position(|m| m.role != Role::System) {
            self.messages.remove(pos);
            true
        } else {
            false
        }
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

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Number of user and assistant messages (system and tool excluded)
    pub fn dialogue_len(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .count()
    }

    /// Content of the first user message, if any
    pub fn first_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .and_then(|m| m.content.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_system_message_inserts_once() {
        let mut conv = Conversation::new();
        conv.push(Message::user("hi"));
        conv.ensure_system_message("be helpful");
        conv.ensure_system_message("be helpful again");

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.messages()[0].content.as_deref(), Some("be helpful"));
    }

    #[test]
    fn test_remove_oldest_non_system_skips_system() {
        let mut conv = Conversation::new();
        conv.push(Message::system("sys"));
        conv.push(Message::user("first"));
        conv.push(Message::user("second"));

        assert!(conv.remove_oldest_non_system());
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[1].content.as_deref(), Some("second"));

        assert!(conv.remove_oldest_non_system());
        assert!(!conv.remove_oldest_non_system());
        assert_eq!(conv.messages()[0].role, Role::System);
    }

    #[test]
    fn test_stored_round_trip_strips_system() {
        let mut conv = Conversation::new();
        conv.push(Message::system("sys"));
        conv.push(Message::user("hello"));
        conv.push(Message::assistant("hi there"));

        let stored = conv.to_stored().unwrap();
        assert!(!stored.contains("\"system\""));

        let restored = Conversation::from_stored(&stored).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.messages()[0].role, Role::User);
    }

    #[test]
    fn test_from_stored_empty_string() {
        let conv = Conversation::from_stored("").unwrap();
        assert!(conv.is_empty());
    }

    #[test]
    fn test_dialogue_len_ignores_tool_messages() {
        let mut conv = Conversation::new();
        conv.push(Message::system("sys"));
        conv.push(Message::user("q"));
        conv.push(Message::tool_result("call-1", "get_customers", "[]"));
        conv.push(Message::assistant("a"));

        assert_eq!(conv.dialogue_len(), 2);
    }

    #[test]
    fn test_tool_call_serialization_shape() {
        let msg = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new("call-1", "get_customers", "{}")],
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("function_name"));
        assert!(!json.contains("content_display"));
    }
}
