//! LLM provider boundary
//!
//! The loop talks to the model through the [`LlmClient`] trait: a synchronous
//! request/response chat call that exposes raw tool-call ids, names, and
//! argument strings. The bundled [`OpenAiClient`] speaks the OpenAI-compatible
//! chat completions wire format.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;

use crate::conversation::{Message, ToolCall};
use crate::error::Result;
use crate::orchestration::ToolDefinition;

/// One chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    /// Force the model to respond with tool calls rather than plain text
    pub require_tool_use: bool,
}

/// The model's reply to one chat completion request
#[derive(Debug, Clone, Default)]
pub struct ModelMessage {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelMessage {
    /// Whether the reply carries any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Chat-completion capable LLM provider
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one chat completion and return the model's message
    async fn chat(&self, request: ChatRequest) -> Result<ModelMessage>;
}
