//! Deskclerk Core - tool-forced conversation orchestration
//!
//! This crate provides the core functionality of the Deskclerk assistant:
//! - A bounded agent loop that forces the model to work through tools
//! - Tool registry and sequential dispatch with a per-run usage log
//! - Token-budget trimming of the conversation
//! - Entity extraction from tool results for UI navigation
//! - Document reference linking in final answers
//! - Session persistence and the settings/provider/store boundaries

pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod linkify;
pub mod orchestration;
pub mod provider;
pub mod report;
pub mod session;
pub mod template;

pub use config::Config;
pub use conversation::{Conversation, Message, Role, ToolCall};
pub use error::{Error, Result, ToolError};
pub use extract::{extract_entities, FetchedEntity, MAX_ENTITIES_PER_CALL};
pub use linkify::linkify;
pub use provider::{ChatRequest, LlmClient, ModelMessage, OpenAiClient};
pub use report::{FaultReporter, LogFaultReporter};
pub use session::{FsSessionStore, Session, SessionStatus, SessionStore};

// Orchestration exports
pub use orchestration::{
    continuity_note, final_answer_definition, AgentLoop, RequestContext, RunOutcome, RunStatus,
    Tool, ToolCallStatus, ToolDefinition, ToolDispatcher, ToolRegistry, ToolUsageEntry,
    FINAL_ANSWER_TOOL_NAME, MAX_ITERATIONS,
};

// Context exports
pub use context::{estimate_tokens, trim_to_budget};
