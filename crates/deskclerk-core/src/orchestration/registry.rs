//! Tool registry
//!
//! Tools are the only actions the model may take. Each tool has a name and
//! description for the model, a JSON schema for parameters, and an execute
//! method returning a string payload (typically JSON-encoded).
//!
//! The `final_answer` tool is reserved: it is always offered to the model but
//! never executes - the agent loop intercepts it as the terminal signal.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ToolError;

/// Name of the reserved terminal tool
pub const FINAL_ANSWER_TOOL_NAME: &str = "final_answer";

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tool definition for LLM consumption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by the model to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the decoded arguments object
    fn execute(&self, params: Value) -> BoxFuture<'_, Result<String, ToolError>>;

    /// Convert to tool definition for the model
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Arguments of the reserved `final_answer` tool
#[derive(Debug, Clone, Deserialize)]
pub struct FinalAnswerArgs {
    pub message: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Definition of the reserved `final_answer` tool
pub fn final_answer_definition() -> ToolDefinition {
    ToolDefinition {
        name: FINAL_ANSWER_TOOL_NAME.to_string(),
        description: "Deliver the final answer to the user and end the conversation turn. \
                      Call this exactly once, when no more data is needed."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The complete answer to show the user",
                },
                "summary": {
                    "type": "string",
                    "description": "Optional one-line summary of the answer",
                },
            },
            "required": ["message"],
        }),
    }
}

/// Registry of available tools, preserving registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool re-registered under the same name replaces the
    /// earlier one in place; the reserved terminal name is rejected.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if name == FINAL_ANSWER_TOOL_NAME {
            warn!("Ignoring attempt to register reserved tool name {FINAL_ANSWER_TOOL_NAME}");
            return;
        }
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name. Absent means the caller must treat the call as a
    /// tool-not-found error, never ignore it.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&pos| self.tools[pos].clone())
    }

    /// Tool definitions in registration order, with the reserved
    /// `final_answer` definition appended last
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.iter().map(|t| t.to_definition()).collect();
        defs.push(final_answer_definition());
        defs
    }

    /// Number of registered tools (excluding the reserved terminal tool)
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool {
        name: &'static str,
    }

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "Echo the arguments back"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        fn execute(&self, params: Value) -> BoxFuture<'_, Result<String, ToolError>> {
            Box::pin(async move { Ok(params.to_string()) })
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "echo" }));

        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_preserves_order_and_appends_final_answer() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "bravo" }));
        registry.register(Arc::new(EchoTool { name: "alpha" }));

        let names: Vec<String> = registry.list().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["bravo", "alpha", FINAL_ANSWER_TOOL_NAME]);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool {
            name: FINAL_ANSWER_TOOL_NAME,
        }));

        assert!(registry.get(FINAL_ANSWER_TOOL_NAME).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_final_answer_schema_requires_message() {
        let def = final_answer_definition();
        assert_eq!(def.parameters["required"], json!(["message"]));
        assert!(def.parameters["properties"]["summary"].is_object());
    }

    #[test]
    fn test_final_answer_args_decode() {
        let args: FinalAnswerArgs =
            serde_json::from_str(r#"{"message": "done", "summary": "one line"}"#).unwrap();
        assert_eq!(args.message, "done");
        assert_eq!(args.summary.as_deref(), Some("one line"));

        let bare: FinalAnswerArgs = serde_json::from_str(r#"{"message": "done"}"#).unwrap();
        assert!(bare.summary.is_none());
    }
}
