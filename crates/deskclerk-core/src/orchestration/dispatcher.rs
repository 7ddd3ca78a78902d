//! Sequential tool dispatch
//!
//! Executes the tool calls of one model turn in the order they arrived,
//! appending a usage entry and a tool result message for each. A tool that
//! cannot be resolved or that fails aborts the whole dispatch; summary
//! derivation and entity extraction are best-effort and never do.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::registry::ToolRegistry;
use super::usage::ToolUsageEntry;
use crate::conversation::{Conversation, Message, ToolCall};
use crate::error::{Error, Result};
use crate::extract::extract_entities;
use crate::report::{bound_title, FaultReporter};

/// Object keys recognized as carrying the primary record list
const KNOWN_LIST_KEYS: &[&str] = &["invoices", "results", "records", "items", "entries", "data"];

/// Summary used when a tool result does not decode as JSON
const OPAQUE_RESULT_SUMMARY: &str = "Query executed";

/// Recognized result payload shapes, each with its own summary rule
#[derive(Debug, PartialEq)]
enum ResultShape {
    /// A record list under a well-known key, possibly truncated server-side
    KeyedList {
        count: usize,
        total_count: Option<u64>,
        limit: Option<u64>,
    },
    /// A bare record list at the root
    BareList { count: usize },
    /// No list, but the result reports how many records matched
    Counted { total_count: u64 },
    /// Anything else that parsed as JSON
    Other,
}

fn classify(value: &Value) -> ResultShape {
    if let Value::Array(items) = value {
        return ResultShape::BareList { count: items.len() };
    }
    if let Value::Object(obj) = value {
        for key in KNOWN_LIST_KEYS {
            if let Some(Value::Array(items)) = obj.get(*key) {
                return ResultShape::KeyedList {
                    count: items.len(),
                    total_count: obj.get("total_count").and_then(|v| v.as_u64()),
                    limit: obj.get("limit").and_then(|v| v.as_u64()),
                };
            }
        }
        if let Some(total) = obj.get("total_count").and_then(|v| v.as_u64()) {
            return ResultShape::Counted { total_count: total };
        }
    }
    ResultShape::Other
}

/// One-line human-readable summary of a decoded tool result
fn summarize_result(value: &Value) -> String {
    match classify(value) {
        ResultShape::KeyedList {
            count,
            total_count: Some(total),
            limit: Some(_),
        } if total > count as u64 => {
            format!("Retrieved {count} of {total} records (limited)")
        }
        ResultShape::KeyedList { count, .. } | ResultShape::BareList { count } => {
            format!("Retrieved {count} records")
        }
        ResultShape::Counted { total_count } => format!("Retrieved {total_count} records"),
        ResultShape::Other => "Data retrieved".to_string(),
    }
}

/// Executes tool calls against the registry
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    reporter: Arc<dyn FaultReporter>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, reporter: Arc<dyn FaultReporter>) -> Self {
        Self { registry, reporter }
    }

    /// Dispatch the given tool calls in order.
    ///
    /// For each call: resolve the tool, decode its arguments, execute, append
    /// a usage entry, and append the raw string result to the conversation as
    /// a tool message. The usage entry is appended even when the call fails;
    /// the failure then aborts the remaining dispatch.
    pub async fn dispatch(
        &self,
        tool_calls: &[ToolCall],
        conversation: &mut Conversation,
        usage_log: &mut Vec<ToolUsageEntry>,
    ) -> Result<()> {
        for call in tool_calls {
            let Some(tool) = self.registry.get(&call.function_name) else {
                self.reporter.report(
                    &bound_title(&format!("Unknown tool: {}", call.function_name)),
                    &format!("The model requested tool '{}', which is not registered", call.function_name),
                );
                return Err(Error::ToolNotFound(call.function_name.clone()));
            };

            let params: Value = serde_json::from_str(&call.arguments).map_err(|e| {
                Error::ArgumentDecode(format!("{}: {e}", call.function_name))
            })?;
            if !params.is_object() {
                return Err(Error::ArgumentDecode(format!(
                    "{}: arguments must be a JSON object",
                    call.function_name
                )));
            }

            debug!(tool = %call.function_name, "Dispatching tool call");

            match tool.execute(params.clone()).await {
                Ok(result) => {
                    // Best-effort decode purely for the summary and entity
                    // extraction; the model gets the raw string either way.
                    let (summary, entities) = match serde_json::from_str::<Value>(&result) {
                        Ok(decoded) => (
                            summarize_result(&decoded),
                            extract_entities(&call.function_name, &decoded),
                        ),
                        Err(_) => (OPAQUE_RESULT_SUMMARY.to_string(), Vec::new()),
                    };

                    usage_log.push(ToolUsageEntry::success(
                        &call.function_name,
                        params,
                        summary,
                        entities,
                    ));
                    conversation.push(Message::tool_result(
                        &call.id,
                        &call.function_name,
                        result,
                    ));
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(tool = %call.function_name, error = %message, "Tool execution failed");
                    usage_log.push(ToolUsageEntry::error(&call.function_name, params.clone(), &message));
                    self.reporter.report(
                        &bound_title(&format!("Tool {} failed", call.function_name)),
                        &format!("arguments: {params}, error: {message}"),
                    );
                    return Err(Error::ToolExecution {
                        tool: call.function_name.clone(),
                        message,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::orchestration::registry::{BoxFuture, Tool};
    use crate::orchestration::usage::ToolCallStatus;
    use crate::report::LogFaultReporter;
    use serde_json::json;

    struct StaticTool {
        name: &'static str,
        result: std::result::Result<&'static str, &'static str>,
    }

    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        fn execute(&self, _params: Value) -> BoxFuture<'_, std::result::Result<String, ToolError>> {
            let result = self.result;
            Box::pin(async move {
                result
                    .map(|s| s.to_string())
                    .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
            })
        }
    }

    fn registry_with(tools: Vec<StaticTool>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(Arc::new(tool));
        }
        Arc::new(registry)
    }

    fn dispatcher(registry: Arc<ToolRegistry>) -> ToolDispatcher {
        ToolDispatcher::new(registry, Arc::new(LogFaultReporter))
    }

    #[test]
    fn test_summarize_bare_list() {
        assert_eq!(summarize_result(&json!([1, 2, 3])), "Retrieved 3 records");
    }

    #[test]
    fn test_summarize_keyed_list_limited() {
        let value = json!({"invoices": [{}, {}], "total_count": 40, "limit": 2});
        assert_eq!(summarize_result(&value), "Retrieved 2 of 40 records (limited)");
    }

    #[test]
    fn test_summarize_keyed_list_complete() {
        let value = json!({"results": [{}, {}], "total_count": 2, "limit": 10});
        assert_eq!(summarize_result(&value), "Retrieved 2 records");
    }

    #[test]
    fn test_summarize_counted() {
        assert_eq!(
            summarize_result(&json!({"total_count": 7})),
            "Retrieved 7 records"
        );
    }

    #[test]
    fn test_summarize_unrecognized_object() {
        assert_eq!(summarize_result(&json!({"ok": true})), "Data retrieved");
    }

    #[tokio::test]
    async fn test_dispatch_appends_in_call_order() {
        let registry = registry_with(vec![
            StaticTool { name: "first", result: Ok("[]") },
            StaticTool { name: "second", result: Ok("[]") },
        ]);
        let dispatcher = dispatcher(registry);

        let calls = vec![
            ToolCall::new("c1", "second", "{}"),
            ToolCall::new("c2", "first", "{}"),
        ];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        dispatcher.dispatch(&calls, &mut conversation, &mut usage).await.unwrap();

        let logged: Vec<&str> = usage.iter().map(|e| e.tool_name.as_str()).collect();
        assert_eq!(logged, vec!["second", "first"]);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_is_fatal() {
        let dispatcher = dispatcher(registry_with(vec![]));
        let calls = vec![ToolCall::new("c1", "missing", "{}")];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        let err = dispatcher
            .dispatch(&calls, &mut conversation, &mut usage)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolNotFound(_)));
        assert!(usage.is_empty());
        assert!(conversation.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_malformed_arguments_is_fatal() {
        let registry = registry_with(vec![StaticTool { name: "t", result: Ok("[]") }]);
        let dispatcher = dispatcher(registry);
        let calls = vec![ToolCall::new("c1", "t", "{not json")];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        let err = dispatcher
            .dispatch(&calls, &mut conversation, &mut usage)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ArgumentDecode(_)));
    }

    #[tokio::test]
    async fn test_failing_tool_logs_error_entry_then_aborts() {
        let registry = registry_with(vec![
            StaticTool { name: "ok_tool", result: Ok("[]") },
            StaticTool { name: "bad_tool", result: Err("database offline") },
            StaticTool { name: "never_runs", result: Ok("[]") },
        ]);
        let dispatcher = dispatcher(registry);
        let calls = vec![
            ToolCall::new("c1", "ok_tool", "{}"),
            ToolCall::new("c2", "bad_tool", "{}"),
            ToolCall::new("c3", "never_runs", "{}"),
        ];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        let err = dispatcher
            .dispatch(&calls, &mut conversation, &mut usage)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolExecution { .. }));
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[1].status, ToolCallStatus::Error);
        assert!(usage[1].error.as_deref().unwrap().contains("database offline"));
        // The failed call leaves no tool message; the run is aborting anyway.
        assert_eq!(conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_undecodable_result_uses_generic_summary() {
        let registry = registry_with(vec![StaticTool { name: "t", result: Ok("plain text") }]);
        let dispatcher = dispatcher(registry);
        let calls = vec![ToolCall::new("c1", "t", "{}")];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        dispatcher.dispatch(&calls, &mut conversation, &mut usage).await.unwrap();

        assert_eq!(usage[0].result_summary.as_deref(), Some(OPAQUE_RESULT_SUMMARY));
        assert!(usage[0].fetched_entities.is_empty());
        assert_eq!(conversation.messages()[0].content.as_deref(), Some("plain text"));
    }

    #[tokio::test]
    async fn test_dispatch_extracts_entities() {
        let registry = registry_with(vec![StaticTool {
            name: "get_sales_invoices",
            result: Ok(r#"[{"name": "SI-2024-00001", "customer_name": "Acme"}]"#),
        }]);
        let dispatcher = dispatcher(registry);
        let calls = vec![ToolCall::new("c1", "get_sales_invoices", "{}")];
        let mut conversation = Conversation::new();
        let mut usage = Vec::new();

        dispatcher.dispatch(&calls, &mut conversation, &mut usage).await.unwrap();

        assert_eq!(usage[0].fetched_entities.len(), 1);
        assert_eq!(usage[0].fetched_entities[0].id, "SI-2024-00001");
        assert_eq!(usage[0].result_summary.as_deref(), Some("Retrieved 1 records"));
    }
}
