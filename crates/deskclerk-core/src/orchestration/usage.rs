//! Per-run tool usage log
//!
//! One entry per tool call, appended in dispatch order. The log backs the
//! "data access info" disclosure in the UI and the continuity note embedded
//! in the stored final answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::FetchedEntity;

/// Outcome of one tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Success,
    Error,
}

/// Record of one executed tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsageEntry {
    pub tool_name: String,
    /// Decoded arguments the tool was invoked with
    pub parameters: Value,
    pub timestamp: DateTime<Utc>,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result_summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fetched_entities: Vec<FetchedEntity>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl ToolUsageEntry {
    /// Record a successful call
    pub fn success(
        tool_name: impl Into<String>,
        parameters: Value,
        result_summary: impl Into<String>,
        fetched_entities: Vec<FetchedEntity>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            timestamp: Utc::now(),
            status: ToolCallStatus::Success,
            result_summary: Some(result_summary.into()),
            fetched_entities,
            error: None,
        }
    }

    /// Record a failed call
    pub fn error(tool_name: impl Into<String>, parameters: Value, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            timestamp: Utc::now(),
            status: ToolCallStatus::Error,
            result_summary: None,
            fetched_entities: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Render the run's tool invocations as a compact `name(param=value, ...)`
/// sequence joined by `" | "`. Null parameters are omitted.
///
/// The note is appended to the stored final answer so later turns can see
/// which queries already ran.
pub fn continuity_note(entries: &[ToolUsageEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let params = entry
                .parameters
                .as_object()
                .map(|obj| {
                    obj.iter()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(k, v)| match v {
                            Value::String(s) => format!("{k}={s}"),
                            other => format!("{k}={other}"),
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("{}({})", entry.tool_name, params)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
