//! OpenAI-compatible chat completions client
//!
//! Works against api.openai.com or any gateway exposing the same
//! `/chat/completions` contract. Forced tool use maps to
//! `tool_choice: "required"`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatRequest, LlmClient, ModelMessage};
use crate::conversation::{Message, Role, ToolCall};
use crate::error::{Error, Result};
use crate::orchestration::ToolDefinition;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (self-hosted gateways, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ModelMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest::from_request(&request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "chat completion returned {status}: {detail}"
            )));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("response carried no choices".to_string()))?;

        Ok(choice.message.into_model_message())
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a ChatRequest) -> Self {
        Self {
            model: &request.model,
            messages: request.messages.iter().map(WireMessage::from_message).collect(),
            tools: request.tools.iter().map(WireTool::from_definition).collect(),
            tool_choice: if request.tools.is_empty() {
                None
            } else if request.require_tool_use {
                Some("required")
            } else {
                Some("auto")
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    name: Option<String>,
}

impl WireMessage {
    fn from_message(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|tc| WireToolCall {
                        id: tc.id.clone(),
                        kind: "function".to_string(),
                        function: WireFunctionCall {
                            name: tc.function_name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            )
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        }
    }

    fn into_model_message(self) -> ModelMessage {
        ModelMessage {
            content: self.content,
            tool_calls: self
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

impl<'a> WireTool<'a> {
    fn from_definition(def: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &def.name,
                description: &def.description,
                parameters: &def.parameters,
            },
        }
    }
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_forces_tools() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::user("hello")],
            tools: vec![ToolDefinition {
                name: "get_customers".to_string(),
                description: "List customers".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }],
            require_tool_use: true,
        };

        let wire = WireRequest::from_request(&request);
        let value = serde_json::to_value(&wire).unwrap();

        assert_eq!(value["tool_choice"], "required");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "get_customers");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_without_tools_omits_tool_choice() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::user("hello")],
            tools: Vec::new(),
            require_tool_use: true,
        };

        let value = serde_json::to_value(WireRequest::from_request(&request)).unwrap();
        assert!(value.get("tool_choice").is_none());
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_response_parsing_with_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "get_sales_invoices",
                            "arguments": "{\"start_date\":\"2024-01-01\"}"
                        }
                    }]
                }
            }]
        });

        let parsed: WireResponse = serde_json::from_value(raw).unwrap();
        let message = parsed.choices.into_iter().next().unwrap().message.into_model_message();

        assert!(message.content.is_none());
        assert_eq!(message.tool_calls.len(), 1);
        assert_eq!(message.tool_calls[0].function_name, "get_sales_invoices");
        assert_eq!(message.tool_calls[0].id, "call_abc");
    }

    #[test]
    fn test_assistant_tool_call_round_trip() {
        let message = Message::assistant_with_tool_calls(
            None,
            vec![ToolCall::new("call_1", "get_customers", "{}")],
        );
        let wire = WireMessage::from_message(&message);
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_customers");
    }
}
