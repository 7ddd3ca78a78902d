//! The agent loop - bounded, tool-forced orchestration of one request
//!
//! Drives repeated model calls with forced tool use, dispatches the requested
//! tools, and terminates when the model delivers its `final_answer`. Every
//! terminal path - success, iteration exhaustion, model fallback, malformed
//! answer, failure - returns the same outcome shape; this entry point never
//! returns an error to its caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::dispatcher::ToolDispatcher;
use super::registry::{FinalAnswerArgs, ToolRegistry, FINAL_ANSWER_TOOL_NAME};
use super::usage::{continuity_note, ToolUsageEntry};
use crate::config::Config;
use crate::context::trim_to_budget;
use crate::conversation::{Conversation, Message, ToolCall};
use crate::error::{Error, Result};
use crate::linkify::linkify;
use crate::provider::{ChatRequest, LlmClient};
use crate::report::{FaultReporter, LogFaultReporter};
use crate::session::{Session, SessionStore};
use crate::template::render_template;

/// Maximum number of model turns per request
pub const MAX_ITERATIONS: usize = 15;

/// Fixed reply when the iteration bound is exhausted without a final answer
const APOLOGY_MESSAGE: &str = "I'm sorry, I wasn't able to finish answering within the \
allowed number of steps. Please try a narrower question.";

/// Fixed reply when the final answer arguments don't decode
const MALFORMED_ANSWER_MESSAGE: &str = "I produced a final answer with invalid formatting \
and couldn't deliver it. Please ask again.";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model delivered a final answer
    Completed,
    /// The iteration bound was exhausted; a fixed apology was stored
    MaxIterations,
    /// The model returned plain text despite forced tool use
    ModelFallback,
    /// The final answer arguments did not decode
    MalformedAnswer,
    /// The run aborted (tool failure, model error, storage error)
    Failed,
}

/// Uniform result of one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Stored text (final answers carry the trailing tool-context annotation)
    pub content: String,
    /// Clean linkified text for display, when it differs from `content`
    pub content_display: Option<String>,
    pub summary: Option<String>,
    pub tool_usage: Vec<ToolUsageEntry>,
    pub iterations: usize,
}

impl RunOutcome {
    fn failed(message: String, tool_usage: Vec<ToolUsageEntry>, iterations: usize) -> Self {
        Self {
            status: RunStatus::Failed,
            content: message,
            content_display: None,
            summary: None,
            tool_usage,
            iterations,
        }
    }
}

/// Per-request user context used to render the system instructions
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_name: String,
    pub user_email: String,
    pub roles: Vec<String>,
    pub company: String,
}

impl RequestContext {
    fn template_vars(&self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("user_name", self.user_name.clone());
        vars.insert("user_email", self.user_email.clone());
        vars.insert("roles", self.roles.join(", "));
        vars.insert("company", self.company.clone());
        vars.insert("now", Utc::now().format("%Y-%m-%d %H:%M:%S").to_string());
        vars
    }
}

/// The orchestration controller for one assistant
pub struct AgentLoop {
    provider: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    reporter: Arc<dyn FaultReporter>,
    config: Config,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            provider,
            registry,
            store,
            reporter: Arc::new(LogFaultReporter),
            config,
        }
    }

    /// Replace the default fault reporter
    pub fn with_fault_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run one user message through the loop until a terminal state.
    ///
    /// Never returns an error: anything that escapes the loop body is
    /// converted into a `Failed` outcome here.
    pub async fn run(
        &self,
        session: &mut Session,
        ctx: &RequestContext,
        user_message: &str,
    ) -> RunOutcome {
        match self.run_inner(session, ctx, user_message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(session = %session.session_id, error = %e, "Run aborted");
                self.reporter
                    .report("Assistant run failed", &e.to_string());
                RunOutcome::failed(
                    format!("The assistant could not complete this request: {e}"),
                    Vec::new(),
                    0,
                )
            }
        }
    }

    async fn run_inner(
        &self,
        session: &mut Session,
        ctx: &RequestContext,
        user_message: &str,
    ) -> Result<RunOutcome> {
        let mut conversation = Conversation::from_stored(&session.messages)?;
        conversation.push(Message::user(user_message));
        conversation.ensure_system_message(render_template(
            &self.config.system_instructions,
            &ctx.template_vars(),
        ));
        conversation = trim_to_budget(conversation, self.config.max_tokens);

        let dispatcher = ToolDispatcher::new(self.registry.clone(), self.reporter.clone());
        let tools = self.registry.list();
        let mut usage_log: Vec<ToolUsageEntry> = Vec::new();

        for iteration in 1..=MAX_ITERATIONS {
            debug!(session = %session.session_id, iteration, "Requesting model turn");

            let response = self
                .provider
                .chat(ChatRequest {
                    model: self.config.model.clone(),
                    messages: conversation.messages().to_vec(),
                    tools: tools.clone(),
                    require_tool_use: true,
                })
                .await?;

            if !response.has_tool_calls() {
                // The API contract forbids this under forced tool use; hand
                // back whatever text arrived instead of failing the request.
                warn!(session = %session.session_id, "Model returned no tool calls under forced tool use");
                return Ok(RunOutcome {
                    status: RunStatus::ModelFallback,
                    content: response.content.unwrap_or_default(),
                    content_display: None,
                    summary: None,
                    tool_usage: usage_log,
                    iterations: iteration,
                });
            }

            let final_call = response
                .tool_calls
                .iter()
                .find(|c| c.function_name == FINAL_ANSWER_TOOL_NAME)
                .cloned();

            if let Some(final_call) = final_call {
                // Any data calls sharing the turn still run, in order; extra
                // final_answer calls beyond the first are dropped.
                let data_calls: Vec<ToolCall> = response
                    .tool_calls
                    .iter()
                    .filter(|c| c.function_name != FINAL_ANSWER_TOOL_NAME)
                    .cloned()
                    .collect();
                if !data_calls.is_empty()
                    && let Err(e) = dispatcher
                        .dispatch(&data_calls, &mut conversation, &mut usage_log)
                        .await
                {
                    return Ok(RunOutcome::failed(
                        format!("The assistant could not complete this request: {e}"),
                        usage_log,
                        iteration,
                    ));
                }

                return self
                    .finish_with_answer(session, &final_call, conversation, usage_log, iteration)
                    .await;
            }

            conversation.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            if let Err(e) = dispatcher
                .dispatch(&response.tool_calls, &mut conversation, &mut usage_log)
                .await
            {
                return Ok(RunOutcome::failed(
                    format!("The assistant could not complete this request: {e}"),
                    usage_log,
                    iteration,
                ));
            }

            conversation = trim_to_budget(conversation, self.config.max_tokens);
        }

        // Designed degraded outcome, not an error: the apology is stored
        // exactly like a real answer.
        info!(session = %session.session_id, "Iteration bound exhausted without a final answer");
        conversation.push(Message::assistant(APOLOGY_MESSAGE));
        self.persist(session, &conversation).await?;

        Ok(RunOutcome {
            status: RunStatus::MaxIterations,
            content: APOLOGY_MESSAGE.to_string(),
            content_display: None,
            summary: None,
            tool_usage: usage_log,
            iterations: MAX_ITERATIONS,
        })
    }

    /// Terminal path for a `final_answer` call
    async fn finish_with_answer(
        &self,
        session: &mut Session,
        call: &ToolCall,
        mut conversation: Conversation,
        mut usage_log: Vec<ToolUsageEntry>,
        iteration: usize,
    ) -> Result<RunOutcome> {
        let args: FinalAnswerArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(session = %session.session_id, error = %e, "Final answer arguments did not decode");
                usage_log.push(ToolUsageEntry::error(
                    FINAL_ANSWER_TOOL_NAME,
                    serde_json::Value::Null,
                    format!("malformed arguments: {e}"),
                ));
                return Ok(RunOutcome {
                    status: RunStatus::MalformedAnswer,
                    content: MALFORMED_ANSWER_MESSAGE.to_string(),
                    content_display: None,
                    summary: None,
                    tool_usage: usage_log,
                    iterations: iteration,
                });
            }
        };

        // Context note over every data call of the run; the clean linkified
        // text is what the user sees.
        let note = continuity_note(&usage_log);
        let params = serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);
        usage_log.push(ToolUsageEntry::success(
            FINAL_ANSWER_TOOL_NAME,
            params,
            "Final answer delivered",
            Vec::new(),
        ));

        let display = linkify(&args.message);
        let stored = if note.is_empty() {
            display.clone()
        } else {
            format!("{display}\n\n<!-- tool context: {note} -->")
        };

        conversation.push(Message::assistant_final(stored.clone(), display.clone()));
        self.persist(session, &conversation).await?;

        info!(
            session = %session.session_id,
            iterations = iteration,
            tool_calls = usage_log.len(),
            "Run completed with final answer"
        );

        Ok(RunOutcome {
            status: RunStatus::Completed,
            content: stored,
            content_display: Some(display),
            summary: args.summary,
            tool_usage: usage_log,
            iterations: iteration,
        })
    }

    /// Write the conversation back to the session store
    async fn persist(&self, session: &mut Session, conversation: &Conversation) -> Result<()> {
        session.messages = conversation.to_stored()?;
        session.model_used = Some(self.config.model.clone());
        session.refresh_before_save();
        self.store
            .save(session)
            .await
            .map_err(|e| Error::Session(format!("failed to save session: {e}")))
    }
}
