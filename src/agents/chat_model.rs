//! The tool-calling chat agent every other pattern is built from.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::context::RunContext;
use crate::prompt::render_lenient;
use crate::tools::ExitTool;
use crate::traits::{
    Agent, AgentAction, AgentInput, ChatModel, MessageOutput, ResumeInfo, Tool, ToolContext,
    ToolError, ToolInfo,
};
use crate::{Error, Message, Result, Role, ToolCall, concat_messages};

pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Fallback for tool names the agent does not know: `(name, arguments) -> result`.
pub type UnknownToolHandler = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

pub struct ChatModelAgent {
    name: String,
    description: String,
    instruction: String,
    model: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    return_directly: HashSet<String>,
    unknown_tool_handler: Option<UnknownToolHandler>,
    output_key: Option<String>,
    max_iterations: usize,
}

/// Conversation plus the tool calls still owed a result.
#[derive(Serialize, Deserialize)]
struct AgentState {
    messages: Vec<Message>,
    pending: Vec<ToolCall>,
}

enum ToolStep {
    Done {
        result: String,
        action: Option<AgentAction>,
    },
    Interrupted(String),
}

impl ChatModelAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        ChatModelAgent {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            model,
            tools: Vec::new(),
            return_directly: HashSet::new(),
            unknown_tool_handler: None,
            output_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System instruction; `{key}` is filled from session values when present.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn append_instruction(mut self, extra: &str) -> Self {
        if !self.instruction.is_empty() {
            self.instruction.push_str("\n\n");
        }
        self.instruction.push_str(extra);
        self
    }

    pub fn tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// End the run with this tool's result instead of calling the model again.
    pub fn return_directly(mut self, tool_name: impl Into<String>) -> Self {
        self.return_directly.insert(tool_name.into());
        self
    }

    pub fn unknown_tool_handler(
        mut self,
        handler: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.unknown_tool_handler = Some(Arc::new(handler));
        self
    }

    /// Store the final answer in the session under `key`.
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Give the agent the `exit` tool, which ends the whole run.
    pub fn with_exit(self) -> Self {
        self.tool(ExitTool).return_directly(crate::tools::EXIT_TOOL_NAME)
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    fn tool_infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| t.info()).collect()
    }

    fn initial_messages(&self, ctx: &RunContext, input: &AgentInput) -> Vec<Message> {
        let mut messages = Vec::new();
        let instruction = render_lenient(&self.instruction, &ctx.session_values());
        if !instruction.trim().is_empty() {
            messages.push(Message::system(instruction));
        }
        messages.extend(input.messages.iter().cloned());
        messages.extend(ctx.history_for(&self.name));
        messages
    }

    async fn call_model(&self, ctx: &RunContext, messages: &[Message], tools: &[ToolInfo]) -> Result<Message> {
        if !ctx.is_streaming() {
            let message = self.model.generate(messages, tools).await?;
            ctx.emit_output(MessageOutput::Message(message.clone()));
            return Ok(message);
        }

        let mut stream = self.model.stream(messages, tools).await?;
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            ctx.emit_output(MessageOutput::Chunk(chunk.clone()));
            chunks.push(chunk);
        }
        let mut message = concat_messages(&chunks)?;
        message.role = Role::Assistant;
        ctx.emit_output(MessageOutput::Done(message.clone()));
        Ok(message)
    }

    async fn invoke_tool(&self, ctx: &RunContext, call: &ToolCall) -> Result<ToolStep> {
        let name = call.function.name.as_str();
        let Some(tool) = self.tools.iter().find(|t| t.info().name == name) else {
            return match &self.unknown_tool_handler {
                Some(handler) => Ok(ToolStep::Done {
                    result: handler(name, &call.function.arguments),
                    action: None,
                }),
                None => Err(Error::ToolNotFound(name.to_string())),
            };
        };

        tracing::debug!(agent = %self.name, tool = name, "invoking tool");
        let tool_ctx = ToolContext::new(ctx.tool_options());
        match tool.invoke(&tool_ctx, &call.function.arguments).await {
            Ok(result) => Ok(ToolStep::Done {
                result,
                action: tool_ctx.take_action(),
            }),
            Err(ToolError::Interrupt { info }) => Ok(ToolStep::Interrupted(info)),
            Err(source) => Err(Error::Tool {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Record `message` as this agent's answer for later agents and `output_key`.
    fn finish(&self, ctx: &RunContext, message: Message) {
        if let Some(key) = &self.output_key {
            ctx.set_session_value(key.clone(), message.content.clone());
        }
        ctx.push_history(&self.name, message);
    }

    async fn drive(
        &self,
        ctx: &RunContext,
        mut messages: Vec<Message>,
        mut pending: Vec<ToolCall>,
    ) -> Result<Option<AgentAction>> {
        let tools = self.tool_infos();

        for _ in 0..self.max_iterations {
            if pending.is_empty() {
                let reply = self.call_model(ctx, &messages, &tools).await?;
                messages.push(reply.clone());
                if !reply.has_tool_calls() {
                    self.finish(ctx, reply);
                    return Ok(None);
                }
                pending = reply.tool_calls;
            }

            let calls = std::mem::take(&mut pending);
            for (i, call) in calls.iter().enumerate() {
                match self.invoke_tool(ctx, call).await? {
                    ToolStep::Interrupted(info) => {
                        let state = AgentState {
                            messages,
                            pending: calls[i..].to_vec(),
                        };
                        ctx.set_interrupt(info.clone(), serde_json::to_value(state)?);
                        let action = AgentAction::Interrupted(info);
                        ctx.emit_action(action.clone());
                        return Ok(Some(action));
                    }
                    ToolStep::Done { result, action } => {
                        let message = Message::tool(result.clone(), call.id.clone(), call.function.name.clone());
                        ctx.emit_output(MessageOutput::Message(message.clone()));
                        messages.push(message);

                        let direct = self.return_directly.contains(&call.function.name);
                        match action {
                            Some(AgentAction::TransferToAgent(target)) => {
                                let action = AgentAction::TransferToAgent(target);
                                ctx.emit_action(action.clone());
                                return Ok(Some(action));
                            }
                            Some(action) => {
                                self.finish(ctx, Message::assistant(result, vec![]));
                                ctx.emit_action(action.clone());
                                return Ok(Some(action));
                            }
                            None if direct => {
                                self.finish(ctx, Message::assistant(result, vec![]));
                                return Ok(None);
                            }
                            None => {}
                        }
                    }
                }
            }
        }

        Err(Error::MaxIterations {
            agent: self.name.clone(),
            max: self.max_iterations,
        })
    }

    /// Run under `ctx` as given, without adding this agent's name to the path.
    pub(crate) async fn run_at(&self, ctx: &RunContext, input: &AgentInput) -> Result<Option<AgentAction>> {
        let messages = self.initial_messages(ctx, input);
        self.drive(ctx, messages, Vec::new())
            .instrument(tracing::info_span!("chat_model_agent", agent = %self.name))
            .await
    }

    /// Resume an interrupt recorded at `ctx`'s path; `info` must already be fully entered.
    pub(crate) async fn resume_at(&self, ctx: &RunContext, info: ResumeInfo) -> Result<Option<AgentAction>> {
        if let Some(next) = info.next() {
            return Err(Error::checkpoint(format!(
                "`{}` has no sub-agent `{next}`",
                self.name
            )));
        }
        let state: AgentState = serde_json::from_value(info.state)?;
        tracing::info!(agent = %self.name, pending = state.pending.len(), "resuming");
        self.drive(ctx, state.messages, state.pending)
            .instrument(tracing::info_span!("chat_model_agent", agent = %self.name))
            .await
    }
}

#[async_trait]
impl Agent for ChatModelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        self.run_at(&ctx.enter(&self.name), &input).await
    }

    async fn resume(&self, ctx: RunContext, _input: AgentInput, mut info: ResumeInfo) -> Result<Option<AgentAction>> {
        info.enter(&self.name)?;
        self.resume_at(&ctx.enter(&self.name), info).await
    }
}
