use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::traits::AgentAction;

/// Name, description and JSON schema the model sees for a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// OpenAI-style wire shape of a tool definition.
#[derive(Serialize, Clone, Debug)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: ToolFunction,
}

#[derive(Serialize, Clone, Debug)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<&ToolInfo> for ToolDefinition {
    fn from(info: &ToolInfo) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: info.name.clone(),
                description: info.description.clone(),
                parameters: info.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Pause the run and surface `info` to the caller.
    #[error("interrupted: {info}")]
    Interrupt { info: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("tool execution failed: {0}")]
    Failed(String),
}

impl ToolError {
    pub fn failed<S: Into<String>>(msg: S) -> Self {
        Self::Failed(msg.into())
    }

    pub fn interrupt<S: Into<String>>(info: S) -> Self {
        Self::Interrupt { info: info.into() }
    }
}

/// Per-run options handed to tools (e.g. the answer to an interrupt).
pub type ToolOptions = HashMap<String, Value>;

/// Everything a tool can see or influence during one invocation.
///
/// Clones share the same action slot.
#[derive(Debug, Default, Clone)]
pub struct ToolContext {
    options: Arc<ToolOptions>,
    action: Arc<Mutex<Option<AgentAction>>>,
}

impl ToolContext {
    pub fn new(options: ToolOptions) -> Self {
        ToolContext {
            options: Arc::new(options),
            action: Arc::new(Mutex::new(None)),
        }
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.option(key).and_then(Value::as_str)
    }

    /// Ask the owning agent to stop and hand `action` to its parent.
    pub fn send_action(&self, action: AgentAction) {
        *self.action.lock() = Some(action);
    }

    pub fn take_action(&self) -> Option<AgentAction> {
        self.action.lock().take()
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn info(&self) -> ToolInfo;

    /// Run the tool with JSON-encoded `arguments` and return its textual result.
    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError>;
}
