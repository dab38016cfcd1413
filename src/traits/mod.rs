mod agent;
mod model;
mod tool;

pub use agent::{Agent, AgentAction, AgentEvent, AgentInput, MessageOutput, ResumeInfo};
pub use model::{ChatModel, MessageStream};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolFunction, ToolInfo, ToolOptions};
