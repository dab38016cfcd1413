//! Tools that steer the run instead of fetching data.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::parameters_schema;
use crate::traits::{AgentAction, Tool, ToolContext, ToolError, ToolInfo};

pub const EXIT_TOOL_NAME: &str = "exit";
pub const TRANSFER_TOOL_NAME: &str = "transfer_to_agent";

#[derive(Deserialize, JsonSchema)]
struct ExitArgs {
    /// the final answer to return to the user
    final_result: String,
}

/// Ends the agent and everything above it with a final answer.
pub struct ExitTool;

#[async_trait]
impl Tool for ExitTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: EXIT_TOOL_NAME.to_string(),
            description: "Exit the agent process and return the final result.".to_string(),
            parameters: parameters_schema::<ExitArgs>(),
        }
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError> {
        let args: ExitArgs = serde_json::from_str(arguments)?;
        ctx.send_action(AgentAction::Exit);
        Ok(args.final_result)
    }
}

#[derive(Deserialize)]
struct TransferArgs {
    agent_name: String,
}

/// Hands control to one of a fixed set of agents.
pub struct TransferToAgentTool {
    agents: Vec<String>,
}

impl TransferToAgentTool {
    pub fn new(agents: Vec<String>) -> Self {
        TransferToAgentTool { agents }
    }
}

#[async_trait]
impl Tool for TransferToAgentTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: TRANSFER_TOOL_NAME.to_string(),
            description: "Transfer the question to another agent.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "agent_name": {
                        "type": "string",
                        "description": "the name of the agent to transfer to",
                        "enum": self.agents,
                    }
                },
                "required": ["agent_name"]
            }),
        }
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError> {
        let args: TransferArgs = serde_json::from_str(arguments)?;
        let message = format!("successfully transferred to agent [{}]", args.agent_name);
        ctx.send_action(AgentAction::TransferToAgent(args.agent_name));
        Ok(message)
    }
}

#[derive(Deserialize, JsonSchema)]
struct SummaryArgs {
    /// final summary of the solution
    summary: String,
}

/// A `{summary}` tool that stops the enclosing loop.
pub struct BreakLoopTool {
    name: String,
    description: String,
}

pub fn break_loop_tool(name: &str, description: &str) -> BreakLoopTool {
    BreakLoopTool {
        name: name.to_string(),
        description: description.to_string(),
    }
}

#[async_trait]
impl Tool for BreakLoopTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: parameters_schema::<SummaryArgs>(),
        }
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<String, ToolError> {
        let args: SummaryArgs = serde_json::from_str(arguments)?;
        ctx.send_action(AgentAction::BreakLoop);
        Ok(args.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_returns_final_result() {
        let ctx = ToolContext::default();
        let out = ExitTool
            .invoke(&ctx, r#"{"final_result": "NY was 9.98% of US GDP"}"#)
            .await
            .unwrap();
        assert_eq!(out, "NY was 9.98% of US GDP");
        assert_eq!(ctx.take_action(), Some(AgentAction::Exit));
    }

    #[tokio::test]
    async fn transfer_names_target() {
        let tool = TransferToAgentTool::new(vec!["research_agent".into(), "math_agent".into()]);
        let info = tool.info();
        assert_eq!(info.parameters["properties"]["agent_name"]["enum"][1], "math_agent");

        let ctx = ToolContext::default();
        let out = tool.invoke(&ctx, r#"{"agent_name": "math_agent"}"#).await.unwrap();
        assert_eq!(out, "successfully transferred to agent [math_agent]");
        assert_eq!(
            ctx.take_action(),
            Some(AgentAction::TransferToAgent("math_agent".into()))
        );
    }

    #[tokio::test]
    async fn break_loop_returns_summary() {
        let tool = break_loop_tool("exit_and_summarize", "exit from the loop");
        let ctx = ToolContext::default();
        let out = tool.invoke(&ctx, r#"{"summary": "looks good"}"#).await.unwrap();
        assert_eq!(out, "looks good");
        assert_eq!(ctx.take_action(), Some(AgentAction::BreakLoop));
    }
}
