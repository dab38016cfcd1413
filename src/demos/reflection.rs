use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::{ChatModelAgent, LoopAgent};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::tools::break_loop_tool;
use agent_tour::traits::{Agent, ChatModel};

use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(Reflection))
}

const MAX_ROUNDS: usize = 5;
const EXIT_TOOL: &str = "exit_and_summarize";

pub fn reflection_agent(model: Arc<dyn ChatModel>) -> LoopAgent {
    let main = ChatModelAgent::new("main_agent", model.clone())
        .description("Main agent that attempts to solve the user's task")
        .instruction(
            "You are the main agent responsible for solving the user's task.\n\
             Provide a comprehensive solution based on the given requirements.\n\
             Focus on delivering accurate and complete results.",
        );

    let critique = ChatModelAgent::new("critique_agent", model)
        .description("Critique agent that reviews the main agent's work and provides feedback.")
        .instruction(format!(
            "You are a critique agent responsible for reviewing the main agent's work.\n\
             Analyze the provided solution for accuracy, completeness, and quality.\n\
             If you find issues or areas for improvement, provide specific feedback.\n\
             If the work is satisfactory, call the '{EXIT_TOOL}' tool and provide a final summary response."
        ))
        .tool(break_loop_tool(EXIT_TOOL, "exit from the loop and provide a final summary response"))
        .return_directly(EXIT_TOOL);

    let sub_agents: Vec<Arc<dyn Agent>> = vec![Arc::new(main), Arc::new(critique)];
    LoopAgent::new(
        "reflection_agent",
        "Improves an answer through rounds of critique.",
        sub_agents,
        MAX_ROUNDS,
    )
}

pub struct Reflection;

#[async_trait]
impl Demo for Reflection {
    fn name(&self) -> &'static str {
        "reflection"
    }

    fn description(&self) -> &'static str {
        "A main agent and a critique agent loop until the critique is satisfied"
    }

    fn default_query(&self) -> &'static str {
        "Which index funds in China are suitable for holding 5 to 10 years or longer?"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(reflection_agent(chat_model()?)))
        });
        traced("ReflectionAgents", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
