use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use agent_tour::agents::{ChatModelAgent, Supervisor};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::tools::{FunctionTool, infer_tool};
use agent_tour::traits::{Agent, ChatModel, ToolError};

use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(LayeredSupervisor))
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchRequest {
    query: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    result: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct Operands {
    a: f64,
    b: f64,
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    result: f64,
}

fn unknown_tool(name: &str, _arguments: &str) -> String {
    format!("unknown tool: {name}")
}

fn search_tool() -> FunctionTool {
    infer_tool("search", "search the internet for info", |req: SearchRequest, _ctx| async move {
        tracing::debug!(query = %req.query, "search");
        Ok::<_, ToolError>(SearchResponse {
            result: "In 2024, the US GDP was $23 trillion and New York State's GDP was $2.297 trillion".into(),
        })
    })
}

pub fn divide(a: f64, b: f64) -> Result<f64, ToolError> {
    if b == 0.0 {
        return Err(ToolError::failed("division by zero"));
    }
    Ok(a / b)
}

fn math_tool(name: &str, description: &str, op: fn(f64, f64) -> Result<f64, ToolError>) -> FunctionTool {
    infer_tool(name, description, move |req: Operands, _ctx| async move {
        Ok::<_, ToolError>(Outcome { result: op(req.a, req.b)? })
    })
}

fn worker_instruction(role: &str) -> String {
    format!(
        "You are a {role} agent.\n\n\
         INSTRUCTIONS:\n\
         - Assist ONLY with {role}-related tasks\n\
         - After you're done with your tasks, respond to the supervisor directly\n\
         - Respond ONLY with the results of your work, do NOT include ANY other text."
    )
}

fn math_worker(model: Arc<dyn ChatModel>, name: &str, role: &str, tool: FunctionTool) -> Arc<dyn Agent> {
    Arc::new(
        ChatModelAgent::new(name, model)
            .description(format!("the agent responsible to do {role}"))
            .instruction(worker_instruction(role))
            .tool(tool)
            .unknown_tool_handler(unknown_tool),
    )
}

fn math_agent(model: Arc<dyn ChatModel>) -> Supervisor {
    let subtract = math_worker(
        model.clone(),
        "subtract_agent",
        "math subtraction",
        math_tool("subtract", "subtract two numbers", |a, b| Ok(a - b)),
    );
    let multiply = math_worker(
        model.clone(),
        "multiply_agent",
        "math multiplication",
        math_tool("multiply", "multiply two numbers", |a, b| Ok(a * b)),
    );
    let divider = math_worker(
        model.clone(),
        "divide_agent",
        "math division",
        math_tool("divide", "divide two numbers", divide),
    );

    let supervisor = ChatModelAgent::new("math_agent", model)
        .description("the agent responsible to do math")
        .instruction(format!(
            "{}\n\
             - YOU are yourself also a supervisor managing three agents:\n\
             - a subtract_agent, a multiply_agent, a divide_agent. Assign math-related tasks to these agents.\n\
             - Assign work to one agent at a time, do not call agents in parallel.\n\
             - Do not do any real math work yourself, always transfer to your sub agents to do actual computation.",
            worker_instruction("math")
        ))
        .unknown_tool_handler(unknown_tool);

    Supervisor::new(supervisor, vec![subtract, multiply, divider])
}

pub fn layered_supervisor(model: Arc<dyn ChatModel>) -> Supervisor {
    let research: Arc<dyn Agent> = Arc::new(
        ChatModelAgent::new("research_agent", model.clone())
            .description("the agent responsible to search the internet for info")
            .instruction(
                "You are a research agent.\n\n\
                 INSTRUCTIONS:\n\
                 - Assist ONLY with research-related tasks. DO NOT do any math\n\
                 - After you're done with your tasks, respond to the supervisor directly\n\
                 - Respond ONLY with the results of your work, do NOT include ANY other text.",
            )
            .tool(search_tool())
            .unknown_tool_handler(unknown_tool),
    );
    let math: Arc<dyn Agent> = Arc::new(math_agent(model.clone()));

    let supervisor = ChatModelAgent::new("supervisor", model)
        .description("the agent responsible to supervise tasks")
        .instruction(
            "You are a supervisor managing two agents:\n\n\
             - a research agent. Assign research-related tasks to this agent\n\
             - a math agent. Assign math-related tasks to this agent\n\
             Assign work to one agent at a time, do not call agents in parallel.\n\
             Do not do any work yourself.",
        )
        .unknown_tool_handler(unknown_tool)
        .with_exit();

    Supervisor::new(supervisor, vec![research, math])
}

pub struct LayeredSupervisor;

#[async_trait]
impl Demo for LayeredSupervisor {
    fn name(&self) -> &'static str {
        "supervisor"
    }

    fn description(&self) -> &'static str {
        "A supervisor over a research agent and a math supervisor"
    }

    fn default_query(&self) -> &'static str {
        "find US and New York state GDP in 2024. what % of US GDP was New York state? \
         Then multiply that percentage by 1.589."
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(layered_supervisor(chat_model()?)))
        });
        println!("\nuser query: {query}");
        traced("layered-supervisor", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
