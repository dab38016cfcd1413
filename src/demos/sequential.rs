use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::{ChatModelAgent, SequentialAgent};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::traits::{Agent, ChatModel};

use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(Sequential))
}

const PLANNER_INSTRUCTION: &str = "You are an expert research planner.
Your goal is to create a comprehensive, step-by-step research plan for a given topic.
The plan should be logical, clear, and easy to follow.
The user will provide the research topic. Your output must ONLY be the research plan itself, \
without any conversational text, introductions, or summaries.";

const WRITER_INSTRUCTION: &str = "You are an expert academic writer.
You will be provided with a detailed research plan:
{Plan}

Your task is to expand on this plan to write a comprehensive, well-structured, and in-depth report.";

pub fn research_agent(model: Arc<dyn ChatModel>) -> SequentialAgent {
    let planner = ChatModelAgent::new("PlannerAgent", model.clone())
        .description("Generates a research plan based on a topic.")
        .instruction(PLANNER_INSTRUCTION)
        .output_key("Plan");
    let writer = ChatModelAgent::new("WriterAgent", model)
        .description("Writes a report based on a research plan.")
        .instruction(WRITER_INSTRUCTION);

    let sub_agents: Vec<Arc<dyn Agent>> = vec![Arc::new(planner), Arc::new(writer)];
    SequentialAgent::new(
        "ResearchAgent",
        "A sequential workflow for planning and writing a research report.",
        sub_agents,
    )
}

pub struct Sequential;

#[async_trait]
impl Demo for Sequential {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn description(&self) -> &'static str {
        "Planner writes a research plan, writer expands it into a report"
    }

    fn default_query(&self) -> &'static str {
        "The history and culture of Mount Qingcheng and Dujiangyan in Chengdu"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(research_agent(chat_model()?)))
        });
        traced("ResearchAgent", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
