use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::context::RunContext;
use crate::traits::{Agent, AgentAction, AgentInput, ResumeInfo};
use crate::{Error, Result};

/// Runs sub-agents one after another over a shared session.
pub struct SequentialAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl SequentialAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sub_agents: Vec<Arc<dyn Agent>>,
    ) -> Self {
        SequentialAgent {
            name: name.into(),
            description: description.into(),
            sub_agents,
        }
    }

    async fn run_from(&self, ctx: &RunContext, input: &AgentInput, start: usize) -> Result<Option<AgentAction>> {
        for agent in &self.sub_agents[start..] {
            tracing::debug!(workflow = %self.name, agent = agent.name(), "running sub-agent");
            if let Some(action) = agent.run(ctx.clone(), input.clone()).await? {
                return Ok(Some(action));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Agent for SequentialAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        let ctx = ctx.enter(&self.name);
        self.run_from(&ctx, &input, 0)
            .instrument(tracing::info_span!("sequential_agent", agent = %self.name))
            .await
    }

    async fn resume(&self, ctx: RunContext, input: AgentInput, mut info: ResumeInfo) -> Result<Option<AgentAction>> {
        info.enter(&self.name)?;
        let next = info
            .next()
            .ok_or_else(|| Error::checkpoint(format!("no sub-agent to resume in `{}`", self.name)))?;
        let index = self
            .sub_agents
            .iter()
            .position(|a| a.name() == next)
            .ok_or_else(|| Error::AgentNotFound(next.to_string()))?;

        let ctx = ctx.enter(&self.name);
        if let Some(action) = self.sub_agents[index].resume(ctx.clone(), input.clone(), info).await? {
            return Ok(Some(action));
        }
        self.run_from(&ctx, &input, index + 1).await
    }
}
