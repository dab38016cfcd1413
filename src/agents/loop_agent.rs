use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::context::RunContext;
use crate::traits::{Agent, AgentAction, AgentInput};
use crate::Result;

/// Repeats its sub-agents in order until one breaks the loop.
pub struct LoopAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
    /// Zero means no limit.
    max_iterations: usize,
}

impl LoopAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sub_agents: Vec<Arc<dyn Agent>>,
        max_iterations: usize,
    ) -> Self {
        LoopAgent {
            name: name.into(),
            description: description.into(),
            sub_agents,
            max_iterations,
        }
    }

    async fn iterate(&self, ctx: &RunContext, input: &AgentInput) -> Result<Option<AgentAction>> {
        let mut iteration = 0;
        while self.max_iterations == 0 || iteration < self.max_iterations {
            iteration += 1;
            tracing::debug!(agent = %self.name, iteration, "loop iteration");
            for agent in &self.sub_agents {
                match agent.run(ctx.clone(), input.clone()).await? {
                    None | Some(AgentAction::TransferToAgent(_)) => {}
                    Some(AgentAction::BreakLoop) => {
                        tracing::info!(agent = %self.name, iteration, "loop finished");
                        return Ok(None);
                    }
                    Some(action) => return Ok(Some(action)),
                }
            }
        }
        tracing::info!(agent = %self.name, iterations = iteration, "loop reached max iterations");
        Ok(None)
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        let ctx = ctx.enter(&self.name);
        self.iterate(&ctx, &input)
            .instrument(tracing::info_span!("loop_agent", agent = %self.name))
            .await
    }
}
