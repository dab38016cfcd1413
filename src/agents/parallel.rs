use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::Instrument;

use crate::context::RunContext;
use crate::traits::{Agent, AgentAction, AgentInput};
use crate::Result;

/// Runs every sub-agent concurrently on the same input.
pub struct ParallelAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
}

impl ParallelAgent {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        sub_agents: Vec<Arc<dyn Agent>>,
    ) -> Self {
        ParallelAgent {
            name: name.into(),
            description: description.into(),
            sub_agents,
        }
    }
}

#[async_trait]
impl Agent for ParallelAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        let ctx = ctx.enter(&self.name);
        let runs = self
            .sub_agents
            .iter()
            .map(|agent| agent.run(ctx.clone(), input.clone()));

        let actions = try_join_all(runs)
            .instrument(tracing::info_span!("parallel_agent", agent = %self.name))
            .await?;

        // Exit and interrupts outrank everything else a branch reported.
        let action = actions
            .into_iter()
            .flatten()
            .min_by_key(|action| match action {
                AgentAction::Interrupted(_) => 0,
                AgentAction::Exit => 1,
                _ => 2,
            });
        Ok(action)
    }
}
