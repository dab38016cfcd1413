use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use super::ChatModelAgent;
use crate::context::RunContext;
use crate::tools::{TRANSFER_TOOL_NAME, TransferToAgentTool};
use crate::traits::{Agent, AgentAction, AgentInput, ResumeInfo};
use crate::{Error, Result};

pub const DEFAULT_MAX_ROUNDS: usize = 20;

/// A chat agent that delegates to sub-agents through `transfer_to_agent`.
///
/// Control returns to the supervisor after every delegation; it finishes
/// when it answers directly or calls `exit`.
pub struct Supervisor {
    supervisor: ChatModelAgent,
    sub_agents: Vec<Arc<dyn Agent>>,
    max_rounds: usize,
}

fn transfer_instruction(sub_agents: &[Arc<dyn Agent>]) -> String {
    let listing = sub_agents
        .iter()
        .map(|a| format!("- Agent name: {}\n  Agent description: {}", a.name(), a.description()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Available other agents:\n{listing}\n\n\
         Decision rule:\n\
         - If you're best suited for the question according to your description: ANSWER\n\
         - If another agent is better according to its description: CALL '{TRANSFER_TOOL_NAME}' with their agent name\n\n\
         When transferring: OUTPUT ONLY THE FUNCTION CALL"
    )
}

impl Supervisor {
    pub fn new(supervisor: ChatModelAgent, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        let names = sub_agents.iter().map(|a| a.name().to_string()).collect();
        let supervisor = supervisor
            .append_instruction(&transfer_instruction(&sub_agents))
            .tool(TransferToAgentTool::new(names));
        Supervisor {
            supervisor,
            sub_agents,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    fn find(&self, name: &str) -> Result<&Arc<dyn Agent>> {
        self.sub_agents
            .iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| Error::AgentNotFound(name.to_string()))
    }

    /// After a sub-agent ends: `Some` stops the supervisor, `None` hands control back.
    fn after_delegate(&self, ctx: &RunContext, agent: &str, action: Option<AgentAction>) -> Option<AgentAction> {
        match action {
            Some(action @ (AgentAction::Exit | AgentAction::Interrupted(_))) => Some(action),
            _ => {
                ctx.enter(agent)
                    .emit_action(AgentAction::TransferToAgent(self.name().to_string()));
                None
            }
        }
    }

    async fn supervise(
        &self,
        ctx: &RunContext,
        input: &AgentInput,
        mut decided: Option<Option<AgentAction>>,
    ) -> Result<Option<AgentAction>> {
        for round in 0..self.max_rounds {
            let decision = match decided.take() {
                Some(decision) => decision,
                None => self.supervisor.run_at(ctx, input).await?,
            };

            match decision {
                Some(AgentAction::TransferToAgent(target)) => {
                    tracing::info!(supervisor = %self.name(), round, target = %target, "delegating");
                    let agent = self.find(&target)?;
                    let action = agent.run(ctx.clone(), input.clone()).await?;
                    if let Some(stop) = self.after_delegate(ctx, agent.name(), action) {
                        return Ok(Some(stop));
                    }
                }
                other => return Ok(other),
            }
        }

        Err(Error::MaxIterations {
            agent: self.name().to_string(),
            max: self.max_rounds,
        })
    }
}

#[async_trait]
impl Agent for Supervisor {
    fn name(&self) -> &str {
        self.supervisor.name()
    }

    fn description(&self) -> &str {
        Agent::description(&self.supervisor)
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        let ctx = ctx.enter(self.name());
        self.supervise(&ctx, &input, None)
            .instrument(tracing::info_span!("supervisor", agent = %self.name()))
            .await
    }

    async fn resume(&self, ctx: RunContext, input: AgentInput, mut info: ResumeInfo) -> Result<Option<AgentAction>> {
        info.enter(self.name())?;
        let ctx = ctx.enter(self.name());
        let Some(next) = info.next().map(str::to_string) else {
            let decision = self.supervisor.resume_at(&ctx, info).await?;
            return self.supervise(&ctx, &input, Some(decision)).await;
        };

        let agent = self.find(&next)?;
        let action = agent.resume(ctx.clone(), input.clone(), info).await?;
        if let Some(stop) = self.after_delegate(&ctx, agent.name(), action) {
            return Ok(Some(stop));
        }
        self.supervise(&ctx, &input, None).await
    }
}
