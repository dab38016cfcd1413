//! Plan, execute one step, replan; repeat until the replanner answers.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use super::ChatModelAgent;
use crate::context::RunContext;
use crate::prompt::render_lenient;
use crate::tools::parameters_schema;
use crate::traits::{Agent, AgentAction, AgentInput, ChatModel, MessageOutput, ResumeInfo, ToolInfo};
use crate::{Error, Message, Result};

pub const DEFAULT_PLAN_EXECUTE_ITERATIONS: usize = 10;

pub const PLAN_TOOL_NAME: &str = "plan";
pub const RESPOND_TOOL_NAME: &str = "respond";

/// Session keys the executor and replanner instructions can reference.
pub const INPUT_KEY: &str = "input";
pub const PLAN_KEY: &str = "plan";
pub const EXECUTED_STEPS_KEY: &str = "executed_steps";
pub const STEP_KEY: &str = "step";
const EXECUTED_STEP_KEY: &str = "executed_step";
const PROGRESS_KEY: &str = "plan_execute_progress";

pub const DEFAULT_PLANNER_INSTRUCTION: &str = "You are an expert planning agent. Given an objective, \
create a comprehensive step-by-step plan to achieve it. Each step must be clear, actionable and \
arranged in logical order, and the final step should produce the answer to the objective. \
Call the `plan` tool with the list of steps.";

pub const DEFAULT_EXECUTOR_INSTRUCTION: &str = "You are a diligent and meticulous executor agent. \
Follow the plan and execute ONLY the current step, using the tools you have when they help.

## OBJECTIVE
{input}

## PLAN
{plan}

## COMPLETED STEPS & RESULTS
{executed_steps}

## YOUR TASK
Execute the following step: {step}";

pub const DEFAULT_REPLANNER_INSTRUCTION: &str = "You are going to review the progress toward an objective. \
Analyze the current state and decide on the next action.

## OBJECTIVE
{input}

## ORIGINAL PLAN
{plan}

## COMPLETED STEPS & RESULTS
{executed_steps}

If the objective is met and no more steps are needed, call `respond` with the final answer for the user.
Otherwise call `plan` with ONLY the remaining steps; do not repeat completed ones.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// different steps to follow, should be in sorted order
    pub steps: Vec<String>,
}

impl Plan {
    pub fn render(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Respond {
    /// the final response to the user
    response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedStep {
    pub step: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Progress {
    plan: Plan,
    executed: Vec<ExecutedStep>,
}

fn render_executed(executed: &[ExecutedStep]) -> String {
    if executed.is_empty() {
        return "(none yet)".to_string();
    }
    executed
        .iter()
        .map(|e| format!("Step: {}\nResult: {}", e.step, e.result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn plan_tool() -> ToolInfo {
    ToolInfo {
        name: PLAN_TOOL_NAME.to_string(),
        description: "Plan with a list of steps to execute in order".to_string(),
        parameters: parameters_schema::<Plan>(),
    }
}

fn respond_tool() -> ToolInfo {
    ToolInfo {
        name: RESPOND_TOOL_NAME.to_string(),
        description: "Generate a direct response to the user. Use when you have all the information needed."
            .to_string(),
        parameters: parameters_schema::<Respond>(),
    }
}

/// Strip a surrounding markdown code fence, if any.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.trim_start_matches(|c: char| c.is_alphanumeric());
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Read a plan from a `plan` tool call, falling back to JSON in the content.
pub fn parse_plan(message: &Message) -> Result<Plan> {
    if let Some(call) = message.tool_calls.iter().find(|c| c.function.name == PLAN_TOOL_NAME) {
        return Ok(serde_json::from_str(&call.function.arguments)?);
    }
    serde_json::from_str(strip_fence(&message.content))
        .map_err(|err| Error::parse(format!("model did not return a plan: {err}")))
}

pub struct Planner {
    model: Arc<dyn ChatModel>,
    instruction: String,
}

impl Planner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Planner {
            model,
            instruction: DEFAULT_PLANNER_INSTRUCTION.to_string(),
        }
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    async fn plan(&self, ctx: &RunContext, input: &AgentInput) -> Result<Plan> {
        let ctx = ctx.enter("planner");
        let mut messages = vec![Message::system(self.instruction.clone())];
        messages.extend(input.messages.iter().cloned());

        let reply = self.model.generate(&messages, &[plan_tool()]).await?;
        ctx.emit_output(MessageOutput::Message(reply.clone()));
        parse_plan(&reply)
    }
}

#[derive(Debug, PartialEq)]
enum Replan {
    Plan(Plan),
    Respond(String),
}

pub struct Replanner {
    model: Arc<dyn ChatModel>,
    instruction: String,
}

impl Replanner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Replanner {
            model,
            instruction: DEFAULT_REPLANNER_INSTRUCTION.to_string(),
        }
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    async fn replan(&self, ctx: &RunContext, objective: &str) -> Result<Replan> {
        let ctx = ctx.enter("replanner");
        let instruction = render_lenient(&self.instruction, &ctx.session_values());
        let messages = vec![Message::system(instruction), Message::user(objective)];

        let reply = self.model.generate(&messages, &[plan_tool(), respond_tool()]).await?;
        ctx.emit_output(MessageOutput::Message(reply.clone()));

        if let Some(call) = reply.tool_calls.iter().find(|c| c.function.name == RESPOND_TOOL_NAME) {
            let respond: Respond = serde_json::from_str(&call.function.arguments)?;
            return Ok(Replan::Respond(respond.response));
        }
        if reply.has_tool_calls() {
            return Ok(Replan::Plan(parse_plan(&reply)?));
        }
        Ok(Replan::Respond(reply.content))
    }
}

pub struct PlanExecute {
    name: String,
    description: String,
    planner: Planner,
    executor: ChatModelAgent,
    replanner: Replanner,
    max_iterations: usize,
}

impl PlanExecute {
    /// The executor's final answer for each step is captured automatically.
    pub fn new(planner: Planner, executor: ChatModelAgent, replanner: Replanner) -> Self {
        PlanExecute {
            name: "plan_execute_replan".to_string(),
            description: "Plans a task, executes it step by step, and replans until done.".to_string(),
            planner,
            executor: executor.output_key(EXECUTED_STEP_KEY),
            replanner,
            max_iterations: DEFAULT_PLAN_EXECUTE_ITERATIONS,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    fn save(&self, ctx: &RunContext, progress: &Progress) -> Result<()> {
        ctx.set_session_value(PLAN_KEY, progress.plan.render());
        ctx.set_session_value(EXECUTED_STEPS_KEY, render_executed(&progress.executed));
        ctx.set_session_value(PROGRESS_KEY, serde_json::to_string(progress)?);
        Ok(())
    }

    fn load(&self, ctx: &RunContext) -> Result<Progress> {
        let raw = ctx
            .session_value(PROGRESS_KEY)
            .ok_or_else(|| Error::checkpoint("no plan-execute progress in session"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Fold the executor's answer for the current step into the progress.
    fn record_step(&self, ctx: &RunContext, progress: &mut Progress) -> Result<()> {
        if progress.plan.steps.is_empty() {
            return Ok(());
        }
        let step = progress.plan.steps.remove(0);
        let result = ctx.session_value(EXECUTED_STEP_KEY).unwrap_or_default();
        progress.executed.push(ExecutedStep { step, result });
        self.save(ctx, progress)
    }

    async fn execute_step(&self, ctx: &RunContext, input: &AgentInput, progress: &Progress) -> Result<Option<AgentAction>> {
        let step = &progress.plan.steps[0];
        tracing::info!(agent = %self.name, step = %step, "executing step");
        ctx.set_session_value(STEP_KEY, step.clone());
        ctx.remove_session_value(EXECUTED_STEP_KEY);
        self.executor.run(ctx.clone(), input.clone()).await
    }

    async fn iterate(&self, ctx: &RunContext, input: &AgentInput, mut progress: Progress) -> Result<Option<AgentAction>> {
        let objective = input.objective();

        for _ in 0..self.max_iterations {
            if !progress.plan.steps.is_empty() {
                if let Some(action) = self.execute_step(ctx, input, &progress).await? {
                    if !matches!(action, AgentAction::TransferToAgent(_)) {
                        return Ok(Some(action));
                    }
                }
                self.record_step(ctx, &mut progress)?;
            }

            match self.replanner.replan(ctx, &objective).await? {
                Replan::Respond(response) => {
                    let message = Message::assistant(response, vec![]);
                    ctx.push_history(&self.name, message);
                    return Ok(None);
                }
                Replan::Plan(plan) => {
                    tracing::info!(agent = %self.name, steps = plan.steps.len(), "replanned");
                    progress.plan = plan;
                    self.save(ctx, &progress)?;
                }
            }
        }

        Err(Error::MaxIterations {
            agent: self.name.clone(),
            max: self.max_iterations,
        })
    }
}

#[async_trait]
impl Agent for PlanExecute {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>> {
        let ctx = ctx.enter(&self.name);
        let span = tracing::info_span!("plan_execute", agent = %self.name);
        async {
            let plan = self.planner.plan(&ctx, &input).await?;
            tracing::info!(agent = %self.name, steps = plan.steps.len(), "planned");
            ctx.set_session_value(INPUT_KEY, input.objective());
            let progress = Progress {
                plan,
                executed: Vec::new(),
            };
            self.save(&ctx, &progress)?;
            self.iterate(&ctx, &input, progress).await
        }
        .instrument(span)
        .await
    }

    async fn resume(&self, ctx: RunContext, input: AgentInput, mut info: ResumeInfo) -> Result<Option<AgentAction>> {
        info.enter(&self.name)?;
        let ctx = ctx.enter(&self.name);
        let mut progress = self.load(&ctx)?;

        if let Some(action) = self.executor.resume(ctx.clone(), input.clone(), info).await? {
            if !matches!(action, AgentAction::TransferToAgent(_)) {
                return Ok(Some(action));
            }
        }
        self.record_step(&ctx, &mut progress)?;
        self.iterate_after_step(&ctx, &input, progress).await
    }
}

impl PlanExecute {
    /// Continue with a replan, as if the current step had just finished.
    async fn iterate_after_step(&self, ctx: &RunContext, input: &AgentInput, mut progress: Progress) -> Result<Option<AgentAction>> {
        match self.replanner.replan(ctx, &input.objective()).await? {
            Replan::Respond(response) => {
                ctx.push_history(&self.name, Message::assistant(response, vec![]));
                Ok(None)
            }
            Replan::Plan(plan) => {
                progress.plan = plan;
                self.save(ctx, &progress)?;
                self.iterate(ctx, input, progress).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;

    #[test]
    fn plan_from_tool_call_or_content() {
        let reply = Message::assistant(
            "",
            vec![ToolCall::new("c1", PLAN_TOOL_NAME, r#"{"steps":["book flight","find hotel"]}"#)],
        );
        assert_eq!(parse_plan(&reply).unwrap().steps, vec!["book flight", "find hotel"]);

        let reply = Message::assistant("```json\n{\"steps\": [\"see the Great Wall\"]}\n```", vec![]);
        assert_eq!(parse_plan(&reply).unwrap().steps, vec!["see the Great Wall"]);

        assert!(parse_plan(&Message::assistant("no plan here", vec![])).is_err());
    }

    #[test]
    fn renders_plan_and_progress() {
        let plan = Plan {
            steps: vec!["search flights".into(), "search hotels".into()],
        };
        assert_eq!(plan.render(), "1. search flights\n2. search hotels");

        assert_eq!(render_executed(&[]), "(none yet)");
        let executed = vec![ExecutedStep {
            step: "search flights".into(),
            result: "CA1234".into(),
        }];
        assert_eq!(render_executed(&executed), "Step: search flights\nResult: CA1234");
    }

    #[test]
    fn plan_tool_schema_lists_steps() {
        let info = plan_tool();
        assert_eq!(info.parameters["properties"]["steps"]["type"], "array");
    }
}
