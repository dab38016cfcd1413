mod common;

use std::sync::Arc;

use agent_tour::Error;
use agent_tour::agents::{
    ChatModelAgent, DEFAULT_EXECUTOR_INSTRUCTION, PlanExecute, Planner, Replanner,
};
use agent_tour::checkpoint::{Checkpoint, CheckpointStore, InMemoryStore};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::tools::{TransferToAgentTool, infer_tool};
use agent_tour::traits::{AgentAction, ToolError};
use common::{ScriptedModel, actions, call, collect, contents, error, text};
use schemars::JsonSchema;
use serde::Deserialize;

fn plan_execute(planner: Arc<ScriptedModel>, executor: Arc<ScriptedModel>, replanner: Arc<ScriptedModel>) -> Runner {
    let executor = ChatModelAgent::new("executor", executor).instruction(DEFAULT_EXECUTOR_INSTRUCTION);
    let agent = PlanExecute::new(Planner::new(planner), executor, Replanner::new(replanner));
    Runner::new(RunnerConfig::new(Arc::new(agent)))
}

const QUERY: &str = "Plan a 3-day trip to Beijing from Chengdu";

#[tokio::test]
async fn executes_steps_and_replans_until_a_response() {
    let planner = ScriptedModel::new(vec![call("plan", r#"{"steps": ["find flights", "find hotels"]}"#)]);
    let executor = ScriptedModel::new(vec![text("CA4193 at 08:30"), text("Wangfujing Grand Hotel")]);
    let replanner = ScriptedModel::new(vec![
        call("plan", r#"{"steps": ["find hotels"]}"#),
        call("respond", r#"{"response": "Fly CA4193 and stay at Wangfujing Grand Hotel."}"#),
    ]);

    let runner = plan_execute(planner.clone(), executor.clone(), replanner.clone());
    let events = collect(runner.query(QUERY, RunOptions::new())).await;
    assert!(error(&events).is_none());

    assert_eq!(planner.requests()[0].tools, vec!["plan"]);
    assert!(planner.requests()[0].contains(QUERY));

    let steps = executor.requests();
    assert_eq!(steps.len(), 2);
    assert!(steps[0].system().contains("Execute the following step: find flights"));
    assert!(steps[0].system().contains("1. find flights\n2. find hotels"));
    assert!(steps[1].system().contains("Step: find flights\nResult: CA4193 at 08:30"));
    assert!(steps[1].system().contains("Execute the following step: find hotels"));

    let replans = replanner.requests();
    assert_eq!(replans[0].tools, vec!["plan", "respond"]);
    assert!(replans[1].system().contains("Result: Wangfujing Grand Hotel"));

    let agents: Vec<String> = events.iter().map(|e| e.agent_name.clone()).collect();
    assert_eq!(agents.first().map(String::as_str), Some("planner"));
    assert_eq!(agents.last().map(String::as_str), Some("replanner"));
    assert_eq!(events[0].run_path, vec!["plan_execute_replan", "planner"]);
}

#[tokio::test]
async fn plan_may_arrive_as_fenced_json() {
    let planner = ScriptedModel::new(vec![text("```json\n{\"steps\": [\"see the Great Wall\"]}\n```")]);
    let executor = ScriptedModel::new(vec![text("Mutianyu, take the cable car")]);
    let replanner = ScriptedModel::new(vec![text("Visit Mutianyu by cable car.")]);

    let runner = plan_execute(planner, executor.clone(), replanner);
    let events = collect(runner.query(QUERY, RunOptions::new())).await;
    assert!(error(&events).is_none());
    assert!(executor.requests()[0].system().contains("Execute the following step: see the Great Wall"));
    assert_eq!(contents(&events).last().unwrap().1, "Visit Mutianyu by cable car.");
}

#[tokio::test]
async fn unparseable_plan_is_an_error() {
    let planner = ScriptedModel::new(vec![text("I would rather not plan")]);
    let runner = plan_execute(planner, ScriptedModel::new(vec![]), ScriptedModel::new(vec![]));

    let events = collect(runner.query(QUERY, RunOptions::new())).await;
    assert!(matches!(error(&events), Some(Error::Parse(_))));
}

#[tokio::test]
async fn endless_replanning_hits_max_iterations() {
    let planner = ScriptedModel::new(vec![call("plan", r#"{"steps": ["a"]}"#)]);
    let executor = ScriptedModel::new(vec![text("did a"), text("did b")]);
    let replanner = ScriptedModel::new(vec![
        call("plan", r#"{"steps": ["b"]}"#),
        call("plan", r#"{"steps": ["c"]}"#),
    ]);

    let executor_agent = ChatModelAgent::new("executor", executor).instruction(DEFAULT_EXECUTOR_INSTRUCTION);
    let agent = PlanExecute::new(Planner::new(planner), executor_agent, Replanner::new(replanner))
        .max_iterations(2);
    let runner = Runner::new(RunnerConfig::new(Arc::new(agent)));

    let events = collect(runner.query(QUERY, RunOptions::new())).await;
    assert!(matches!(
        error(&events),
        Some(Error::MaxIterations { max: 2, .. })
    ));
}

#[derive(Deserialize, JsonSchema)]
struct Question {
    question: String,
}

#[tokio::test]
async fn resume_records_the_interrupted_step_and_replans() {
    let planner = ScriptedModel::new(vec![call("plan", r#"{"steps": ["a", "b"]}"#)]);
    let executor = ScriptedModel::new(vec![
        call("ask_for_clarification", r#"{"question": "which airport?"}"#),
        text("did a"),
        text("did b"),
    ]);
    let replanner = ScriptedModel::new(vec![
        call("plan", r#"{"steps": ["b"]}"#),
        call("respond", r#"{"response": "all done"}"#),
    ]);

    let ask = infer_tool("ask_for_clarification", "ask the user", |q: Question, ctx| async move {
        match ctx.option_str("new_input") {
            Some(answer) => Ok(answer.to_string()),
            None => Err(ToolError::interrupt(q.question)),
        }
    });
    let executor_agent = ChatModelAgent::new("executor", executor.clone())
        .instruction(DEFAULT_EXECUTOR_INSTRUCTION)
        .tool(ask);
    let agent = PlanExecute::new(Planner::new(planner), executor_agent, Replanner::new(replanner.clone()));
    let store = Arc::new(InMemoryStore::new());
    let runner = Runner::new(RunnerConfig {
        agent: Arc::new(agent),
        enable_streaming: false,
        checkpoint_store: Some(store.clone()),
    });

    let events = collect(runner.query(QUERY, RunOptions::new().checkpoint_id("trip"))).await;
    assert!(error(&events).is_none());
    assert_eq!(
        actions(&events),
        vec![("executor".to_string(), AgentAction::Interrupted("which airport?".into()))]
    );
    let saved = Checkpoint::decode(&store.get("trip").await.unwrap().unwrap()).unwrap();
    assert_eq!(saved.path, vec!["plan_execute_replan", "executor"]);

    let options = RunOptions::new().tool_option("new_input", "PEK");
    let events = collect(runner.resume("trip", options).await.unwrap()).await;
    assert!(error(&events).is_none());

    let steps = executor.requests();
    assert_eq!(steps.len(), 3);
    assert!(steps[2].system().contains("Step: a\nResult: did a"));
    assert!(steps[2].system().contains("Execute the following step: b"));
    assert!(replanner.requests()[0].system().contains("Result: did a"));
    assert!(replanner.requests()[1].system().contains("Result: did b"));
    assert_eq!(replanner.remaining(), 0);
}

#[tokio::test]
async fn step_without_an_answer_is_not_credited_with_the_previous_result() {
    let planner = ScriptedModel::new(vec![call("plan", r#"{"steps": ["a", "b"]}"#)]);
    let executor = ScriptedModel::new(vec![
        text("did a"),
        call("transfer_to_agent", r#"{"agent_name": "elsewhere"}"#),
    ]);
    let replanner = ScriptedModel::new(vec![
        call("plan", r#"{"steps": ["b"]}"#),
        call("respond", r#"{"response": "gave up on b"}"#),
    ]);

    let executor_agent = ChatModelAgent::new("executor", executor)
        .instruction(DEFAULT_EXECUTOR_INSTRUCTION)
        .tool(TransferToAgentTool::new(vec!["elsewhere".into()]));
    let agent = PlanExecute::new(Planner::new(planner), executor_agent, Replanner::new(replanner.clone()));
    let runner = Runner::new(RunnerConfig::new(Arc::new(agent)));

    let events = collect(runner.query(QUERY, RunOptions::new())).await;
    assert!(error(&events).is_none());

    let last = replanner.requests()[1].system().to_string();
    assert!(last.contains("Step: a\nResult: did a"));
    assert!(last.contains("Step: b\nResult: \n"));
    assert!(!last.contains("Step: b\nResult: did a"));
}
