mod chat_model;
mod loop_agent;
mod parallel;
mod plan_execute;
mod sequential;
mod supervisor;

pub use chat_model::{ChatModelAgent, DEFAULT_MAX_ITERATIONS, UnknownToolHandler};
pub use loop_agent::LoopAgent;
pub use parallel::ParallelAgent;
pub use plan_execute::{
    DEFAULT_EXECUTOR_INSTRUCTION, DEFAULT_PLAN_EXECUTE_ITERATIONS, DEFAULT_PLANNER_INSTRUCTION,
    DEFAULT_REPLANNER_INSTRUCTION, EXECUTED_STEPS_KEY, ExecutedStep, INPUT_KEY, PLAN_KEY,
    PLAN_TOOL_NAME, Plan, PlanExecute, Planner, RESPOND_TOOL_NAME, Replanner, STEP_KEY, parse_plan,
};
pub use sequential::SequentialAgent;
pub use supervisor::{DEFAULT_MAX_ROUNDS, Supervisor};
