mod control;
mod function;

pub use control::{
    BreakLoopTool, EXIT_TOOL_NAME, ExitTool, TRANSFER_TOOL_NAME, TransferToAgentTool,
    break_loop_tool,
};
pub use function::{FunctionTool, infer_tool, parameters_schema};
