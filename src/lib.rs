//! A small agent runtime: chat models, tool-calling agents and the
//! workflow patterns built from them (sequential, parallel, loop,
//! supervisor, plan-execute-replan), with interrupt and resume.

pub mod agents;
pub mod checkpoint;
pub mod config;
pub mod context;
mod error;
mod message;
pub mod model;
pub mod prompt;
pub mod prints;
pub mod runner;
pub mod tools;
pub mod trace;
pub mod traits;

pub use error::{Error, Result};
pub use message::{FunctionCall, Message, Role, ToolCall, concat_messages};
