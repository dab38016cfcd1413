//! Error types for agent runs

use reqwest::StatusCode;

use crate::traits::ToolError;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running agents
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model endpoint answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    /// Failed to parse a response or payload
    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Invalid or missing configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(String),

    /// A tool call failed
    #[error("tool `{name}` failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },

    /// The model asked for a tool the agent does not have
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A transfer named an agent that is not registered
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// An agent exceeded its iteration budget
    #[error("agent `{agent}` exceeded max iterations ({max})")]
    MaxIterations { agent: String, max: usize },

    /// Checkpoint lookup or decoding failed
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// The agent cannot continue an interrupted run
    #[error("agent `{0}` does not support resume")]
    ResumeUnsupported(String),

    /// A streaming response ended badly
    #[error("stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a checkpoint error
    pub fn checkpoint<S: Into<String>>(msg: S) -> Self {
        Self::Checkpoint(msg.into())
    }
}
