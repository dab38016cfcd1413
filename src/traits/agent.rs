use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RunContext;
use crate::{Error, Message, Result};

/// Control signal an agent hands back to whoever ran it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentAction {
    Exit,
    BreakLoop,
    TransferToAgent(String),
    Interrupted(String),
}

#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    pub messages: Vec<Message>,
}

impl AgentInput {
    pub fn new(messages: Vec<Message>) -> Self {
        AgentInput { messages }
    }

    pub fn query(text: impl Into<String>) -> Self {
        AgentInput {
            messages: vec![Message::user(text)],
        }
    }

    /// Text of the first user message, used by planners as "the objective".
    pub fn objective(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == crate::Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// State needed to continue an interrupted run.
#[derive(Debug, Clone)]
pub struct ResumeInfo {
    /// Remaining agent names from the current agent down to the one that paused.
    pub path: VecDeque<String>,
    pub state: Value,
}

impl ResumeInfo {
    /// Pop this agent's own name off the path, checking it matches.
    pub fn enter(&mut self, name: &str) -> Result<()> {
        match self.path.pop_front() {
            Some(head) if head == name => Ok(()),
            Some(head) => Err(Error::checkpoint(format!(
                "checkpoint path expects `{head}`, found agent `{name}`"
            ))),
            None => Err(Error::checkpoint(format!(
                "checkpoint path ended before agent `{name}`"
            ))),
        }
    }

    /// Name of the sub-agent the resume continues into, if any.
    pub fn next(&self) -> Option<&str> {
        self.path.front().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub enum MessageOutput {
    /// A complete, non-streamed message.
    Message(Message),
    /// One streamed delta.
    Chunk(Message),
    /// The aggregate of all deltas, sent after the last chunk.
    Done(Message),
}

#[derive(Debug, Default)]
pub struct AgentEvent {
    pub agent_name: String,
    pub run_path: Vec<String>,
    pub output: Option<MessageOutput>,
    pub action: Option<AgentAction>,
    pub err: Option<Error>,
}

impl AgentEvent {
    /// The whole message carried by this event, skipping stream deltas.
    pub fn message(&self) -> Option<&Message> {
        match &self.output {
            Some(MessageOutput::Message(m)) | Some(MessageOutput::Done(m)) => Some(m),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Run to completion, emitting events through `ctx`.
    async fn run(&self, ctx: RunContext, input: AgentInput) -> Result<Option<AgentAction>>;

    /// Continue a run previously stopped by an interrupt.
    async fn resume(&self, _ctx: RunContext, _input: AgentInput, _info: ResumeInfo) -> Result<Option<AgentAction>> {
        Err(Error::ResumeUnsupported(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_info_walks_path() {
        let mut info = ResumeInfo {
            path: VecDeque::from(vec!["ResearchAgent".to_string(), "WriterAgent".to_string()]),
            state: Value::Null,
        };
        info.enter("ResearchAgent").unwrap();
        assert_eq!(info.next(), Some("WriterAgent"));
        assert!(info.enter("PlannerAgent").is_err());
    }

    #[test]
    fn event_message_skips_chunks() {
        let event = AgentEvent {
            output: Some(MessageOutput::Chunk(Message::assistant("He", vec![]))),
            ..Default::default()
        };
        assert!(event.message().is_none());

        let event = AgentEvent {
            output: Some(MessageOutput::Done(Message::assistant("Hello", vec![]))),
            ..Default::default()
        };
        assert_eq!(event.message().unwrap().content, "Hello");
    }
}
