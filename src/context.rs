//! Per-run state shared by every agent taking part in a run.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::traits::{AgentAction, AgentEvent, MessageOutput, ToolOptions};
use crate::{Message, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub agent: String,
    pub message: Message,
}

/// Values written through `output_key` plus every agent's final message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub values: HashMap<String, String>,
    pub history: Vec<HistoryEntry>,
}

/// What an interrupted agent left behind for a later resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptState {
    pub path: Vec<String>,
    pub info: String,
    pub state: Value,
}

#[derive(Clone)]
pub struct RunContext {
    run_path: Vec<String>,
    streaming: bool,
    session: Arc<Mutex<Session>>,
    events: mpsc::UnboundedSender<AgentEvent>,
    tool_options: Arc<ToolOptions>,
    interrupt: Arc<Mutex<Option<InterruptState>>>,
}

impl RunContext {
    pub fn new(
        events: mpsc::UnboundedSender<AgentEvent>,
        streaming: bool,
        session: Session,
        tool_options: ToolOptions,
    ) -> Self {
        RunContext {
            run_path: Vec::new(),
            streaming,
            session: Arc::new(Mutex::new(session)),
            events,
            tool_options: Arc::new(tool_options),
            interrupt: Arc::new(Mutex::new(None)),
        }
    }

    /// Context for a sub-agent named `name`, sharing session and channels.
    pub fn enter(&self, name: &str) -> RunContext {
        let mut ctx = self.clone();
        ctx.run_path.push(name.to_string());
        ctx
    }

    pub fn run_path(&self) -> &[String] {
        &self.run_path
    }

    pub fn agent_name(&self) -> &str {
        self.run_path.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn tool_options(&self) -> ToolOptions {
        self.tool_options.as_ref().clone()
    }

    pub fn emit(&self, mut event: AgentEvent) {
        if event.agent_name.is_empty() {
            event.agent_name = self.agent_name().to_string();
        }
        if event.run_path.is_empty() {
            event.run_path = self.run_path.clone();
        }
        if self.events.send(event).is_err() {
            tracing::debug!(agent = self.agent_name(), "event receiver dropped");
        }
    }

    pub fn emit_output(&self, output: MessageOutput) {
        self.emit(AgentEvent {
            output: Some(output),
            ..Default::default()
        });
    }

    pub fn emit_action(&self, action: AgentAction) {
        self.emit(AgentEvent {
            action: Some(action),
            ..Default::default()
        });
    }

    pub fn session_value(&self, key: &str) -> Option<String> {
        self.session.lock().values.get(key).cloned()
    }

    pub fn set_session_value(&self, key: impl Into<String>, value: impl Into<String>) {
        self.session.lock().values.insert(key.into(), value.into());
    }

    pub fn remove_session_value(&self, key: &str) -> Option<String> {
        self.session.lock().values.remove(key)
    }

    pub fn session_values(&self) -> HashMap<String, String> {
        self.session.lock().values.clone()
    }

    pub fn session_snapshot(&self) -> Session {
        self.session.lock().clone()
    }

    pub fn push_history(&self, agent: &str, message: Message) {
        self.session.lock().history.push(HistoryEntry {
            agent: agent.to_string(),
            message,
        });
    }

    /// History as seen by `agent`: its own turns stay assistant messages,
    /// everyone else's are replayed as user-side context.
    pub fn history_for(&self, agent: &str) -> Vec<Message> {
        self.session
            .lock()
            .history
            .iter()
            .filter(|entry| !entry.message.content.is_empty())
            .map(|entry| {
                if entry.agent == agent {
                    Message::assistant(entry.message.content.clone(), vec![])
                } else {
                    Message::new(
                        Role::User,
                        format!("For context: [{}] said: {}", entry.agent, entry.message.content),
                    )
                }
            })
            .collect()
    }

    pub fn set_interrupt(&self, info: impl Into<String>, state: Value) {
        *self.interrupt.lock() = Some(InterruptState {
            path: self.run_path.clone(),
            info: info.into(),
            state,
        });
    }

    pub fn take_interrupt(&self) -> Option<InterruptState> {
        self.interrupt.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (RunContext, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RunContext::new(tx, false, Session::default(), ToolOptions::new()), rx)
    }

    #[test]
    fn enter_extends_path_and_shares_session() {
        let (root, _rx) = context();
        let child = root.enter("ResearchAgent").enter("PlannerAgent");
        assert_eq!(child.run_path(), ["ResearchAgent", "PlannerAgent"]);
        assert_eq!(child.agent_name(), "PlannerAgent");

        child.set_session_value("Plan", "1. read sources");
        assert_eq!(root.session_value("Plan").as_deref(), Some("1. read sources"));
    }

    #[test]
    fn history_rewrites_other_agents_as_context() {
        let (ctx, _rx) = context();
        ctx.push_history("main_agent", Message::assistant("draft answer", vec![]));
        ctx.push_history("critique_agent", Message::assistant("add sources", vec![]));

        let seen = ctx.history_for("main_agent");
        assert_eq!(seen[0].role, Role::Assistant);
        assert_eq!(seen[0].content, "draft answer");
        assert_eq!(seen[1].role, Role::User);
        assert_eq!(seen[1].content, "For context: [critique_agent] said: add sources");
    }

    #[tokio::test]
    async fn emit_fills_name_and_path() {
        let (root, mut rx) = context();
        root.enter("hello-agent").emit_action(AgentAction::Exit);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.agent_name, "hello-agent");
        assert_eq!(event.run_path, vec!["hello-agent".to_string()]);
        assert_eq!(event.action, Some(AgentAction::Exit));
    }

    #[test]
    fn interrupt_records_current_path() {
        let (root, _rx) = context();
        let ctx = root.enter("Book Recommender");
        ctx.set_interrupt("which genre?", Value::Null);
        let state = root.take_interrupt().unwrap();
        assert_eq!(state.path, vec!["Book Recommender".to_string()]);
        assert_eq!(state.info, "which genre?");
        assert!(root.take_interrupt().is_none());
    }
}
