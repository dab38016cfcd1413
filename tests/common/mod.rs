#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use agent_tour::runner::EventStream;
use agent_tour::traits::{AgentAction, AgentEvent, ChatModel, MessageStream, ToolInfo};
use agent_tour::{Error, Message, Result, ToolCall};
use async_trait::async_trait;
use futures_util::stream;
use parking_lot::Mutex;

/// One call the model received.
#[derive(Debug, Clone)]
pub struct Request {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

impl Request {
    pub fn system(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == agent_tour::Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.messages.iter().any(|m| m.content.contains(text))
    }
}

/// Replays queued replies in order and records what it was asked.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Arc<Self> {
        Arc::new(ScriptedModel {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    fn next(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<Message> {
        self.requests.lock().push(Request {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Stream("script exhausted".into()))
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn generate(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<Message> {
        self.next(messages, tools)
    }

    /// Content arrives in two halves; tool calls follow as indexed fragments.
    async fn stream(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<MessageStream> {
        let reply = self.next(messages, tools)?;
        let mut split = reply.content.len() / 2;
        while !reply.content.is_char_boundary(split) {
            split -= 1;
        }
        let (head, tail) = reply.content.split_at(split);
        let mut chunks = vec![
            Message::assistant(head, vec![]),
            Message::assistant(tail, vec![]),
        ];
        for (i, call) in reply.tool_calls.iter().enumerate() {
            let mut fragment = call.clone();
            fragment.index = Some(i);
            chunks.push(Message::assistant("", vec![fragment]));
        }
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok::<Message, Error>))))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn text(content: &str) -> Message {
    Message::assistant(content, vec![])
}

pub fn call(name: &str, arguments: &str) -> Message {
    Message::assistant("", vec![ToolCall::new(format!("call_{name}"), name, arguments)])
}

pub async fn collect(mut events: EventStream) -> Vec<AgentEvent> {
    let mut all = Vec::new();
    while let Some(event) = events.next().await {
        all.push(event);
    }
    all
}

/// Whole messages in arrival order, as `(agent, content)`.
pub fn contents(events: &[AgentEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|e| e.message().map(|m| (e.agent_name.clone(), m.content.clone())))
        .collect()
}

pub fn actions(events: &[AgentEvent]) -> Vec<(String, AgentAction)> {
    events
        .iter()
        .filter_map(|e| e.action.clone().map(|a| (e.agent_name.clone(), a)))
        .collect()
}

pub fn error(events: &[AgentEvent]) -> Option<&Error> {
    events.iter().find_map(|e| e.err.as_ref())
}
