use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A single chat message, also used for streamed deltas.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name on tool messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    /// Position of the call inside a streamed response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub function: FunctionCall,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Default)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// JSON-encoded arguments.
    #[serde(default)]
    pub arguments: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool(content: impl Into<String>, call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Message {
            tool_call_id: Some(call_id.into()),
            name: Some(name.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            index: None,
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.role.as_str(), self.content)?;
        for call in &self.tool_calls {
            write!(f, "\n  tool call: {}({})", call.function.name, call.function.arguments)?;
        }
        Ok(())
    }
}

/// Merge streamed deltas into a single message.
///
/// Content is appended in arrival order. Tool-call fragments sharing an
/// `index` (or, lacking one, an `id`) are folded into one call.
pub fn concat_messages(chunks: &[Message]) -> Result<Message> {
    let first = chunks
        .first()
        .ok_or_else(|| Error::Stream("no message chunks to concatenate".into()))?;

    let mut merged = Message::new(first.role, String::new());
    let mut calls: Vec<ToolCall> = Vec::new();

    for chunk in chunks {
        merged.content.push_str(&chunk.content);
        if merged.tool_call_id.is_none() {
            merged.tool_call_id = chunk.tool_call_id.clone();
        }
        if merged.name.is_none() {
            merged.name = chunk.name.clone();
        }

        for part in &chunk.tool_calls {
            let slot = calls.iter_mut().find(|c| match (c.index, part.index) {
                (Some(a), Some(b)) => a == b,
                _ => !part.id.is_empty() && c.id == part.id,
            });
            match slot {
                Some(call) => {
                    if call.id.is_empty() {
                        call.id = part.id.clone();
                    }
                    call.function.name.push_str(&part.function.name);
                    call.function.arguments.push_str(&part.function.arguments);
                }
                None => calls.push(part.clone()),
            }
        }
    }

    merged.tool_calls = calls;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_appends_content() {
        let chunks = vec![
            Message::assistant("Hel", vec![]),
            Message::assistant("lo", vec![]),
            Message::assistant("!", vec![]),
        ];
        let merged = concat_messages(&chunks).unwrap();
        assert_eq!(merged.role, Role::Assistant);
        assert_eq!(merged.content, "Hello!");
        assert!(merged.tool_calls.is_empty());
    }

    #[test]
    fn concat_folds_tool_call_fragments_by_index() {
        let mut head = ToolCall::new("call_1", "search_book", "{\"gen");
        head.index = Some(0);
        let mut tail = ToolCall::new("", "", "re\":\"sci-fi\"}");
        tail.index = Some(0);
        let mut other = ToolCall::new("call_2", "ask_for_clarification", "{}");
        other.index = Some(1);

        let chunks = vec![
            Message::assistant("", vec![head]),
            Message::assistant("", vec![tail, other]),
        ];
        let merged = concat_messages(&chunks).unwrap();
        assert_eq!(merged.tool_calls.len(), 2);
        assert_eq!(merged.tool_calls[0].id, "call_1");
        assert_eq!(merged.tool_calls[0].function.name, "search_book");
        assert_eq!(merged.tool_calls[0].function.arguments, "{\"genre\":\"sci-fi\"}");
        assert_eq!(merged.tool_calls[1].function.name, "ask_for_clarification");
    }

    #[test]
    fn concat_rejects_empty_input() {
        assert!(concat_messages(&[]).is_err());
    }

    #[test]
    fn tool_message_serialization_skips_empty_fields() {
        let msg = Message::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));

        let msg = Message::tool("42", "call_9", "multiply");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["tool_call_id"], "call_9");
        assert_eq!(json["name"], "multiply");
    }
}
