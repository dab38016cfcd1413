//! Ollama `/api/chat`

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_status, lines};
use crate::config::OllamaConfig;
use crate::traits::{ChatModel, MessageStream, ToolDefinition, ToolInfo};
use crate::{FunctionCall, Message, Result, Role, ToolCall};

pub struct OllamaChatModel {
    client: Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaMessage {
    role: Role,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama sends and expects arguments as a JSON object, not a string.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        OllamaMessage {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| OllamaToolCall {
                    function: OllamaFunction {
                        name: call.function.name.clone(),
                        arguments: serde_json::from_str(&call.function.arguments)
                            .unwrap_or_else(|_| Value::Object(Default::default())),
                    },
                })
                .collect(),
            tool_name: if msg.role == Role::Tool { msg.name.clone() } else { None },
        }
    }
}

impl OllamaMessage {
    /// Ollama sends no call ids; number them from `first_call`.
    fn into_message(self, first_call: usize) -> Message {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(i, call)| ToolCall {
                id: format!("call_{}", first_call + i),
                index: None,
                function: FunctionCall {
                    name: call.function.name,
                    arguments: call.function.arguments.to_string(),
                },
            })
            .collect();
        Message {
            tool_calls,
            ..Message::new(self.role, self.content)
        }
    }
}

impl From<OllamaMessage> for Message {
    fn from(msg: OllamaMessage) -> Self {
        msg.into_message(0)
    }
}

/// Decode one NDJSON line into its message and `done` flag.
///
/// `next_call` carries the call numbering across the lines of one reply, so
/// calls finished on different lines keep distinct ids.
fn parse_line(line: &str, next_call: &mut usize) -> Result<(Option<Message>, bool)> {
    let response: ChatResponse = serde_json::from_str(line)?;
    let message = response.message.map(|msg| {
        let first = *next_call;
        *next_call += msg.tool_calls.len();
        msg.into_message(first)
    });
    Ok((message, response.done))
}

fn ndjson_messages(response: reqwest::Response) -> impl Stream<Item = Result<Message>> + Send {
    try_stream! {
        let lines = lines(response);
        futures_util::pin_mut!(lines);
        let mut next_call = 0;
        while let Some(line) = lines.next().await {
            let (message, done) = parse_line(&line?, &mut next_call)?;
            if let Some(message) = message {
                yield message;
            }
            if done {
                break;
            }
        }
    }
}

impl OllamaChatModel {
    pub fn new(config: OllamaConfig) -> Self {
        OllamaChatModel {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }

    async fn send(&self, messages: &[Message], tools: &[ToolInfo], stream: bool) -> Result<reqwest::Response> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: messages.iter().map(OllamaMessage::from).collect(),
            stream,
            tools: tools.iter().map(ToolDefinition::from).collect(),
        };
        let response = self.client.post(self.endpoint()).json(&request).send().await?;
        check_status(response).await
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    async fn generate(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<Message> {
        tracing::debug!(model = %self.config.model, messages = messages.len(), "ollama chat");
        let response: ChatResponse = self.send(messages, tools, false).await?.json().await?;
        Ok(response
            .message
            .map(Message::from)
            .unwrap_or_else(|| Message::assistant("", vec![])))
    }

    async fn stream(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<MessageStream> {
        tracing::debug!(model = %self.config.model, messages = messages.len(), "ollama streaming chat");
        let response = self.send(messages, tools, true).await?;
        Ok(Box::pin(ndjson_messages(response)))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concat_messages;
    use serde_json::json;

    #[test]
    fn arguments_become_objects_on_the_wire() {
        let msg = Message::assistant(
            "",
            vec![ToolCall::new("call_0", "search_book", r#"{"genre":"mystery"}"#)],
        );
        let wire = serde_json::to_value(OllamaMessage::from(&msg)).unwrap();
        assert_eq!(wire["tool_calls"][0]["function"]["arguments"], json!({"genre": "mystery"}));

        let tool = Message::tool("[\"Dune\"]", "call_0", "search_book");
        let wire = serde_json::to_value(OllamaMessage::from(&tool)).unwrap();
        assert_eq!(wire["tool_name"], "search_book");
    }

    #[test]
    fn parses_stream_lines() {
        let (message, done) =
            parse_line(r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#, &mut 0).unwrap();
        assert_eq!(message.unwrap().content, "Hi");
        assert!(!done);

        let (_, done) =
            parse_line(r#"{"message":{"role":"assistant","content":""},"done":true}"#, &mut 0).unwrap();
        assert!(done);
    }

    #[test]
    fn tool_calls_get_ids_and_string_arguments() {
        let line = r#"{"message":{"role":"assistant","content":"",
            "tool_calls":[{"function":{"name":"multiply","arguments":{"a":2,"b":3}}}]},"done":true}"#;
        let (message, _) = parse_line(line, &mut 0).unwrap();
        let message = message.unwrap();
        assert_eq!(message.tool_calls[0].id, "call_0");
        let args: Value = serde_json::from_str(&message.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args, json!({"a": 2, "b": 3}));
    }

    #[test]
    fn calls_on_separate_lines_stay_separate() {
        let lines = [
            r#"{"message":{"role":"assistant","content":"",
                "tool_calls":[{"function":{"name":"search_flights","arguments":{"from":"Chengdu"}}}]},"done":false}"#,
            r#"{"message":{"role":"assistant","content":"",
                "tool_calls":[{"function":{"name":"search_hotels","arguments":{"city":"Beijing"}}}]},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        ];
        let mut next_call = 0;
        let chunks: Vec<Message> = lines
            .iter()
            .filter_map(|line| parse_line(line, &mut next_call).unwrap().0)
            .collect();

        let message = concat_messages(&chunks).unwrap();
        let calls: Vec<(&str, &str)> = message
            .tool_calls
            .iter()
            .map(|c| (c.id.as_str(), c.function.name.as_str()))
            .collect();
        assert_eq!(calls, vec![("call_0", "search_flights"), ("call_1", "search_hotels")]);
        assert_eq!(message.tool_calls[1].function.arguments, r#"{"city":"Beijing"}"#);
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let model = OllamaChatModel::new(OllamaConfig {
            base_url: "http://localhost:11434/".into(),
            model: "qwen2.5:7b".into(),
        });
        assert_eq!(model.endpoint(), "http://localhost:11434/api/chat");
        assert_eq!(model.model(), "qwen2.5:7b");
    }
}
