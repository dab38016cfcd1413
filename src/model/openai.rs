//! OpenAI-compatible chat completions (OpenAI, Azure OpenAI, and look-alikes)

use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{check_status, lines};
use crate::config::OpenAiConfig;
use crate::traits::{ChatModel, MessageStream, ToolDefinition, ToolInfo};
use crate::{Error, FunctionCall, Message, Result, Role, ToolCall};

pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a FunctionCall,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Default)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ResponseFunction>,
}

#[derive(Deserialize, Default)]
struct ResponseFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ResponseMessage,
}

impl From<ResponseMessage> for Message {
    fn from(resp: ResponseMessage) -> Self {
        let tool_calls = resp
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let function = call.function.unwrap_or_default();
                ToolCall {
                    id: call.id.unwrap_or_default(),
                    index: call.index,
                    function: FunctionCall {
                        name: function.name.unwrap_or_default(),
                        arguments: function.arguments.unwrap_or_default(),
                    },
                }
            })
            .collect();
        Message::assistant(resp.content.unwrap_or_default(), tool_calls)
    }
}

fn to_wire(messages: &[Message]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|msg| WireMessage {
            role: msg.role.as_str(),
            content: if msg.content.is_empty() && msg.has_tool_calls() {
                None
            } else {
                Some(msg.content.as_str())
            },
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: &call.id,
                    kind: "function",
                    function: &call.function,
                })
                .collect(),
            tool_call_id: msg.tool_call_id.as_deref(),
            name: if msg.role == Role::Tool { None } else { msg.name.as_deref() },
        })
        .collect()
}

/// Decode one server-sent event line.
fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    let chunk: StreamChunk = serde_json::from_str(data)?;
    match chunk.choices.into_iter().next() {
        Some(choice) => Ok(SseLine::Delta(choice.delta.into())),
        None => Ok(SseLine::Skip),
    }
}

fn sse_messages(response: reqwest::Response) -> impl Stream<Item = Result<Message>> + Send {
    try_stream! {
        let lines = lines(response);
        futures_util::pin_mut!(lines);
        while let Some(line) = lines.next().await {
            match parse_sse_line(&line?)? {
                SseLine::Delta(message) => {
                    yield message;
                }
                SseLine::Done => break,
                SseLine::Skip => {}
            }
        }
    }
}

#[derive(Debug)]
enum SseLine {
    Delta(Message),
    Done,
    Skip,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::config("OpenAI API key cannot be empty"));
        }
        Ok(OpenAiChatModel {
            client: Client::new(),
            config,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if self.config.by_azure {
            format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                self.config.model, self.config.api_version
            )
        } else {
            format!("{base}/chat/completions")
        }
    }

    fn request(&self, body: &ChatRequest<'_>) -> RequestBuilder {
        let builder = self.client.post(self.endpoint()).json(body);
        if self.config.by_azure {
            builder.header("api-key", &self.config.api_key)
        } else {
            builder.bearer_auth(&self.config.api_key)
        }
    }

    fn body<'a>(&'a self, messages: &'a [Message], tools: &[ToolInfo], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: to_wire(messages),
            stream,
            tools: tools.iter().map(ToolDefinition::from).collect(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn generate(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<Message> {
        tracing::debug!(model = %self.config.model, messages = messages.len(), "chat completion");
        let body = self.body(messages, tools, false);
        let response = check_status(self.request(&body).send().await?).await?;
        let response: ChatResponse = response.json().await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::parse("no choices in response"))?;
        Ok(choice.message.into())
    }

    async fn stream(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<MessageStream> {
        tracing::debug!(model = %self.config.model, messages = messages.len(), "streaming chat completion");
        let body = self.body(messages, tools, true);
        let response = check_status(self.request(&body).send().await?).await?;

        Ok(Box::pin(sse_messages(response)))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(by_azure: bool) -> OpenAiConfig {
        OpenAiConfig {
            api_key: "sk-test".into(),
            model: "gpt-4o".into(),
            base_url: "https://example.com/v1/".into(),
            by_azure,
            api_version: "2024-06-01".into(),
        }
    }

    #[test]
    fn endpoint_depends_on_azure_flag() {
        let model = OpenAiChatModel::new(config(false)).unwrap();
        assert_eq!(model.endpoint(), "https://example.com/v1/chat/completions");

        let model = OpenAiChatModel::new(config(true)).unwrap();
        assert_eq!(
            model.endpoint(),
            "https://example.com/v1/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut cfg = config(false);
        cfg.api_key.clear();
        assert!(OpenAiChatModel::new(cfg).is_err());
    }

    #[test]
    fn wire_messages_carry_tool_calls() {
        let messages = vec![
            Message::assistant("", vec![ToolCall::new("call_1", "search", r#"{"query":"gdp"}"#)]),
            Message::tool("GDP was $23T", "call_1", "search"),
        ];
        let json = serde_json::to_value(to_wire(&messages)).unwrap();
        assert!(json[0]["content"].is_null());
        assert_eq!(json[0]["tool_calls"][0]["type"], "function");
        assert_eq!(json[0]["tool_calls"][0]["function"]["arguments"], r#"{"query":"gdp"}"#);
        assert_eq!(json[1]["role"], "tool");
        assert_eq!(json[1]["tool_call_id"], "call_1");
    }

    #[test]
    fn parses_response_tool_calls() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null,
            "tool_calls":[{"id":"call_7","type":"function",
            "function":{"name":"multiply","arguments":"{\"a\":2,\"b\":3}"}}]}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let message: Message = response.choices.into_iter().next().unwrap().message.into();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_calls[0].id, "call_7");
        assert_eq!(message.tool_calls[0].function.name, "multiply");
    }

    #[test]
    fn parses_sse_lines() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        match parse_sse_line(line).unwrap() {
            SseLine::Delta(m) => assert_eq!(m.content, "Hel"),
            other => panic!("unexpected line: {other:?}"),
        }
        assert!(matches!(parse_sse_line("data: [DONE]").unwrap(), SseLine::Done));
        assert!(matches!(parse_sse_line(": keep-alive").unwrap(), SseLine::Skip));
        assert!(parse_sse_line("data: {not json").is_err());
    }
}
