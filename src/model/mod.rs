//! Chat model providers

mod ollama;
mod openai;

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};

use crate::config::ModelConfig;
use crate::traits::ChatModel;
use crate::{Error, Result};

pub use ollama::OllamaChatModel;
pub use openai::OpenAiChatModel;

/// Build the chat model selected by configuration.
pub fn new_chat_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>> {
    match config {
        ModelConfig::OpenAi(cfg) => Ok(Arc::new(OpenAiChatModel::new(cfg.clone())?)),
        ModelConfig::Ollama(cfg) => Ok(Arc::new(OllamaChatModel::new(cfg.clone()))),
    }
}

/// Fail with the response body when the status is not a success.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api { status, body })
}

/// Split a streaming body into trimmed, non-empty lines.
fn lines(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut bytes = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }
        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    }
}
