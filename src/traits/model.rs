use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::{Message, Result};
use crate::traits::ToolInfo;

/// Stream of message deltas; fold them with [`crate::concat_messages`].
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation and wait for the complete reply
    async fn generate(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<Message>;

    /// Send the conversation and stream the reply as it is produced
    async fn stream(&self, messages: &[Message], tools: &[ToolInfo]) -> Result<MessageStream>;

    /// Model identifier sent to the provider
    fn model(&self) -> &str;
}
