use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::ChatModelAgent;
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::traits::ChatModel;

use super::instructions::system_prompt;
use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(ChainOfThought))
}

const ROLE: &str = "You are an AI assistant working for an online florist. Your goal is to help \
customers make informed flower purchases based on their preferences.";

const COT_TEMPLATE: &str = "As an AI assistant for an online florist, my goal is to help customers make \
informed decisions based on their preferences.

I will think step by step: first understand the customer's needs, then consider what different flowers \
mean, and finally give a recommendation based on that need. I will also explain why I recommend it.

Example 1:
Human: I want a flower that symbolizes love.
AI: First, I understand you are looking for a flower that symbolizes love. In many cultures red roses \
are seen as the symbol of love, because their red color is associated with passion and strong feelings. \
With that in mind, I recommend red roses. They symbolize love and also convey the strong emotion you \
are looking for.

Example 2:
Human: I want some unique and exotic flowers.
AI: From your request, I understand you want flowers that are one of a kind and eye-catching. Orchids \
are unique and brightly colored, and in many places they are seen as a symbol of luxury and beauty. \
So I suggest orchids. They meet your wish for something unique and exotic, and their beauty and the \
strength and luxury they represent may appeal to you as well.";

pub fn florist(model: Arc<dyn ChatModel>) -> ChatModelAgent {
    ChatModelAgent::new("florist", model)
        .description(ROLE)
        .instruction(system_prompt(ROLE, &[COT_TEMPLATE], true))
}

pub struct ChainOfThought;

#[async_trait]
impl Demo for ChainOfThought {
    fn name(&self) -> &'static str {
        "cot"
    }

    fn description(&self) -> &'static str {
        "Chain-of-thought florist assistant with few-shot examples"
    }

    fn default_query(&self) -> &'static str {
        "I want to buy some flowers for my sweetheart. She likes pink and purple. Any suggestions?"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(florist(chat_model()?)))
        });
        traced("cot", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
