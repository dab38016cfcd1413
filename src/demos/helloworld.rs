use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::ChatModelAgent;
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};

use super::{Demo, DemoFactory, chat_model};

inventory::submit! {
    DemoFactory(|| Box::new(HelloWorld))
}

pub struct HelloWorld;

#[async_trait]
impl Demo for HelloWorld {
    fn name(&self) -> &'static str {
        "helloworld"
    }

    fn description(&self) -> &'static str {
        "A friendly greeting agent, streamed"
    }

    fn default_query(&self) -> &'static str {
        "Hello, please introduce yourself"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let agent = ChatModelAgent::new("hello-agent", chat_model()?)
            .description("A friendly greeting assistant")
            .instruction("You are a friendly assistant. Please respond to the user in a warm tone.");

        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(agent))
        });

        let mut events = runner.query(query, RunOptions::new());
        while let Some(event) = events.next().await {
            if let Some(err) = &event.err {
                tracing::error!(error = %err, "run failed");
                break;
            }
            if let Some(message) = event.message() {
                println!("Agent: {}", message.content);
            }
        }
        Ok(())
    }
}
