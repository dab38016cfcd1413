use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use agent_tour::config::ModelConfig;
use agent_tour::model::new_chat_model;
use agent_tour::prints::{RunSummary, print_all};
use agent_tour::runner::EventStream;
use agent_tour::trace::start_span;
use agent_tour::traits::ChatModel;

mod book;
mod chat;
mod cot;
mod helloworld;
mod instructions;
mod parallel;
mod plan;
mod prompt;
mod reflection;
mod sequential;
mod supervisor;

#[async_trait]
pub trait Demo: Send + Sync {
    /// Name used on the command line
    fn name(&self) -> &'static str;

    /// One line for `--list`
    fn description(&self) -> &'static str;

    /// Query used when none is given
    fn default_query(&self) -> &'static str {
        ""
    }

    async fn run(&self, query: &str) -> Result<()>;
}

/// Registers a demo at link time.
pub struct DemoFactory(pub fn() -> Box<dyn Demo>);

inventory::collect!(DemoFactory);

/// Every registered demo, ordered by name.
pub fn all() -> Vec<Box<dyn Demo>> {
    let mut demos: Vec<_> = inventory::iter::<DemoFactory>
        .into_iter()
        .map(|factory| (factory.0)())
        .collect();
    demos.sort_by_key(|demo| demo.name());
    demos
}

pub fn find(name: &str) -> Option<Box<dyn Demo>> {
    all().into_iter().find(|demo| demo.name() == name)
}

/// The chat model selected by the environment.
pub fn chat_model() -> Result<Arc<dyn ChatModel>> {
    let config = ModelConfig::from_env().context("model configuration")?;
    Ok(new_chat_model(&config)?)
}

/// Print a run's events inside a trace span named `name`.
pub async fn traced(name: &str, query: &str, events: EventStream) -> Result<RunSummary> {
    let span = start_span(name, query);
    let summary = print_all(events).await;
    let output = match &summary {
        Ok(summary) => summary
            .last_message
            .as_ref()
            .map(|m| m.content.clone())
            .unwrap_or_default(),
        Err(err) => err.to_string(),
    };
    span.end(&output);
    Ok(summary?)
}
