use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::{ChatModelAgent, ParallelAgent};
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::traits::{Agent, ChatModel};

use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(Parallel))
}

/// (name, description, instruction) for each collector.
const COLLECTORS: [(&str, &str, &str); 3] = [
    (
        "StockDataCollectionAgent",
        "Gathers real-time and historical stock market data: prices, trading volumes, market trends and financial indicators.",
        "You are a Stock Data Collection Agent. Your role is to:
- Collect accurate and up-to-date stock market data from trusted sources.
- Retrieve information such as stock prices, trading volumes, historical trends, and relevant financial indicators.
- Ensure data completeness and reliability.
- Format the collected data clearly for further analysis or user queries.",
    ),
    (
        "NewsDataCollectionAgent",
        "Aggregates timely and relevant news articles and updates from multiple reputable news outlets.",
        "You are a News Data Collection Agent. Your responsibilities include:
- Aggregating news articles and updates from diverse and credible news sources.
- Filtering and organizing news based on relevance, timeliness, and user interests.
- Providing summaries or full content as required.
- Presenting information in a clear, concise, and unbiased manner.",
    ),
    (
        "SocialMediaInformationCollectionAgent",
        "Gathers user-generated content, trends, sentiments and discussions from social media platforms.",
        "You are a Social Media Information Collection Agent. Your tasks are to:
- Collect relevant and up-to-date information from multiple social media platforms.
- Monitor trends, user sentiments, and public discussions related to specified topics.
- Organize and summarize the information to highlight key insights.
- Provide clear and objective reports based on the social media data.",
    ),
];

pub fn data_collection_agent(model: Arc<dyn ChatModel>) -> ParallelAgent {
    let sub_agents: Vec<Arc<dyn Agent>> = COLLECTORS
        .iter()
        .map(|(name, description, instruction)| {
            Arc::new(
                ChatModelAgent::new(*name, model.clone())
                    .description(*description)
                    .instruction(*instruction),
            ) as Arc<dyn Agent>
        })
        .collect();

    ParallelAgent::new(
        "DataCollectionAgent",
        "Collects stock, news and social media information at the same time.",
        sub_agents,
    )
}

pub struct Parallel;

#[async_trait]
impl Demo for Parallel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn description(&self) -> &'static str {
        "Stock, news and social-media collectors run concurrently"
    }

    fn default_query(&self) -> &'static str {
        "Analyze the development and risks of Ping An Insurance stock."
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(data_collection_agent(chat_model()?)))
        });
        traced("DataCollectionAgent", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}
