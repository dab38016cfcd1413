use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use agent_tour::agents::ChatModelAgent;
use agent_tour::runner::{RunOptions, Runner, RunnerConfig};
use agent_tour::traits::ChatModel;

use super::{Demo, DemoFactory, chat_model, traced};

inventory::submit! {
    DemoFactory(|| Box::new(Instructions))
}

/// Description first, then each instruction line, then the output format.
pub fn system_prompt(description: &str, instructions: &[&str], markdown: bool) -> String {
    let mut prompt = format!("{description}\n");
    if !instructions.is_empty() {
        prompt.push_str("\n<instructions>\n");
        for line in instructions {
            prompt.push_str(&format!("- {line}\n"));
        }
        prompt.push_str("</instructions>\n");
    }
    if markdown {
        prompt.push_str("\n<additional_information>\n- Use markdown to format your answers.\n</additional_information>\n");
    }
    prompt
}

pub fn storyteller(model: Arc<dyn ChatModel>) -> ChatModelAgent {
    let description = "You are a famous short story writer asked to write for a magazine";
    ChatModelAgent::new("storyteller", model)
        .description(description)
        .instruction(system_prompt(
            description,
            &["You are a pilot on a plane flying from Hawaii to China."],
            true,
        ))
}

pub struct Instructions;

#[async_trait]
impl Demo for Instructions {
    fn name(&self) -> &'static str {
        "instructions"
    }

    fn description(&self) -> &'static str {
        "A storyteller with a description and extra instruction lines, streamed"
    }

    fn default_query(&self) -> &'static str {
        "Tell me a 2 sentence horror story."
    }

    async fn run(&self, query: &str) -> Result<()> {
        let runner = Runner::new(RunnerConfig {
            enable_streaming: true,
            ..RunnerConfig::new(Arc::new(storyteller(chat_model()?)))
        });
        traced("instructions", query, runner.query(query, RunOptions::new())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_instructions_and_markdown_hint() {
        let prompt = system_prompt("You write stories", &["Keep it short"], true);
        assert!(prompt.starts_with("You write stories\n"));
        assert!(prompt.contains("<instructions>\n- Keep it short\n</instructions>"));
        assert!(prompt.contains("Use markdown"));

        let plain = system_prompt("You write stories", &[], false);
        assert_eq!(plain, "You write stories\n");
    }
}
