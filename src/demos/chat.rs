use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;

use agent_tour::prompt::{ChatTemplate, MessagePart};
use agent_tour::{Message, vars};

use super::{Demo, DemoFactory, chat_model};

inventory::submit! {
    DemoFactory(|| Box::new(Chat))
}

pub struct Chat;

fn template() -> ChatTemplate {
    ChatTemplate::from_messages(vec![
        MessagePart::system(
            "You are a {role}. Please respond in a {style} tone. Your goal is to keep developers \
             positive and optimistic while offering technical advice and caring about their mental well-being.",
        ),
        MessagePart::placeholder("chat_history", true),
        MessagePart::user("Question: {question}"),
    ])
}

fn messages(question: &str) -> Result<Vec<Message>> {
    let history = vec![
        Message::user("Hi"),
        Message::assistant(
            "Hey! I'm your encouragement assistant! Remember, every great engineer grows through debugging. How can I help?",
            vec![],
        ),
        Message::user("I think my code is terrible"),
        Message::assistant(
            "Every developer feels that way at times! What matters is continuous learning and improvement. \
             Let's review the code together. Code quality improves with continuous effort.",
            vec![],
        ),
    ];
    let vars = vars! {
        "role" => "Programmer Encouragement Assistant",
        "style" => "positive, warm, and professional",
        "question" => question,
        "chat_history" => history,
    };
    Ok(template().format(&vars)?)
}

#[async_trait]
impl Demo for Chat {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn description(&self) -> &'static str {
        "Render a chat template, then generate and stream a reply"
    }

    fn default_query(&self) -> &'static str {
        "My code keeps throwing errors and I feel frustrated. What should I do?"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let messages = messages(query)?;
        tracing::info!(count = messages.len(), "rendered messages");

        let model = chat_model()?;
        tracing::info!(model = model.model(), "created chat model");

        let result = model.generate(&messages, &[]).await?;
        tracing::info!(content = %result.content, "generate");

        let mut stream = model.stream(&messages, &[]).await?;
        let mut index = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            tracing::info!(index, content = %chunk.content, "stream chunk");
            index += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_tour::Role;

    #[test]
    fn history_sits_between_system_and_question() {
        let rendered = messages("What should I do?").unwrap();
        assert_eq!(rendered.len(), 6);
        assert_eq!(rendered[0].role, Role::System);
        assert!(rendered[0].content.starts_with("You are a Programmer Encouragement Assistant."));
        assert_eq!(rendered[5].content, "Question: What should I do?");
    }
}
