use anyhow::Result;
use async_trait::async_trait;

use agent_tour::prompt::{ChatTemplate, MessagePart};
use agent_tour::{Message, vars};

use super::{Demo, DemoFactory};

inventory::submit! {
    DemoFactory(|| Box::new(Prompt))
}

const SYSTEM: &str = "You are an emotional-support assistant. Based on the user's input, write a few \
lines of graceful, rhythmic praise that shows real care.
Nickname: {user_nickname}
Age: {user_age}
Gender: {user_gender}
Hobby: {user_hobby}";

pub struct Prompt;

fn render(query: &str) -> Result<Vec<Message>> {
    let template = ChatTemplate::from_messages(vec![
        MessagePart::system(SYSTEM),
        MessagePart::placeholder("message_histories", true),
        MessagePart::user("{user_query}"),
    ]);
    let vars = vars! {
        "user_nickname" => "John Doe",
        "user_age" => 30,
        "user_gender" => "male",
        "user_hobby" => "reading",
        "message_histories" => vec![
            Message::user("I like playing piano"),
            Message::assistant("You are a talented musician!", vec![]),
        ],
        "user_query" => query,
    };
    Ok(template.format(&vars)?)
}

#[async_trait]
impl Demo for Prompt {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn description(&self) -> &'static str {
        "Render a system template with profile variables and history"
    }

    fn default_query(&self) -> &'static str {
        "Please improvise a poem for me"
    }

    async fn run(&self, query: &str) -> Result<()> {
        let messages = render(query)?;
        tracing::info!("rendered messages:");
        for message in &messages {
            tracing::info!("- {message}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_profile_and_keeps_history() {
        let messages = render("a poem please").unwrap();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].content.contains("Age: 30"));
        assert_eq!(messages[1].content, "I like playing piano");
        assert_eq!(messages[3].content, "a poem please");
    }
}
