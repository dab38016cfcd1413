//! Chat templates rendered with `{name}` style placeholders.

use std::collections::HashMap;

use crate::{Error, Message, Result, Role};

/// A value bound to a template variable.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    Text(String),
    Messages(Vec<Message>),
}

pub type Variables = HashMap<String, TemplateValue>;

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::Text(value)
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<i32> for TemplateValue {
    fn from(value: i32) -> Self {
        TemplateValue::Text(value.to_string())
    }
}

impl From<Vec<Message>> for TemplateValue {
    fn from(value: Vec<Message>) -> Self {
        TemplateValue::Messages(value)
    }
}

/// Build a [`Variables`] map from `key => value` pairs.
#[macro_export]
macro_rules! vars {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::prompt::Variables::new();
        $(map.insert($key.to_string(), $crate::prompt::TemplateValue::from($value));)*
        map
    }};
}

#[derive(Debug, Clone)]
pub enum MessagePart {
    Template { role: Role, text: String },
    /// Expands to the message list bound to `key`.
    Placeholder { key: String, optional: bool },
}

impl MessagePart {
    pub fn system(text: impl Into<String>) -> Self {
        MessagePart::Template { role: Role::System, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        MessagePart::Template { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        MessagePart::Template { role: Role::Assistant, text: text.into() }
    }

    pub fn placeholder(key: impl Into<String>, optional: bool) -> Self {
        MessagePart::Placeholder { key: key.into(), optional }
    }
}

#[derive(Debug, Clone)]
pub struct ChatTemplate {
    parts: Vec<MessagePart>,
}

impl ChatTemplate {
    pub fn from_messages(parts: Vec<MessagePart>) -> Self {
        ChatTemplate { parts }
    }

    pub fn format(&self, vars: &Variables) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for part in &self.parts {
            match part {
                MessagePart::Template { role, text } => {
                    let content = render(text, |key| match vars.get(key) {
                        Some(TemplateValue::Text(s)) => Some(s.clone()),
                        _ => None,
                    })?;
                    messages.push(Message::new(*role, content));
                }
                MessagePart::Placeholder { key, optional } => match vars.get(key) {
                    Some(TemplateValue::Messages(list)) => messages.extend(list.iter().cloned()),
                    Some(TemplateValue::Text(_)) => {
                        return Err(Error::Template(format!(
                            "placeholder `{key}` expects a message list"
                        )));
                    }
                    None if *optional => {}
                    None => {
                        return Err(Error::Template(format!(
                            "missing messages for placeholder `{key}`"
                        )));
                    }
                },
            }
        }
        Ok(messages)
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Strict FString rendering: `{{`/`}}` are escapes, every `{name}` must resolve.
pub fn render(text: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) if is_ident(ch) => key.push(ch),
                        _ => {
                            return Err(Error::Template(format!(
                                "malformed placeholder near `{{{key}`"
                            )));
                        }
                    }
                }
                let value = lookup(&key)
                    .ok_or_else(|| Error::Template(format!("missing variable `{key}`")))?;
                out.push_str(&value);
            }
            '}' => return Err(Error::Template("single `}` in template".into())),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Substitute `{name}` for known keys and leave everything else untouched.
pub fn render_lenient(text: &str, values: &HashMap<String, String>) -> String {
    if values.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find(|c: char| !is_ident(c));
        match end {
            Some(end) if end > 0 && after[end..].starts_with('}') => {
                let key = &after[..end];
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + end + 2]),
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encouragement_template() -> ChatTemplate {
        ChatTemplate::from_messages(vec![
            MessagePart::system("You are a {role}. Please respond in a {style} tone."),
            MessagePart::placeholder("chat_history", true),
            MessagePart::user("Question: {question}"),
        ])
    }

    #[test]
    fn format_expands_history_placeholder() {
        let vars = vars! {
            "role" => "Programmer Encouragement Assistant",
            "style" => "positive, warm, and professional",
            "question" => "My code keeps throwing errors. What should I do?",
            "chat_history" => vec![Message::user("Hi"), Message::assistant("Hey!", vec![])],
        };
        let messages = encouragement_template().format(&vars).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[0].content,
            "You are a Programmer Encouragement Assistant. Please respond in a positive, warm, and professional tone."
        );
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "Question: My code keeps throwing errors. What should I do?");
    }

    #[test]
    fn optional_placeholder_may_be_absent() {
        let vars = vars! { "role" => "poet", "style" => "calm", "question" => "why?" };
        let messages = encouragement_template().format(&vars).unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn required_placeholder_must_be_present() {
        let template = ChatTemplate::from_messages(vec![MessagePart::placeholder("history", false)]);
        assert!(template.format(&Variables::new()).is_err());
    }

    #[test]
    fn missing_variable_is_an_error() {
        let vars = vars! { "role" => "poet" };
        let err = encouragement_template().format(&vars).unwrap_err();
        assert!(err.to_string().contains("style"));
    }

    #[test]
    fn integers_and_escapes_render() {
        let out = render("age {{years}}: {age}", |k| (k == "age").then(|| 30.to_string())).unwrap();
        assert_eq!(out, "age {years}: 30");
    }

    #[test]
    fn lenient_render_keeps_unknown_and_json() {
        let mut values = HashMap::new();
        values.insert("Plan".to_string(), "1. read".to_string());
        let text = "plan:\n{Plan}\nformat: {\"steps\": []} and {unknown}";
        assert_eq!(
            render_lenient(text, &values),
            "plan:\n1. read\nformat: {\"steps\": []} and {unknown}"
        );
    }
}
