//! Console rendering of agent events.

use std::io::{self, Write};

use crate::runner::EventStream;
use crate::traits::{AgentAction, AgentEvent, MessageOutput};
use crate::{Message, Result, Role};

/// Prints events as they arrive. Stream deltas are written inline, with the
/// header shown once per streamed reply.
#[derive(Debug, Default)]
pub struct EventPrinter {
    in_stream: bool,
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print(&mut self, event: &AgentEvent) {
        let mut out = io::stdout().lock();
        if let Err(err) = self.write(&mut out, event) {
            tracing::debug!(error = %err, "stdout closed");
        }
    }

    pub fn write(&mut self, w: &mut impl Write, event: &AgentEvent) -> io::Result<()> {
        if let Some(err) = &event.err {
            self.close_stream(w)?;
            return writeln!(w, "error: {err}");
        }

        match &event.output {
            Some(MessageOutput::Chunk(chunk)) => {
                if !self.in_stream {
                    header(w, event)?;
                    write!(w, "answer: ")?;
                    self.in_stream = true;
                }
                write!(w, "{}", chunk.content)?;
                w.flush()?;
            }
            Some(MessageOutput::Done(message)) => {
                self.close_stream(w)?;
                tool_calls(w, message)?;
            }
            Some(MessageOutput::Message(message)) => {
                self.close_stream(w)?;
                header(w, event)?;
                body(w, message)?;
            }
            None => {}
        }

        if let Some(action) = &event.action {
            self.close_stream(w)?;
            match action {
                AgentAction::Exit => writeln!(w, "{}: action: exit", event.agent_name)?,
                AgentAction::BreakLoop => writeln!(w, "{}: action: break loop", event.agent_name)?,
                AgentAction::TransferToAgent(target) => {
                    writeln!(w, "{}: action: transfer to {target}", event.agent_name)?
                }
                AgentAction::Interrupted(info) => {
                    writeln!(w, "{}: action: interrupted, {info}", event.agent_name)?
                }
            }
        }
        Ok(())
    }

    fn close_stream(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.in_stream {
            self.in_stream = false;
            writeln!(w)?;
        }
        Ok(())
    }
}

fn header(w: &mut impl Write, event: &AgentEvent) -> io::Result<()> {
    writeln!(w, "name: {}\npath: {}", event.agent_name, event.run_path.join(" -> "))
}

fn body(w: &mut impl Write, message: &Message) -> io::Result<()> {
    match message.role {
        Role::Tool => writeln!(
            w,
            "tool response ({}): {}",
            message.name.as_deref().unwrap_or("?"),
            message.content
        ),
        _ => {
            if !message.content.is_empty() {
                writeln!(w, "answer: {}", message.content)?;
            }
            tool_calls(w, message)
        }
    }
}

fn tool_calls(w: &mut impl Write, message: &Message) -> io::Result<()> {
    for call in &message.tool_calls {
        writeln!(w, "tool call: {} {}", call.function.name, call.function.arguments)?;
    }
    Ok(())
}

/// Print one event with no stream bookkeeping.
pub fn print_event(event: &AgentEvent) {
    EventPrinter::new().print(event);
}

/// What a printed run ended with.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub last_message: Option<Message>,
    pub last_action: Option<AgentAction>,
}

/// Print every event of a run, stopping at the first error.
pub async fn print_all(mut events: EventStream) -> Result<RunSummary> {
    let mut printer = EventPrinter::new();
    let mut summary = RunSummary::default();
    while let Some(mut event) = events.next().await {
        printer.print(&event);
        if let Some(err) = event.err.take() {
            return Err(err);
        }
        if let Some(message) = event.message() {
            summary.last_message = Some(message.clone());
        }
        if let Some(action) = event.action {
            summary.last_action = Some(action);
        }
    }
    Ok(summary)
}
