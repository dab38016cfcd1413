//! Tracing setup and a small span helper for demos that trace one request.

use std::time::Instant;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the fmt subscriber. `RUST_LOG` wins over `verbose` when set.
pub fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match verbose {
            0 => "info",
            1 => "agent_tour=debug",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(directive)
    });

    // A second install (tests, nested demos) is harmless.
    let _ = fmt()
        .without_time()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .try_init();
}

/// An open span; record its output with [`SpanHandle::end`].
#[derive(Debug)]
pub struct SpanHandle {
    span: Span,
    started: Instant,
}

pub fn start_span(name: &str, input: &str) -> SpanHandle {
    let span = tracing::info_span!("trace", name = %name);
    span.in_scope(|| tracing::info!(input, "span started"));
    SpanHandle {
        span,
        started: Instant::now(),
    }
}

impl SpanHandle {
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn end(self, output: &str) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.span
            .in_scope(|| tracing::info!(output, elapsed_ms, "span ended"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_can_be_ended_without_subscriber() {
        let handle = start_span("helloworld", "Hello, please introduce yourself.");
        let _entered = handle.span().clone().entered();
        handle.end("I am a helpful assistant.");
    }
}
