//! Drives a root agent and hands its events to the caller as a stream.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::context::{RunContext, Session};
use crate::traits::{Agent, AgentAction, AgentEvent, AgentInput, ResumeInfo, ToolOptions};
use crate::{Error, Message, Result};

pub struct RunnerConfig {
    pub agent: Arc<dyn Agent>,
    pub enable_streaming: bool,
    pub checkpoint_store: Option<Arc<dyn CheckpointStore>>,
}

impl RunnerConfig {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        RunnerConfig {
            agent,
            enable_streaming: false,
            checkpoint_store: None,
        }
    }
}

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Where to save the checkpoint if the run is interrupted.
    pub checkpoint_id: Option<String>,
    /// Values visible to every tool through its `ToolContext`.
    pub tool_options: ToolOptions,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_id(mut self, id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(id.into());
        self
    }

    pub fn tool_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tool_options.insert(key.into(), value.into());
        self
    }
}

/// Events of one run, ending when the run does.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<AgentEvent>,
}

impl EventStream {
    pub async fn next(&mut self) -> Option<AgentEvent> {
        self.rx.recv().await
    }
}

impl Stream for EventStream {
    type Item = AgentEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<AgentEvent>> {
        self.rx.poll_recv(cx)
    }
}

pub struct Runner {
    agent: Arc<dyn Agent>,
    streaming: bool,
    store: Option<Arc<dyn CheckpointStore>>,
}

/// What a spawned run needs to wrap up.
struct RunHandle {
    agent: Arc<dyn Agent>,
    store: Option<Arc<dyn CheckpointStore>>,
    checkpoint_id: Option<String>,
    input: Vec<Message>,
    ctx: RunContext,
}

impl RunHandle {
    async fn finish(self, result: Result<Option<AgentAction>>) {
        let outcome = match result {
            Ok(Some(AgentAction::Interrupted(_))) => self.save_interrupt().await,
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            tracing::warn!(agent = self.agent.name(), error = %err, "run failed");
            self.ctx.emit(AgentEvent {
                agent_name: self.agent.name().to_string(),
                run_path: vec![self.agent.name().to_string()],
                err: Some(err),
                ..Default::default()
            });
        }
    }

    async fn save_interrupt(&self) -> Result<()> {
        let Some(state) = self.ctx.take_interrupt() else {
            return Err(Error::checkpoint("agent reported an interrupt without saving state"));
        };
        let (Some(store), Some(id)) = (&self.store, &self.checkpoint_id) else {
            tracing::warn!(agent = self.agent.name(), "interrupted without a checkpoint store; run cannot be resumed");
            return Ok(());
        };

        let checkpoint = Checkpoint {
            path: state.path,
            input: self.input.clone(),
            info: state.info,
            state: state.state,
            session: self.ctx.session_snapshot(),
        };
        store.set(id, checkpoint.encode()?).await?;
        tracing::info!(checkpoint = %id, "saved checkpoint");
        Ok(())
    }
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Runner {
            agent: config.agent,
            streaming: config.enable_streaming,
            store: config.checkpoint_store,
        }
    }

    /// Run with a single user message.
    pub fn query(&self, text: impl Into<String>, options: RunOptions) -> EventStream {
        self.run(vec![Message::user(text)], options)
    }

    pub fn run(&self, messages: Vec<Message>, options: RunOptions) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = RunContext::new(tx, self.streaming, Session::default(), options.tool_options);
        let handle = RunHandle {
            agent: Arc::clone(&self.agent),
            store: self.store.clone(),
            checkpoint_id: options.checkpoint_id,
            input: messages.clone(),
            ctx,
        };

        let span = tracing::info_span!("run", agent = self.agent.name());
        tokio::spawn(
            async move {
                let result = handle
                    .agent
                    .run(handle.ctx.clone(), AgentInput::new(messages))
                    .await;
                handle.finish(result).await;
            }
            .instrument(span),
        );
        EventStream { rx }
    }

    /// Continue the run saved under `checkpoint_id`. A further interrupt is
    /// saved under `options.checkpoint_id`, or the same id when unset.
    pub async fn resume(&self, checkpoint_id: &str, options: RunOptions) -> Result<EventStream> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::checkpoint("runner has no checkpoint store"))?;
        let bytes = store
            .get(checkpoint_id)
            .await?
            .ok_or_else(|| Error::checkpoint(format!("checkpoint `{checkpoint_id}` not found")))?;
        let checkpoint = Checkpoint::decode(&bytes)?;
        tracing::info!(checkpoint = %checkpoint_id, path = ?checkpoint.path, "resuming");

        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = RunContext::new(tx, self.streaming, checkpoint.session, options.tool_options);
        let info = ResumeInfo {
            path: VecDeque::from(checkpoint.path),
            state: checkpoint.state,
        };
        let handle = RunHandle {
            agent: Arc::clone(&self.agent),
            store: self.store.clone(),
            checkpoint_id: Some(options.checkpoint_id.unwrap_or_else(|| checkpoint_id.to_string())),
            input: checkpoint.input.clone(),
            ctx,
        };

        let span = tracing::info_span!("resume", agent = self.agent.name());
        tokio::spawn(
            async move {
                let input = AgentInput::new(handle.input.clone());
                let result = handle.agent.resume(handle.ctx.clone(), input, info).await;
                handle.finish(result).await;
            }
            .instrument(span),
        );
        Ok(EventStream { rx })
    }
}
