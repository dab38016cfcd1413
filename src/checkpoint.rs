//! Persisted interrupt state, keyed by a caller-chosen checkpoint id.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Session;
use crate::{Error, Message, Result};

/// Everything needed to resume an interrupted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Agent names from the root down to the agent that paused.
    pub path: Vec<String>,
    /// Input the interrupted run started from.
    pub input: Vec<Message>,
    pub info: String,
    pub state: Value,
    pub session: Session,
}

impl Checkpoint {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|err| Error::checkpoint(format!("corrupt checkpoint: {err}")))
    }
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, id: &str, data: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(id).cloned())
    }

    async fn set(&self, id: &str, data: Vec<u8>) -> Result<()> {
        self.entries.lock().insert(id.to_string(), data);
        Ok(())
    }
}
