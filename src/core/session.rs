//! Ownership of the single live provider session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::chat_stream::{ChatSession, ModelProvider};
use crate::core::error::InitializationError;

/// When the persona instruction is recomputed from memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaRefresh {
    /// Compose once at startup and keep the session for the whole run.
    #[default]
    Startup,
    /// Reopen the session with a fresh instruction whenever a turn changes
    /// memory. Conversation history is carried into the new session.
    AfterMemoryChange,
}

impl PersonaRefresh {
    pub fn as_str(self) -> &'static str {
        match self {
            PersonaRefresh::Startup => "startup",
            PersonaRefresh::AfterMemoryChange => "after-memory-change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "startup" => Some(PersonaRefresh::Startup),
            "after-memory-change" => Some(PersonaRefresh::AfterMemoryChange),
            _ => None,
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn ModelProvider>,
    handle: Option<Box<dyn ChatSession>>,
    instruction: Option<String>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            handle: None,
            instruction: None,
        }
    }

    /// Opens a session seeded with `instruction`, replacing the current one.
    ///
    /// On failure the previous handle (if any) stays live.
    pub async fn open(&mut self, instruction: &str) -> Result<(), InitializationError> {
        let history = self
            .handle
            .as_ref()
            .map(|handle| handle.history())
            .unwrap_or_default();
        let carried = history.len();

        let handle = self.provider.open(instruction, history).await?;
        self.handle = Some(handle);
        self.instruction = Some(instruction.to_string());
        debug!(carried_messages = carried, "session handle replaced");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle_mut(&mut self) -> Option<&mut (dyn ChatSession + 'static)> {
        self.handle.as_deref_mut()
    }

    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }
}
