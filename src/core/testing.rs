//! In-process collaborators for exercising the conversation core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::api::ChatMessage;
use crate::core::chat_stream::{ChatSession, ModelProvider, StreamMessage, StreamReceiver};
use crate::core::error::{InitializationError, StreamError};
use crate::core::message::Role;
use crate::core::speech::SpeechOutput;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Chunk(String),
    Fail(StreamError),
}

impl From<&str> for ScriptStep {
    fn from(chunk: &str) -> Self {
        ScriptStep::Chunk(chunk.to_string())
    }
}

type Shared<T> = Arc<Mutex<T>>;

fn locked<T>(shared: &Shared<T>) -> std::sync::MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replays one scripted response per `send_stream` call.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    turns: Shared<VecDeque<Vec<ScriptStep>>>,
    opened: Shared<Vec<(String, Vec<ChatMessage>)>>,
    fail_open: bool,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns.into())),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Instruction and carried history of every opened session.
    pub fn opened(&self) -> Vec<(String, Vec<ChatMessage>)> {
        locked(&self.opened).clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn open(
        &self,
        instruction: &str,
        history: Vec<ChatMessage>,
    ) -> Result<Box<dyn ChatSession>, InitializationError> {
        if self.fail_open {
            return Err(InitializationError::Rejected {
                status: 401,
                body: "API Error: invalid api key".to_string(),
            });
        }
        locked(&self.opened).push((instruction.to_string(), history.clone()));
        Ok(Box::new(ScriptedSession {
            turns: Arc::clone(&self.turns),
            history,
        }))
    }
}

struct ScriptedSession {
    turns: Shared<VecDeque<Vec<ScriptStep>>>,
    history: Vec<ChatMessage>,
}

impl ChatSession for ScriptedSession {
    fn send_stream(&mut self, text: &str) -> StreamReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let steps = locked(&self.turns).pop_front().unwrap_or_default();

        let mut full = String::new();
        for step in steps {
            match step {
                ScriptStep::Chunk(chunk) => {
                    full.push_str(&chunk);
                    let _ = tx.send(StreamMessage::Chunk(chunk));
                }
                ScriptStep::Fail(err) => {
                    let _ = tx.send(StreamMessage::Error(err));
                    return rx;
                }
            }
        }

        self.history
            .push(ChatMessage::new(Role::User.to_api_role(), text));
        self.history
            .push(ChatMessage::new(Role::Model.to_api_role(), full));
        let _ = tx.send(StreamMessage::End);
        rx
    }

    fn history(&self) -> Vec<ChatMessage> {
        self.history.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Spoke(String),
    Cancelled,
}

/// Records speech calls instead of playing them.
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    events: Shared<Vec<SpeechEvent>>,
}

impl RecordingSpeaker {
    pub fn events(&self) -> Vec<SpeechEvent> {
        locked(&self.events).clone()
    }
}

impl SpeechOutput for RecordingSpeaker {
    fn speak(&mut self, text: &str) {
        locked(&self.events).push(SpeechEvent::Spoke(text.to_string()));
    }

    fn cancel(&mut self) {
        locked(&self.events).push(SpeechEvent::Cancelled);
    }
}
