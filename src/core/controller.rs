//! The conversation controller: owns the message log and drives turns.
//!
//! One turn may be in flight at a time. [`ConversationController::send_message`]
//! starts a turn and hands back its stream; every message from that stream
//! goes through [`ConversationController::apply`], in arrival order, until a
//! terminal update comes back. Submissions made while a turn is in flight are
//! dropped, not queued.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::chat_stream::{ModelProvider, StreamMessage, StreamReceiver};
use crate::core::directive;
use crate::core::error::{InitializationError, StreamError};
use crate::core::memory::{Memory, MemoryEntry, MemoryStore};
use crate::core::message::{Message, MessageId, MessageIdGenerator, Role, GREETING_MESSAGE_ID};
use crate::core::persona::PromptComposer;
use crate::core::session::{PersonaRefresh, SessionManager};
use crate::core::speech::SpeechOutput;
use crate::core::storage::{BlobStore, SpeechPreference};
use crate::core::stream::TurnAccumulator;

pub const GREETING: &str = "Hey bestie! ✨ What's on your mind today? Tell me everything!";
pub const APOLOGY: &str = "Oops! Something went wrong. Maybe try asking again?";
pub const INIT_FAILURE: &str =
    "Failed to initialize chat session. Please check your API key and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacedErrorKind {
    Initialization,
    Stream,
}

/// An error the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacedError {
    pub kind: SurfacedErrorKind,
    /// Friendly text for the transcript or status line.
    pub message: String,
    /// Underlying cause, for `--verbose` style output.
    pub detail: String,
}

/// Result of applying one stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// No turn was in flight; the message was dropped.
    Ignored,
    Chunk {
        message_id: MessageId,
    },
    Completed {
        message_id: MessageId,
        remembered: Vec<MemoryEntry>,
    },
    Failed {
        message_id: MessageId,
        error: StreamError,
    },
}

impl TurnUpdate {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnUpdate::Completed { .. } | TurnUpdate::Failed { .. })
    }

    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            TurnUpdate::Ignored => None,
            TurnUpdate::Chunk { message_id }
            | TurnUpdate::Completed { message_id, .. }
            | TurnUpdate::Failed { message_id, .. } => Some(message_id),
        }
    }
}

struct ActiveTurn {
    placeholder: MessageId,
    accumulator: TurnAccumulator,
}

pub struct ConversationController {
    messages: Vec<Message>,
    ids: MessageIdGenerator,
    sessions: SessionManager,
    composer: PromptComposer,
    blobs: Arc<dyn BlobStore>,
    memory: Option<MemoryStore>,
    speech: Box<dyn SpeechOutput>,
    speech_enabled: bool,
    persona_refresh: PersonaRefresh,
    turn: Option<ActiveTurn>,
    error: Option<SurfacedError>,
}

impl ConversationController {
    /// Reads the persisted speech flag; memory is loaded by
    /// [`ConversationController::initialize`].
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        blobs: Arc<dyn BlobStore>,
        speech: Box<dyn SpeechOutput>,
    ) -> Self {
        let speech_enabled = SpeechPreference::load(blobs.as_ref());
        Self {
            messages: Vec::new(),
            ids: MessageIdGenerator::default(),
            sessions: SessionManager::new(provider),
            composer: PromptComposer::default(),
            blobs,
            memory: None,
            speech,
            speech_enabled,
            persona_refresh: PersonaRefresh::default(),
            turn: None,
            error: None,
        }
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_persona_refresh(mut self, persona_refresh: PersonaRefresh) -> Self {
        self.persona_refresh = persona_refresh;
        self
    }

    /// Loads memory, opens the session and seeds the greeting.
    ///
    /// A failure is recorded as a surfaced error and the controller stays
    /// without a session: every later `send_message` is a no-op.
    pub async fn initialize(&mut self) -> Result<(), InitializationError> {
        if self.sessions.is_open() {
            return Ok(());
        }

        let store = MemoryStore::load(Arc::clone(&self.blobs));
        let instruction = self.composer.compose(store.memory());
        self.memory = Some(store);

        if let Err(err) = self.sessions.open(&instruction).await {
            warn!(error = %err, "chat session initialization failed");
            self.error = Some(SurfacedError {
                kind: SurfacedErrorKind::Initialization,
                message: INIT_FAILURE.to_string(),
                detail: err.to_string(),
            });
            return Err(err);
        }

        self.messages.push(Message::new(
            MessageId::new(GREETING_MESSAGE_ID),
            Role::Model,
            GREETING,
        ));
        info!("conversation initialized");
        Ok(())
    }

    /// Starts a turn. Returns `None` (and changes nothing) when a turn is
    /// already in flight, no session exists, or `text` is blank.
    pub fn send_message(&mut self, text: &str) -> Option<StreamReceiver> {
        if self.turn.is_some() {
            debug!("turn in flight, dropping submission");
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let handle = self.sessions.handle_mut()?;
        let rx = handle.send_stream(text);

        self.error = None;
        let user_id = self.ids.next_id();
        self.messages.push(Message::new(user_id, Role::User, text));

        let placeholder = self.ids.next_id();
        self.messages
            .push(Message::new(placeholder.clone(), Role::Model, String::new()));
        self.turn = Some(ActiveTurn {
            placeholder,
            accumulator: TurnAccumulator::new(),
        });
        Some(rx)
    }

    /// Applies one message from the in-flight turn's stream.
    pub async fn apply(&mut self, message: StreamMessage) -> TurnUpdate {
        match message {
            StreamMessage::Chunk(chunk) => self.apply_chunk(&chunk),
            StreamMessage::End => self.complete_turn().await,
            StreamMessage::Error(err) => self.fail_turn(err),
        }
    }

    /// Sends `text` and drives its stream to completion, calling `on_update`
    /// with the placeholder message after every change.
    pub async fn run_turn<F>(&mut self, text: &str, mut on_update: F) -> Option<TurnUpdate>
    where
        F: FnMut(&Message),
    {
        let mut rx = self.send_message(text)?;
        loop {
            let message = rx
                .recv()
                .await
                .unwrap_or(StreamMessage::Error(StreamError::Disconnected));
            let update = self.apply(message).await;
            if let Some(message) = update.message_id().and_then(|id| self.message(id)) {
                on_update(message);
            }
            if update.is_terminal() || update == TurnUpdate::Ignored {
                return Some(update);
            }
        }
    }

    fn apply_chunk(&mut self, chunk: &str) -> TurnUpdate {
        let Some(turn) = self.turn.as_mut() else {
            return TurnUpdate::Ignored;
        };
        let display = turn.accumulator.ingest(chunk).to_string();
        let message_id = turn.placeholder.clone();
        self.set_content(&message_id, display);
        TurnUpdate::Chunk { message_id }
    }

    async fn complete_turn(&mut self) -> TurnUpdate {
        let Some(turn) = self.turn.take() else {
            return TurnUpdate::Ignored;
        };
        let completed = turn.accumulator.complete();
        self.set_content(&turn.placeholder, completed.display_text.clone());

        let remembered = directive::extract(&completed.raw_full_text);
        let memory_changed = self.remember(&remembered);

        if self.speech_enabled && !completed.display_text.is_empty() {
            self.speech.speak(&completed.display_text);
        }

        if memory_changed && self.persona_refresh == PersonaRefresh::AfterMemoryChange {
            self.refresh_persona().await;
        }

        debug!(
            message_id = %turn.placeholder,
            raw_len = completed.raw_full_text.len(),
            remembered = remembered.len(),
            "turn completed"
        );
        TurnUpdate::Completed {
            message_id: turn.placeholder,
            remembered,
        }
    }

    fn fail_turn(&mut self, error: StreamError) -> TurnUpdate {
        let Some(turn) = self.turn.take() else {
            return TurnUpdate::Ignored;
        };
        let state = turn.accumulator.fail();
        warn!(error = %error, ?state, "turn failed");
        self.set_content(&turn.placeholder, APOLOGY.to_string());
        self.error = Some(SurfacedError {
            kind: SurfacedErrorKind::Stream,
            message: APOLOGY.to_string(),
            detail: error.to_string(),
        });
        TurnUpdate::Failed {
            message_id: turn.placeholder,
            error,
        }
    }

    fn remember(&mut self, updates: &[MemoryEntry]) -> bool {
        let Some(store) = self.memory.as_mut() else {
            return false;
        };
        if updates.is_empty() {
            return false;
        }
        let before = store.memory().clone();
        &before != store.merge(updates)
    }

    async fn refresh_persona(&mut self) {
        let Some(store) = self.memory.as_ref() else {
            return;
        };
        let instruction = self.composer.compose(store.memory());
        if self.sessions.instruction() == Some(instruction.as_str()) {
            debug!("persona unchanged, keeping current session");
            return;
        }
        if let Err(err) = self.sessions.open(&instruction).await {
            warn!(error = %err, "could not refresh persona, keeping current session");
        }
    }

    fn set_content(&mut self, id: &MessageId, content: String) {
        if let Some(message) = self.messages.iter_mut().rev().find(|m| &m.id == id) {
            message.content = content;
        }
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().rev().find(|m| &m.id == id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.turn.is_some()
    }

    pub fn has_session(&self) -> bool {
        self.sessions.is_open()
    }

    pub fn error(&self) -> Option<&SurfacedError> {
        self.error.as_ref()
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_ref().map(MemoryStore::memory)
    }

    pub fn speech_enabled(&self) -> bool {
        self.speech_enabled
    }

    /// Persists the flag; turning speech off stops any current utterance.
    pub fn set_speech_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.speech.cancel();
        }
        self.speech_enabled = enabled;
        SpeechPreference::save(self.blobs.as_ref(), enabled);
    }
}
