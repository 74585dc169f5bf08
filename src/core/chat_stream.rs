//! Model provider protocol and the OpenAI-compatible streaming transport.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse, ModelsResponse};
use crate::core::error::{InitializationError, StreamError};
use crate::core::message::Role;
use crate::utils::url::construct_api_url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Chunk(String),
    /// Terminal: nothing follows an error.
    Error(StreamError),
    End,
}

pub type StreamReceiver = mpsc::UnboundedReceiver<StreamMessage>;

/// Something that can start a stateful chat seeded with a persona
/// instruction.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// `history` carries earlier user/model turns into the new session.
    async fn open(
        &self,
        instruction: &str,
        history: Vec<ChatMessage>,
    ) -> Result<Box<dyn ChatSession>, InitializationError>;
}

/// A live provider-side conversation.
pub trait ChatSession: Send {
    /// Sends `text` and returns its response stream. The stream is finite and
    /// cannot be restarted.
    fn send_stream(&mut self, text: &str) -> StreamReceiver;

    /// Completed user/model turns, oldest first.
    fn history(&self) -> Vec<ChatMessage>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SseEvent {
    Chunk(String),
    Done,
    Error(String),
    Ignore,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = extract_data_payload(line) else {
        return SseEvent::Ignore;
    };

    if payload == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseEvent::Chunk)
            .unwrap_or(SseEvent::Ignore),
        Err(_) if payload.trim().is_empty() => SseEvent::Ignore,
        Err(_) => SseEvent::Error(format_api_error(payload)),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Condenses a provider error body into one readable line.
pub(crate) fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "API Error: <empty response>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value).filter(|s| !s.is_empty()) {
            return format!("API Error: {summary}");
        }
        return format!("API Error: {json_value}");
    }

    format!("API Error: {}", trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Some providers prefix ids (`models/gemini-2.5-flash`).
fn lists_model(models: &ModelsResponse, model: &str) -> bool {
    models.data.iter().any(|info| {
        info.id == model || info.id.rsplit_once('/').is_some_and(|(_, name)| name == model)
    })
}

/// OpenAI-compatible `chat/completions` provider.
#[derive(Clone)]
pub struct HttpModelProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    provider_name: String,
    env_var: String,
    api_key: Option<String>,
}

impl HttpModelProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        provider_name: impl Into<String>,
        env_var: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            provider_name: provider_name.into(),
            env_var: env_var.into(),
            api_key,
        }
    }

    async fn verify(&self, api_key: &str) -> Result<(), InitializationError> {
        let response = self
            .client
            .get(construct_api_url(&self.base_url, "models"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(InitializationError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(InitializationError::Rejected {
                status: status.as_u16(),
                body: format_api_error(&body),
            });
        }

        match response.json::<ModelsResponse>().await {
            Ok(models) if lists_model(&models, &self.model) => {
                debug!(count = models.data.len(), "provider reachable")
            }
            Ok(models) => warn!(
                model = %self.model,
                count = models.data.len(),
                "configured model not in the provider's model list"
            ),
            Err(err) => debug!(error = %err, "provider reachable, model list unreadable"),
        }
        Ok(())
    }
}

#[async_trait]
impl ModelProvider for HttpModelProvider {
    async fn open(
        &self,
        instruction: &str,
        history: Vec<ChatMessage>,
    ) -> Result<Box<dyn ChatSession>, InitializationError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| InitializationError::MissingCredentials {
                provider: self.provider_name.clone(),
                env_var: self.env_var.clone(),
            })?;

        self.verify(&api_key).await?;
        debug!(model = %self.model, "chat session opened");

        Ok(Box::new(HttpChatSession {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key,
            model: self.model.clone(),
            instruction: instruction.to_string(),
            history: Arc::new(Mutex::new(history)),
        }))
    }
}

struct HttpChatSession {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    instruction: String,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatSession for HttpChatSession {
    fn send_stream(&mut self, text: &str) -> StreamReceiver {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut messages = vec![ChatMessage::system(self.instruction.clone())];
        messages.extend(self.history());
        messages.push(ChatMessage::new(Role::User.to_api_role(), text));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: true,
        };
        let http_request = self
            .client
            .post(construct_api_url(&self.base_url, "chat/completions"))
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&request);

        let history = Arc::clone(&self.history);
        let user_text = text.to_string();

        tokio::spawn(async move {
            match stream_response(http_request, &tx).await {
                Ok(full_response) => {
                    history
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend([
                            ChatMessage::new(Role::User.to_api_role(), user_text),
                            ChatMessage::new(Role::Model.to_api_role(), full_response),
                        ]);
                    let _ = tx.send(StreamMessage::End);
                }
                Err(err) => {
                    debug!(error = %err, "stream failed");
                    let _ = tx.send(StreamMessage::Error(err));
                }
            }
        });

        rx
    }

    fn history(&self) -> Vec<ChatMessage> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Forwards content deltas to `tx` and returns the full response text.
async fn stream_response(
    http_request: reqwest::RequestBuilder,
    tx: &mpsc::UnboundedSender<StreamMessage>,
) -> Result<String, StreamError> {
    let response = http_request
        .send()
        .await
        .map_err(|err| StreamError::Transport(err.to_string()))?;

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(StreamError::Api(format_api_error(&error_text)));
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut full_response = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = chunk.map_err(|err| StreamError::Transport(err.to_string()))?;
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let event = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => parse_sse_line(line.trim()),
                Err(err) => {
                    debug!(error = %err, "skipping invalid UTF-8 in stream");
                    SseEvent::Ignore
                }
            };
            buffer.drain(..=newline_pos);

            match event {
                SseEvent::Chunk(content) => {
                    full_response.push_str(&content);
                    if tx.send(StreamMessage::Chunk(content)).is_err() {
                        return Err(StreamError::Disconnected);
                    }
                }
                SseEvent::Done => return Ok(full_response),
                SseEvent::Error(message) => return Err(StreamError::Api(message)),
                SseEvent::Ignore => {}
            }
        }
    }

    Ok(full_response)
}
