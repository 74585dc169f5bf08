//! Bestie is a terminal chat companion with a fixed persona and long-term
//! memory, backed by a streaming LLM API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation: the message list, turn lifecycle,
//!   memory directives embedded in replies, persisted memory, persona
//!   composition and the chat session with the provider.
//! - [`ui`] runs the line-mode interactive loop and prints streamed replies.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   chat loop.
//! - [`api`] defines the chat/model payloads exchanged with the provider.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which builds a
//! [`core::controller::ConversationController`] and hands it to
//! [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
