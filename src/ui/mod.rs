//! Line-mode terminal front end.
//!
//! - [`chat_loop`]: reads stdin, dispatches slash commands through
//!   [`crate::commands`] and drives turns on the
//!   [`crate::core::controller::ConversationController`].
//! - [`renderer`]: turns message updates into terminal output.
//!
//! This layer only presents state; the controller owns it.

pub mod chat_loop;
pub mod renderer;
