//! State shared by the interactive loop and slash commands.

use tracing::warn;

use crate::core::controller::ConversationController;
use crate::core::message::Message;
use crate::utils::logging::LoggingState;

pub const USER_LABEL: &str = "You";

pub struct ChatApp {
    pub controller: ConversationController,
    pub logging: LoggingState,
    pub bot_name: String,
    notices: Vec<String>,
}

impl ChatApp {
    pub fn new(
        controller: ConversationController,
        logging: LoggingState,
        bot_name: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            logging,
            bot_name: bot_name.into(),
            notices: Vec::new(),
        }
    }

    /// Queues an app-authored line for the terminal. Never sent to the model.
    pub fn notify(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Speaker label used in logs and dumps.
    pub fn label_for(&self, message: &Message) -> &str {
        if message.is_user() {
            USER_LABEL
        } else {
            &self.bot_name
        }
    }

    /// Appends a finished message to the transcript log, if one is active.
    pub fn log_transcript(&self, message: &Message) {
        if message.content.is_empty() {
            return;
        }
        let line = format!("{}: {}", self.label_for(message), message.content);
        if let Err(err) = self.logging.log_message(&line) {
            warn!(error = %err, "failed to write transcript log");
        }
    }
}
