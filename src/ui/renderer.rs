//! Incremental printing of streamed replies.

use crate::core::message::Message;

/// Tracks how much of the in-flight reply is already on screen.
///
/// Display text normally only grows, so each update prints just the new
/// suffix. When it changes in some other way (a failed turn replacing
/// partial output with an apology) the whole text is printed on a fresh
/// line.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    printed: String,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write so the screen shows `display`.
    pub fn delta(&mut self, display: &str) -> String {
        if display == self.printed {
            return String::new();
        }

        let out = match display.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{display}"),
        };
        self.printed = display.to_string();
        out
    }

    pub fn reset(&mut self) {
        self.printed.clear();
    }
}

pub fn format_message(label: &str, message: &Message) -> String {
    format!("{label}: {}", message.content)
}

pub fn format_notice(notice: &str) -> String {
    notice
        .lines()
        .map(|line| format!("  │ {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
