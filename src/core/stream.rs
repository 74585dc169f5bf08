//! Per-turn stream ingestion.

use crate::core::directive::{DirectiveScanner, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

/// Accumulates one in-flight response.
///
/// `raw_full_text` is everything the model sent; `display_text` is the same
/// text with directive spans removed and surrounding whitespace trimmed.
/// Each chunk is scanned once, so ingestion stays linear in response length.
#[derive(Debug)]
pub struct TurnAccumulator {
    raw_full_text: String,
    display_text: String,
    visible: String,
    scanner: DirectiveScanner,
    state: TurnState,
}

impl Default for TurnAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self {
            raw_full_text: String::new(),
            display_text: String::new(),
            visible: String::new(),
            scanner: DirectiveScanner::new(),
            state: TurnState::Idle,
        }
    }

    /// Applies one chunk and returns the refreshed display text.
    pub fn ingest(&mut self, chunk: &str) -> &str {
        if self.state == TurnState::Idle {
            self.state = TurnState::Streaming;
        }
        self.raw_full_text.push_str(chunk);
        let segments = self.scanner.push(chunk);
        self.apply(segments);
        &self.display_text
    }

    /// Marks the stream as finished, releasing any held-back text.
    pub fn complete(mut self) -> CompletedTurn {
        let scanner = std::mem::take(&mut self.scanner);
        self.apply(scanner.finish());
        self.state = TurnState::Completed;
        CompletedTurn {
            raw_full_text: self.raw_full_text,
            display_text: self.display_text,
        }
    }

    /// Marks the stream as failed. Partial output is discarded.
    pub fn fail(mut self) -> TurnState {
        self.state = TurnState::Failed;
        self.state
    }

    fn apply(&mut self, segments: impl IntoIterator<Item = Segment>) {
        let mut changed = false;
        for segment in segments {
            if let Segment::Text(text) = segment {
                self.visible.push_str(&text);
                changed = true;
            }
        }
        if changed {
            self.display_text = self.visible.trim().to_string();
        }
    }
}

/// Final output of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTurn {
    pub raw_full_text: String,
    pub display_text: String,
}
