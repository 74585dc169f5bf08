//! Memorize directives embedded in model output.
//!
//! A directive looks like
//! `[MEMORIZE]{"key":"favorite_genre","value":"sci-fi"}[/MEMORIZE]` and may
//! span several lines. [`DirectiveScanner`] splits text into visible text and
//! directive payloads incrementally, one chunk at a time, without rescanning
//! what it has already emitted. [`extract`] runs it over a complete response.

use memchr::memmem;
use serde::Deserialize;
use tracing::warn;

use crate::core::error::DirectiveParseError;
use crate::core::memory::MemoryEntry;

pub const OPEN_MARKER: &str = "[MEMORIZE]";
pub const CLOSE_MARKER: &str = "[/MEMORIZE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text safe to show the user.
    Text(String),
    /// The raw payload between an open and a close marker.
    Directive(String),
}

/// Outside-span / inside-span scanner.
///
/// Text that could still turn into a marker (a trailing `[MEMO` for example)
/// is held back until the next chunk or [`DirectiveScanner::finish`]
/// resolves it. Stray close markers outside a span are dropped.
#[derive(Debug, Default)]
pub struct DirectiveScanner {
    pending: String,
    in_span: bool,
}

impl DirectiveScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) -> Vec<Segment> {
        self.pending.push_str(chunk);
        let mut segments = Vec::new();

        loop {
            if self.in_span {
                match memmem::find(self.pending.as_bytes(), CLOSE_MARKER.as_bytes()) {
                    Some(end) => {
                        segments.push(Segment::Directive(self.pending[..end].to_string()));
                        self.pending.drain(..end + CLOSE_MARKER.len());
                        self.in_span = false;
                    }
                    None => break,
                }
                continue;
            }

            match next_marker(&self.pending) {
                Some((start, marker)) => {
                    if start > 0 {
                        segments.push(Segment::Text(self.pending[..start].to_string()));
                    }
                    self.pending.drain(..start + marker.len());
                    self.in_span = marker == OPEN_MARKER;
                }
                None => {
                    let held = partial_marker_len(&self.pending);
                    let emit = self.pending.len() - held;
                    if emit > 0 {
                        segments.push(Segment::Text(self.pending[..emit].to_string()));
                        self.pending.drain(..emit);
                    }
                    break;
                }
            }
        }

        segments
    }

    /// Flushes held-back text at end of stream. An unterminated directive
    /// is dropped, never shown.
    pub fn finish(self) -> Option<Segment> {
        if self.in_span {
            if !self.pending.is_empty() {
                warn!(
                    payload_len = self.pending.len(),
                    "dropping unterminated memorize directive"
                );
            }
            return None;
        }
        (!self.pending.is_empty()).then(|| Segment::Text(self.pending))
    }
}

fn next_marker(text: &str) -> Option<(usize, &'static str)> {
    let open = memmem::find(text.as_bytes(), OPEN_MARKER.as_bytes());
    let close = memmem::find(text.as_bytes(), CLOSE_MARKER.as_bytes());
    match (open, close) {
        (Some(o), Some(c)) if c < o => Some((c, CLOSE_MARKER)),
        (Some(o), _) => Some((o, OPEN_MARKER)),
        (None, Some(c)) => Some((c, CLOSE_MARKER)),
        (None, None) => None,
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of a marker.
fn partial_marker_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let longest = OPEN_MARKER.len().max(CLOSE_MARKER.len()) - 1;
    (1..=longest.min(bytes.len()))
        .rev()
        .find(|&len| {
            let tail = &bytes[bytes.len() - len..];
            OPEN_MARKER.as_bytes().starts_with(tail) || CLOSE_MARKER.as_bytes().starts_with(tail)
        })
        .unwrap_or(0)
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectivePayload {
    key: String,
    value: String,
}

/// Parses one directive payload into a memory entry.
pub fn parse_payload(payload: &str) -> Result<MemoryEntry, DirectiveParseError> {
    let parsed: DirectivePayload = serde_json::from_str(payload.trim())?;
    if parsed.key.trim().is_empty() {
        return Err(DirectiveParseError::EmptyField("key"));
    }
    if parsed.value.trim().is_empty() {
        return Err(DirectiveParseError::EmptyField("value"));
    }
    Ok(MemoryEntry::new(parsed.key, parsed.value))
}

/// Collects memory updates from a completed response, in order of
/// appearance. Malformed directives are logged and skipped.
pub fn extract(raw_full_text: &str) -> Vec<MemoryEntry> {
    let mut scanner = DirectiveScanner::new();
    let segments = scanner.push(raw_full_text);

    segments
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Directive(payload) => match parse_payload(&payload) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping malformed memorize directive");
                    None
                }
            },
            Segment::Text(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(key: &str, value: &str) -> String {
        format!(r#"{OPEN_MARKER}{{"key":"{key}","value":"{value}"}}{CLOSE_MARKER}"#)
    }

    fn visible_text(segments: &[Segment]) -> String {
        segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Text(text) => Some(text.as_str()),
                Segment::Directive(_) => None,
            })
            .collect()
    }

    fn strip_directives(raw: &str) -> String {
        let mut scanner = DirectiveScanner::new();
        let mut segments = scanner.push(raw);
        segments.extend(scanner.finish());
        visible_text(&segments)
    }

    #[test]
    fn extracts_pairs_in_order() {
        let raw = format!(
            "Got it! {} and {}",
            directive("favorite_genre", "sci-fi"),
            directive("name", "Ada")
        );
        assert_eq!(
            extract(&raw),
            vec![
                MemoryEntry::new("favorite_genre", "sci-fi"),
                MemoryEntry::new("name", "Ada"),
            ]
        );
    }

    #[test]
    fn malformed_payload_is_skipped_and_scanning_continues() {
        let raw = format!(
            "{OPEN_MARKER}{{not json}}{CLOSE_MARKER} ok {OPEN_MARKER}{{\"key\":\"\",\"value\":\"x\"}}{CLOSE_MARKER} {}",
            directive("pet", "dog")
        );
        assert_eq!(extract(&raw), vec![MemoryEntry::new("pet", "dog")]);
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(parse_payload(r#"{"key":"pet"}"#).is_err());
        assert!(matches!(
            parse_payload(r#"{"key":"pet","value":"  "}"#),
            Err(DirectiveParseError::EmptyField("value"))
        ));
    }

    #[test]
    fn payload_with_extra_fields_is_rejected() {
        assert!(matches!(
            parse_payload(r#"{"key":"pet","value":"dog","mood":"x"}"#),
            Err(DirectiveParseError::Json(_))
        ));
        let raw = format!(
            "{OPEN_MARKER}{{\"key\":\"pet\",\"value\":\"dog\",\"mood\":\"x\"}}{CLOSE_MARKER}"
        );
        assert!(extract(&raw).is_empty());
    }

    #[test]
    fn value_is_stored_as_sent() {
        assert_eq!(
            parse_payload(r#"{"key":"pet","value":"  big dog  "}"#).expect("payload"),
            MemoryEntry::new("pet", "  big dog  ")
        );
    }

    #[test]
    fn payloads_may_span_lines() {
        let raw = format!("Noted.\n{OPEN_MARKER}\n{{\n  \"key\": \"city\",\n  \"value\": \"Lisbon\"\n}}\n{CLOSE_MARKER}");
        assert_eq!(extract(&raw), vec![MemoryEntry::new("city", "Lisbon")]);
        assert_eq!(strip_directives(&raw), "Noted.\n");
    }

    #[test]
    fn markers_split_across_chunks_never_leak() {
        let raw = format!("Hi {} there", directive("mood", "happy"));
        for split in 1..raw.len() {
            if !raw.is_char_boundary(split) {
                continue;
            }
            let mut scanner = DirectiveScanner::new();
            let mut segments = scanner.push(&raw[..split]);
            segments.extend(scanner.push(&raw[split..]));
            segments.extend(scanner.finish());

            let visible = visible_text(&segments);
            assert_eq!(visible, "Hi  there", "split at {split}");
        }
    }

    #[test]
    fn partial_marker_is_held_until_resolved() {
        let mut scanner = DirectiveScanner::new();
        assert_eq!(
            scanner.push("Look [MEM"),
            vec![Segment::Text("Look ".to_string())]
        );
        assert_eq!(
            scanner.push("bers]"),
            vec![Segment::Text("[MEMbers]".to_string())]
        );
    }

    #[test]
    fn trailing_partial_marker_is_text_at_end_of_stream() {
        let mut scanner = DirectiveScanner::new();
        assert!(scanner.push("[MEMO").is_empty());
        assert_eq!(scanner.finish(), Some(Segment::Text("[MEMO".to_string())));
    }

    #[test]
    fn unterminated_directive_is_hidden() {
        let raw = format!("Sure! {OPEN_MARKER}{{\"key\":\"a\"");
        assert_eq!(strip_directives(&raw), "Sure! ");
        assert!(extract(&raw).is_empty());
    }

    #[test]
    fn stray_close_marker_is_stripped() {
        assert_eq!(strip_directives(&format!("odd {CLOSE_MARKER}text")), "odd text");
    }
}
