//! Speech output for completed replies.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Reads replies aloud. Fire-and-forget: callers never wait on playback.
pub trait SpeechOutput: Send {
    /// Starts speaking `text`, cancelling any utterance still playing.
    fn speak(&mut self, text: &str);
    /// Stops the current utterance immediately.
    fn cancel(&mut self);
}

/// Platform text-to-speech program used when none is configured.
pub fn default_speech_command() -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec!["say".to_string()]
    } else {
        vec!["espeak".to_string()]
    }
}

/// Speaks by spawning an external TTS program with the text as its last
/// argument.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandSpeaker {
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            current: None,
        })
    }
}

impl SpeechOutput for CommandSpeaker {
    fn speak(&mut self, text: &str) {
        self.cancel();
        if text.trim().is_empty() {
            return;
        }

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                debug!(program = %self.program, "speaking reply");
                self.current = Some(child);
            }
            Err(err) => warn!(program = %self.program, error = %err, "failed to start speech"),
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(err) = child.start_kill() {
                debug!(error = %err, "speech process already gone");
            }
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Used when no TTS program is available.
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl SpeechOutput for SilentSpeaker {
    fn speak(&mut self, _text: &str) {}

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_has_no_speaker() {
        assert!(CommandSpeaker::new(&[]).is_none());
    }

    #[test]
    fn command_splits_program_and_args() {
        let command = vec!["espeak".to_string(), "-s".to_string(), "150".to_string()];
        let speaker = CommandSpeaker::new(&command).expect("speaker");
        assert_eq!(speaker.program, "espeak");
        assert_eq!(speaker.args, vec!["-s", "150"]);
        assert!(speaker.current.is_none());
    }

    #[test]
    fn default_command_is_not_empty() {
        assert!(!default_speech_command().is_empty());
    }
}
