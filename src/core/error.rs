//! Error taxonomy for the conversation core.
//!
//! Only [`InitializationError`] and [`StreamError`] are ever shown to the
//! user. Directive and storage failures are recovered where they happen and
//! only reach the log.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/// Setting up the provider session failed. Fatal to the conversation.
#[derive(Debug)]
pub enum InitializationError {
    /// No API key in the keyring or the configured environment variable.
    MissingCredentials { provider: String, env_var: String },
    /// The provider could not be reached at all.
    Unreachable(reqwest::Error),
    /// The provider answered but refused the request (bad key, bad model, ...).
    Rejected { status: u16, body: String },
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationError::MissingCredentials { provider, env_var } => write!(
                f,
                "No API key found for provider '{provider}'. Run `bestie auth` or set {env_var}."
            ),
            InitializationError::Unreachable(err) => {
                write!(f, "Could not reach the model provider: {err}")
            }
            InitializationError::Rejected { status, body } => {
                write!(f, "Model provider rejected the session (HTTP {status}): {body}")
            }
        }
    }
}

impl StdError for InitializationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            InitializationError::Unreachable(err) => Some(err),
            _ => None,
        }
    }
}

/// A turn failed mid-flight. Recovered at the turn level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The HTTP request or body stream failed.
    Transport(String),
    /// The provider reported an error, already formatted for display.
    Api(String),
    /// The stream producer went away without signalling completion.
    Disconnected,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(message) => write!(f, "Transport error: {message}"),
            StreamError::Api(message) => f.write_str(message),
            StreamError::Disconnected => f.write_str("Stream closed before completion"),
        }
    }
}

impl StdError for StreamError {}

/// An embedded memorize directive could not be understood.
#[derive(Debug)]
pub enum DirectiveParseError {
    Json(serde_json::Error),
    EmptyField(&'static str),
}

impl fmt::Display for DirectiveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveParseError::Json(err) => write!(f, "invalid directive payload: {err}"),
            DirectiveParseError::EmptyField(field) => {
                write!(f, "directive field '{field}' is empty")
            }
        }
    }
}

impl StdError for DirectiveParseError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DirectiveParseError::Json(err) => Some(err),
            DirectiveParseError::EmptyField(_) => None,
        }
    }
}

impl From<serde_json::Error> for DirectiveParseError {
    fn from(err: serde_json::Error) -> Self {
        DirectiveParseError::Json(err)
    }
}

/// Persisted blob access failed.
#[derive(Debug)]
pub enum StorageError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        name: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read { path, source } => {
                write!(f, "Failed to read {}: {}", path.display(), source)
            }
            StorageError::Write { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            StorageError::Parse { name, source } => {
                write!(f, "Stored '{name}' is malformed: {source}")
            }
        }
    }
}

impl StdError for StorageError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StorageError::Read { source, .. } | StorageError::Write { source, .. } => Some(source),
            StorageError::Parse { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_names_the_fallback_variable() {
        let err = InitializationError::MissingCredentials {
            provider: "gemini".to_string(),
            env_var: "GEMINI_API_KEY".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("gemini"));
        assert!(text.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn directive_json_errors_keep_their_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DirectiveParseError::from(json_err);
        assert!(err.source().is_some());
    }
}
