use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::session::PersonaRefresh;
use crate::core::speech::default_speech_command;
use crate::utils::url::validate_base_url;

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BOT_NAME: &str = "BFF Bot";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Label used for keyring and environment lookups (e.g., "gemini")
    pub provider: Option<String>,
    /// OpenAI-compatible API root
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Environment variable consulted when the keyring has no key
    pub api_key_env: Option<String>,
    /// Name shown in front of the assistant's replies
    pub bot_name: Option<String>,
    /// Plain-text file replacing the built-in persona body
    pub persona_file: Option<PathBuf>,
    pub persona_refresh: Option<PersonaRefresh>,
    /// Text-to-speech program and leading arguments
    pub speech_command: Option<Vec<String>>,
    /// Where memory and the speech flag are stored
    pub data_dir: Option<PathBuf>,
}

/// Keys accepted by `bestie set` / `bestie unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Provider,
    BaseUrl,
    Model,
    ApiKeyEnv,
    BotName,
    PersonaFile,
    PersonaRefresh,
    SpeechCommand,
    DataDir,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::Provider,
        ConfigKey::BaseUrl,
        ConfigKey::Model,
        ConfigKey::ApiKeyEnv,
        ConfigKey::BotName,
        ConfigKey::PersonaFile,
        ConfigKey::PersonaRefresh,
        ConfigKey::SpeechCommand,
        ConfigKey::DataDir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Provider => "provider",
            ConfigKey::BaseUrl => "base-url",
            ConfigKey::Model => "model",
            ConfigKey::ApiKeyEnv => "api-key-env",
            ConfigKey::BotName => "bot-name",
            ConfigKey::PersonaFile => "persona-file",
            ConfigKey::PersonaRefresh => "persona-refresh",
            ConfigKey::SpeechCommand => "speech-command",
            ConfigKey::DataDir => "data-dir",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == key)
    }
}

impl Config {
    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn bot_name(&self) -> &str {
        self.bot_name.as_deref().unwrap_or(DEFAULT_BOT_NAME)
    }

    pub fn persona_refresh(&self) -> PersonaRefresh {
        self.persona_refresh.unwrap_or_default()
    }

    pub fn speech_command(&self) -> Vec<String> {
        self.speech_command
            .clone()
            .filter(|command| !command.is_empty())
            .unwrap_or_else(default_speech_command)
    }

    /// Sets `key` from its command-line representation.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {}", key.as_str()));
        }
        match key {
            ConfigKey::Provider => self.provider = Some(value.to_lowercase()),
            ConfigKey::BaseUrl => {
                validate_base_url(value)?;
                self.base_url = Some(value.to_string());
            }
            ConfigKey::Model => self.model = Some(value.to_string()),
            ConfigKey::ApiKeyEnv => self.api_key_env = Some(value.to_string()),
            ConfigKey::BotName => self.bot_name = Some(value.to_string()),
            ConfigKey::PersonaFile => self.persona_file = Some(PathBuf::from(value)),
            ConfigKey::PersonaRefresh => {
                let policy = PersonaRefresh::parse(value).ok_or_else(|| {
                    format!(
                        "Invalid persona-refresh '{value}'. Expected '{}' or '{}'",
                        PersonaRefresh::Startup.as_str(),
                        PersonaRefresh::AfterMemoryChange.as_str()
                    )
                })?;
                self.persona_refresh = Some(policy);
            }
            ConfigKey::SpeechCommand => {
                self.speech_command =
                    Some(value.split_whitespace().map(str::to_string).collect())
            }
            ConfigKey::DataDir => self.data_dir = Some(PathBuf::from(value)),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Provider => self.provider = None,
            ConfigKey::BaseUrl => self.base_url = None,
            ConfigKey::Model => self.model = None,
            ConfigKey::ApiKeyEnv => self.api_key_env = None,
            ConfigKey::BotName => self.bot_name = None,
            ConfigKey::PersonaFile => self.persona_file = None,
            ConfigKey::PersonaRefresh => self.persona_refresh = None,
            ConfigKey::SpeechCommand => self.speech_command = None,
            ConfigKey::DataDir => self.data_dir = None,
        }
    }
}

pub fn path_display(path: impl AsRef<Path>) -> String {
    path.as_ref().display().to_string()
}
