//! Wiring of config, credentials and storage into a controller.

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::AuthManager;
use crate::core::chat_stream::HttpModelProvider;
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::controller::ConversationController;
use crate::core::persona::PromptComposer;
use crate::core::speech::{CommandSpeaker, SilentSpeaker, SpeechOutput};
use crate::core::storage::{BlobStore, FileBlobStore, InMemoryBlobStore};

/// Per-invocation overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Keep memory and the speech flag in process only
    pub ephemeral: bool,
    /// Never start the TTS program
    pub mute: bool,
}

pub fn open_blob_store(config: &Config, ephemeral: bool) -> Result<Arc<dyn BlobStore>, Box<dyn Error>> {
    if ephemeral {
        debug!("using in-memory storage");
        return Ok(Arc::new(InMemoryBlobStore::new()));
    }
    let dir = config.resolved_data_dir()?;
    debug!(dir = %path_display(&dir), "using file storage");
    Ok(Arc::new(FileBlobStore::new(dir)))
}

fn load_composer(config: &Config) -> Result<PromptComposer, Box<dyn Error>> {
    let Some(path) = &config.persona_file else {
        return Ok(PromptComposer::default());
    };
    let persona = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read persona file {}: {err}", path_display(path)))?;
    if persona.trim().is_empty() {
        return Err(format!("Persona file {} is empty", path_display(path)).into());
    }
    info!(path = %path_display(path), "using custom persona");
    Ok(PromptComposer::with_persona(&persona))
}

fn speaker(config: &Config, mute: bool) -> Box<dyn SpeechOutput> {
    if mute {
        return Box::new(SilentSpeaker);
    }
    match CommandSpeaker::new(&config.speech_command()) {
        Some(speaker) => Box::new(speaker),
        None => Box::new(SilentSpeaker),
    }
}

/// Builds an uninitialized controller; call `initialize` before sending.
pub fn build_controller(
    config: &Config,
    options: &SessionOptions,
) -> Result<ConversationController, Box<dyn Error>> {
    let provider_name = options
        .provider
        .as_deref()
        .unwrap_or_else(|| config.provider_name());
    let model = options.model.as_deref().unwrap_or_else(|| config.model());

    let api_key = AuthManager::new()
        .resolve_api_key(provider_name, config.api_key_env())
        .map(|(key, source)| {
            debug!(provider = provider_name, ?source, "resolved API key");
            key
        });

    let provider = HttpModelProvider::new(
        config.base_url(),
        model,
        provider_name,
        config.api_key_env(),
        api_key,
    );

    let controller = ConversationController::new(
        Arc::new(provider),
        open_blob_store(config, options.ephemeral)?,
        speaker(config, options.mute),
    )
    .with_composer(load_composer(config)?)
    .with_persona_refresh(config.persona_refresh());

    Ok(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::Memory;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn custom_persona_is_loaded_with_the_memory_protocol() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("persona.txt");
        fs::write(&path, "You are a grumpy pirate.\n").expect("write persona");

        let config = Config {
            persona_file: Some(path),
            ..Config::default()
        };
        let instruction = load_composer(&config)
            .expect("composer")
            .compose(&Memory::new());
        assert!(instruction.starts_with("You are a grumpy pirate."));
        assert!(instruction.contains("[MEMORIZE]"));
    }

    #[test]
    fn missing_persona_file_is_an_error() {
        let config = Config {
            persona_file: Some(PathBuf::from("/nonexistent/bestie/persona.txt")),
            ..Config::default()
        };
        let err = load_composer(&config).expect_err("should fail");
        assert!(err.to_string().contains("Failed to read persona file"));
    }

    #[test]
    fn blank_persona_file_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("persona.txt");
        fs::write(&path, "  \n").expect("write persona");
        let config = Config {
            persona_file: Some(path),
            ..Config::default()
        };
        assert!(load_composer(&config).is_err());
    }

    #[test]
    fn file_storage_lives_in_the_configured_data_dir() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config {
            data_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let store = open_blob_store(&config, false).expect("store");
        store.write("memory", "{\"name\":\"Sam\"}").expect("write");
        assert!(dir.path().join("memory.json").exists());
    }

    #[test]
    fn ephemeral_storage_touches_no_files() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config {
            data_dir: Some(dir.path().join("data")),
            ..Config::default()
        };
        let store = open_blob_store(&config, true).expect("store");
        store.write("memory", "{}").expect("write");
        assert_eq!(store.read("memory").expect("read").as_deref(), Some("{}"));
        assert!(!dir.path().join("data").exists());
    }
}
