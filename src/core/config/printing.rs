use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  provider: {}", self.provider_name());
        println!("  base-url: {}", self.base_url());
        println!("  model: {}", self.model());
        println!("  api-key-env: {}", self.api_key_env());
        println!("  bot-name: {}", self.bot_name());
        match &self.persona_file {
            Some(path) => println!("  persona-file: {}", path_display(path)),
            None => println!("  persona-file: (built-in)"),
        }
        println!("  persona-refresh: {}", self.persona_refresh().as_str());
        println!("  speech-command: {}", self.speech_command().join(" "));
        match self.resolved_data_dir() {
            Ok(dir) => println!("  data-dir: {}", path_display(dir)),
            Err(err) => println!("  data-dir: (unavailable: {err})"),
        }
    }
}
