//! Command-line interface parsing and handling
//!
//! Parses arguments, sets up tracing and dispatches to the interactive
//! chat, the one-shot `say` command or the config/credential helpers.

pub mod say;
pub mod setup;

use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::ChatApp;
use crate::auth::AuthManager;
use crate::cli::say::run_say;
use crate::cli::setup::{build_controller, open_blob_store, SessionOptions};
use crate::core::config::{Config, ConfigKey};
use crate::core::memory::MemoryStore;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::LoggingState;

#[derive(Parser)]
#[command(name = "bestie")]
#[command(about = "A terminal chat companion that remembers you")]
#[command(
    long_about = "Bestie is a friendly chat companion for the terminal. Replies stream in \
as they are generated, and things worth remembering about you are saved between sessions.\n\n\
Authentication:\n\
  Use 'bestie auth' to store an API key in your system keyring.\n\n\
Environment Variables (fallback if no key is stored):\n\
  GEMINI_API_KEY    API key for the default provider\n\
  RUST_LOG          Diagnostic log filter (written to stderr)\n\n\
Commands:\n\
  /help             List chat commands\n\
  /memory           Show what has been remembered\n\
  /speech [on|off]  Toggle spoken replies\n\
  /log <filename>   Enable logging to specified file\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Provider label used for key lookup
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Enable transcript logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Keep memory in this process only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single message and print the reply
    Say {
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Store an API key in the system keyring
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Print remembered facts
    Memory,
    /// Set configuration values, or print them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set (may be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let options = SessionOptions {
        model: args.model,
        provider: args.provider,
        ephemeral: args.ephemeral,
        mute: false,
    };

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let controller = build_controller(&config, &options)?;
            let logging = LoggingState::new(args.log)?;
            run_chat(ChatApp::new(controller, logging, config.bot_name())).await
        }
        Commands::Say { prompt } => run_say(prompt, options).await,
        Commands::Auth => {
            let config = Config::load()?;
            let provider = options.provider.as_deref().unwrap_or_else(|| config.provider_name());
            if let Err(e) = AuthManager::new().interactive_auth(provider) {
                eprintln!("❌ Authentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Deauth => {
            let config = Config::load()?;
            let provider = options.provider.as_deref().unwrap_or_else(|| config.provider_name());
            if let Err(e) = AuthManager::new().interactive_deauth(provider) {
                eprintln!("❌ Deauthentication failed: {e}");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Memory => {
            let config = Config::load()?;
            let store = MemoryStore::load(open_blob_store(&config, options.ephemeral)?);
            let memory = store.memory();
            if memory.is_empty() {
                println!("Nothing remembered yet.");
            } else {
                for entry in memory.iter() {
                    println!("{}: {}", entry.key.replace('_', " "), entry.value);
                }
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            let Some(key) = key else {
                config.print_all();
                return Ok(());
            };
            let config_key = parse_key(&key);
            if let Err(message) = config.set(config_key, &value.join(" ")) {
                eprintln!("⚠️  {message}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Set {} to: {}", config_key.as_str(), value.join(" "));
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            let config_key = parse_key(&key);
            config.unset(config_key);
            config.save()?;
            println!("✅ Unset {}", config_key.as_str());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> ConfigKey {
    match ConfigKey::parse(key) {
        Some(config_key) => config_key,
        None => {
            eprintln!("❌ Unknown config key: {key}");
            let known: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
            eprintln!("Known keys: {}", known.join(", "));
            std::process::exit(1);
        }
    }
}
