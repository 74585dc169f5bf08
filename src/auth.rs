//! API key storage and lookup.
//!
//! Keys live in the system keyring under the `bestie` service, one entry per
//! provider label. The configured environment variable is the fallback.

use keyring::Entry;
use std::error::Error;
use std::io::{self, Write};
use tracing::{debug, warn};

const KEYRING_SERVICE: &str = "bestie";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Keyring,
    Environment,
}

pub struct AuthManager;

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthManager {
    pub fn new() -> Self {
        Self
    }

    pub fn store_token(&self, provider_name: &str, token: &str) -> Result<(), Box<dyn Error>> {
        let entry = Entry::new(KEYRING_SERVICE, provider_name)?;
        entry.set_password(token)?;
        Ok(())
    }

    pub fn get_token(&self, provider_name: &str) -> Result<Option<String>, Box<dyn Error>> {
        let entry = Entry::new(KEYRING_SERVICE, provider_name)?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Returns true if an entry existed.
    pub fn remove_token(&self, provider_name: &str) -> Result<bool, Box<dyn Error>> {
        let entry = Entry::new(KEYRING_SERVICE, provider_name)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// Keyring first, then `env_var`. Keyring failures are logged and
    /// treated as "no key stored".
    pub fn resolve_api_key(&self, provider_name: &str, env_var: &str) -> Option<(String, KeySource)> {
        match self.get_token(provider_name) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                debug!(provider = provider_name, "using API key from keyring");
                return Some((token, KeySource::Keyring));
            }
            Ok(_) => {}
            Err(err) => warn!(provider = provider_name, error = %err, "keyring unavailable"),
        }

        key_from_env(env_var).map(|token| (token, KeySource::Environment))
    }

    pub fn interactive_auth(&self, provider_name: &str) -> Result<(), Box<dyn Error>> {
        println!("🔐 Bestie Authentication Setup");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!();

        if self.get_token(provider_name)?.is_some() {
            println!("A key for '{provider_name}' is already stored and will be replaced.");
        }

        print!("Enter your {provider_name} API key: ");
        io::stdout().flush()?;

        let mut token = String::new();
        io::stdin().read_line(&mut token)?;
        let token = token.trim();

        if token.is_empty() {
            return Err("API key cannot be empty".into());
        }

        self.store_token(provider_name, token)?;
        println!("✓ Key stored securely for {provider_name}");
        Ok(())
    }

    pub fn interactive_deauth(&self, provider_name: &str) -> Result<(), Box<dyn Error>> {
        if self.remove_token(provider_name)? {
            println!("✓ Removed stored key for {provider_name}");
        } else {
            println!("No stored key for {provider_name}");
        }
        Ok(())
    }
}

fn key_from_env(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
