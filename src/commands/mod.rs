mod handlers;
mod registry;

pub use registry::{all_commands, CommandInvocation};

use crate::app::ChatApp;

/// Canned conversation starters offered at startup.
pub const SUGGESTIONS: [&str; 3] = [
    "Suggest a movie for me",
    "I'm feeling a bit down today",
    "Tell me a joke!",
];

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Quit,
}

pub fn process_input(app: &mut ChatApp, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(trimmed.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let command_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => {
            let invocation = CommandInvocation {
                input: trimmed,
                args,
            };
            (command.handler)(app, invocation)
        }
        None => {
            app.notify(format!(
                "Unknown command: /{command_name}. Type /help for a list of commands."
            ));
            CommandResult::Continue
        }
    }
}

#[cfg(test)]
mod tests;
