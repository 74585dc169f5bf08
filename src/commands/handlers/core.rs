use crate::app::ChatApp;
use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult, SUGGESTIONS};

pub(crate) fn handle_help(app: &mut ChatApp, _invocation: CommandInvocation<'_>) -> CommandResult {
    let mut help = String::from("Commands:");
    for command in all_commands() {
        for usage in command.usages {
            help.push_str(&format!("\n  {:<18} {}", usage.syntax, usage.description));
        }
    }
    app.notify(help);
    CommandResult::Continue
}

pub(crate) fn handle_memory(app: &mut ChatApp, _invocation: CommandInvocation<'_>) -> CommandResult {
    let listing = match app.controller.memory() {
        Some(memory) if !memory.is_empty() => {
            let mut listing = String::from("Things I remember about you:");
            for entry in memory.iter() {
                listing.push_str(&format!("\n  • {}: {}", entry.key.replace('_', " "), entry.value));
            }
            listing
        }
        _ => "Nothing remembered yet.".to_string(),
    };
    app.notify(listing);
    CommandResult::Continue
}

pub(crate) fn handle_speech(app: &mut ChatApp, invocation: CommandInvocation<'_>) -> CommandResult {
    let enabled = match invocation.args.to_ascii_lowercase().as_str() {
        "" | "toggle" => !app.controller.speech_enabled(),
        "on" => true,
        "off" => false,
        _ => {
            app.notify("Usage: /speech [on|off]");
            return CommandResult::Continue;
        }
    };
    app.controller.set_speech_enabled(enabled);
    app.notify(if enabled {
        "Speech output on"
    } else {
        "Speech output off"
    });
    CommandResult::Continue
}

pub(crate) fn handle_suggest(app: &mut ChatApp, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let mut listing = String::from("Try one of these:");
        for (index, suggestion) in SUGGESTIONS.iter().enumerate() {
            listing.push_str(&format!("\n  /suggest {}  {}", index + 1, suggestion));
        }
        app.notify(listing);
        return CommandResult::Continue;
    }

    match invocation
        .args
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| SUGGESTIONS.get(index))
    {
        Some(suggestion) => CommandResult::ProcessAsMessage((*suggestion).to_string()),
        None => {
            app.notify(format!("Usage: /suggest [1-{}]", SUGGESTIONS.len()));
            CommandResult::Continue
        }
    }
}

pub(crate) fn handle_quit(_app: &mut ChatApp, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
