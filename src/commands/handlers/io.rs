use chrono::Local;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};

use crate::app::ChatApp;
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;

pub(crate) fn handle_log(app: &mut ChatApp, invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.args.split_whitespace().collect();

    let notice = match parts.as_slice() {
        [] => match app.logging.toggle_logging() {
            Ok(message) => message,
            Err(e) => format!("Log error: {e}"),
        },
        [filename] => match app.logging.set_log_file(filename.to_string()) {
            Ok(message) => message,
            Err(e) => format!("Logfile error: {e}"),
        },
        _ => "Usage: /log [filename]".to_string(),
    };
    app.notify(notice);
    CommandResult::Continue
}

pub(crate) fn handle_dump(app: &mut ChatApp, invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.args.split_whitespace().collect();

    let filename = match parts.as_slice() {
        [] => format!("bestie-log-{}.txt", Local::now().format("%Y-%m-%d")),
        [filename] => filename.to_string(),
        _ => {
            app.notify("Usage: /dump [filename]");
            return CommandResult::Continue;
        }
    };

    let notice = match dump_conversation(app, &filename) {
        Ok(()) => format!("Conversation dumped to: {filename}"),
        Err(e) => format!("Dump error: {e}"),
    };
    app.notify(notice);
    CommandResult::Continue
}

/// Writes the visible transcript. Refuses to overwrite an existing file.
pub(crate) fn dump_conversation(app: &ChatApp, filename: &str) -> Result<(), Box<dyn Error>> {
    let messages = app.controller.messages();
    if messages.iter().all(|message| message.content.is_empty()) {
        return Err("No conversation to dump - the chat history is empty.".into());
    }

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(filename)
        .map_err(|e| -> Box<dyn Error> {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                format!("File '{filename}' already exists. Use /dump <filename>.").into()
            } else {
                Box::new(e)
            }
        })?;
    let mut writer = BufWriter::new(file);

    for message in messages.iter().filter(|m| !m.content.is_empty()) {
        writeln!(writer, "{}: {}", app.label_for(message), message.content)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
