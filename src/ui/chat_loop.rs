//! Interactive loop: stdin lines in, streamed replies out.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::app::ChatApp;
use crate::commands::{process_input, CommandResult, SUGGESTIONS};
use crate::core::chat_stream::{StreamMessage, StreamReceiver};
use crate::core::controller::TurnUpdate;
use crate::core::error::StreamError;
use crate::core::message::Message;
use crate::ui::renderer::{format_message, format_notice, StreamPrinter};

const BUSY_NOTICE: &str = "Still replying, hang on a sec.";
const NO_SESSION_NOTICE: &str = "Not connected; restart bestie to try again.";

pub async fn run_chat(mut app: ChatApp) -> Result<(), Box<dyn Error>> {
    if let Err(err) = app.controller.initialize().await {
        if let Some(surfaced) = app.controller.error() {
            eprintln!("{}", surfaced.message);
        }
        return Err(Box::new(err));
    }

    for message in app.controller.messages() {
        println!("{}", format_message(app.label_for(message), message));
        app.log_transcript(message);
    }
    print_suggestions();
    if app.logging.is_active() {
        println!("{}", format_notice(&format!("Logging {}", app.logging.get_status_string())));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stream: Option<StreamReceiver> = None;
    let mut printer = StreamPrinter::new();
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match process_input(&mut app, &line) {
                    CommandResult::Quit => break,
                    CommandResult::Continue => {}
                    CommandResult::ProcessAsMessage(text) => {
                        if stream.is_some() {
                            app.notify(BUSY_NOTICE);
                        } else if let Some(rx) = app.controller.send_message(&text) {
                            log_latest_user_message(&app);
                            printer.reset();
                            print!("{}: ", app.bot_name);
                            io::stdout().flush()?;
                            stream = Some(rx);
                        } else if !app.controller.has_session() {
                            app.notify(NO_SESSION_NOTICE);
                        }
                    }
                }
                print_notices(&mut app);
                if stream.is_none() {
                    prompt()?;
                }
            }
            message = next_message(&mut stream), if stream.is_some() => {
                let update = app.controller.apply(message).await;
                if let Some(reply) = update.message_id().and_then(|id| app.controller.message(id)) {
                    print!("{}", printer.delta(&reply.content));
                    io::stdout().flush()?;
                }
                if update.is_terminal() {
                    stream = None;
                    println!();
                    finish_turn(&mut app, &update);
                    print_notices(&mut app);
                    prompt()?;
                }
            }
        }
    }

    debug!("chat loop finished");
    Ok(())
}

async fn next_message(stream: &mut Option<StreamReceiver>) -> StreamMessage {
    match stream {
        Some(rx) => rx
            .recv()
            .await
            .unwrap_or(StreamMessage::Error(StreamError::Disconnected)),
        None => std::future::pending().await,
    }
}

fn finish_turn(app: &mut ChatApp, update: &TurnUpdate) {
    let reply: Option<Message> = update
        .message_id()
        .and_then(|id| app.controller.message(id))
        .cloned();
    if let Some(reply) = reply {
        app.log_transcript(&reply);
    }

    match update {
        TurnUpdate::Completed { remembered, .. } if !remembered.is_empty() => {
            let keys: Vec<String> = remembered
                .iter()
                .map(|entry| entry.key.replace('_', " "))
                .collect();
            app.notify(format!("Noted: {}", keys.join(", ")));
        }
        TurnUpdate::Failed { .. } => {
            if let Some(surfaced) = app.controller.error() {
                eprintln!("error: {}", surfaced.detail);
            }
        }
        _ => {}
    }
}

fn log_latest_user_message(app: &ChatApp) {
    if let Some(message) = app.controller.messages().iter().rev().find(|m| m.is_user()) {
        app.log_transcript(message);
    }
}

fn print_suggestions() {
    println!();
    for (index, suggestion) in SUGGESTIONS.iter().enumerate() {
        println!("  [{}] {}", index + 1, suggestion);
    }
    println!("Type /suggest N to use one, or /help for commands.");
}

fn print_notices(app: &mut ChatApp) {
    for notice in app.take_notices() {
        println!("{}", format_notice(&notice));
    }
}

fn prompt() -> io::Result<()> {
    print!("> ");
    io::stdout().flush()
}
