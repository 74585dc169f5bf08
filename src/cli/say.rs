//! One-shot `say` command: a single turn printed to stdout.

use std::error::Error;
use std::io::{self, Write};

use crate::cli::setup::{build_controller, SessionOptions};
use crate::core::config::Config;
use crate::core::controller::TurnUpdate;
use crate::ui::renderer::StreamPrinter;

pub async fn run_say(prompt: Vec<String>, options: SessionOptions) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: bestie say <prompt>");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let mut controller = build_controller(
        &config,
        &SessionOptions {
            mute: true,
            ..options
        },
    )?;

    if let Err(err) = controller.initialize().await {
        if let Some(surfaced) = controller.error() {
            eprintln!("❌ {}", surfaced.message);
        }
        return Err(Box::new(err));
    }

    let mut printer = StreamPrinter::new();
    let mut write_err = None;
    let update = controller
        .run_turn(&prompt, |reply| {
            let delta = printer.delta(&reply.content);
            let mut stdout = io::stdout();
            if let Err(err) = stdout.write_all(delta.as_bytes()).and_then(|_| stdout.flush()) {
                write_err.get_or_insert(err);
            }
        })
        .await;
    println!();

    if let Some(err) = write_err {
        return Err(Box::new(err));
    }

    if let Some(TurnUpdate::Failed { error, .. }) = update {
        eprintln!("❌ Error: {error}");
        std::process::exit(1);
    }
    Ok(())
}
