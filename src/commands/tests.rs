use super::*;
use crate::app::ChatApp;
use crate::core::controller::ConversationController;
use crate::core::memory::MemoryEntry;
use crate::core::storage::InMemoryBlobStore;
use crate::core::testing::{RecordingSpeaker, ScriptedProvider, SpeechEvent};
use crate::utils::logging::LoggingState;
use std::sync::Arc;
use tempfile::tempdir;

fn create_test_app(turns: Vec<Vec<crate::core::testing::ScriptStep>>) -> (ChatApp, RecordingSpeaker) {
    let speaker = RecordingSpeaker::default();
    let controller = ConversationController::new(
        Arc::new(ScriptedProvider::new(turns)),
        Arc::new(InMemoryBlobStore::new()),
        Box::new(speaker.clone()),
    );
    let logging = LoggingState::new(None).expect("logging");
    (ChatApp::new(controller, logging, "BFF Bot"), speaker)
}

#[test]
fn plain_text_is_sent_as_a_message() {
    let (mut app, _) = create_test_app(Vec::new());
    assert_eq!(
        process_input(&mut app, "  hello there \n"),
        CommandResult::ProcessAsMessage("hello there".to_string())
    );
}

#[test]
fn unknown_commands_are_reported_not_sent() {
    let (mut app, _) = create_test_app(Vec::new());
    assert_eq!(process_input(&mut app, "/dance"), CommandResult::Continue);
    let notices = app.take_notices();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("/dance"));
}

#[test]
fn bare_slash_is_not_sent() {
    let (mut app, _) = create_test_app(Vec::new());
    assert_eq!(process_input(&mut app, "/"), CommandResult::Continue);
    assert_eq!(process_input(&mut app, "  / hello"), CommandResult::Continue);
    let notices = app.take_notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|notice| notice.contains("Unknown command")));
}

#[test]
fn help_lists_every_command() {
    let (mut app, _) = create_test_app(Vec::new());
    process_input(&mut app, "/help");
    let help = app.take_notices().join("\n");
    for command in all_commands() {
        assert!(help.contains(&format!("/{}", command.name)), "{}", command.name);
    }
}

#[test]
fn suggestions_are_listed_and_sent_by_number() {
    let (mut app, _) = create_test_app(Vec::new());
    assert_eq!(process_input(&mut app, "/suggest"), CommandResult::Continue);
    assert!(app.take_notices()[0].contains(SUGGESTIONS[1]));

    assert_eq!(
        process_input(&mut app, "/suggest 3"),
        CommandResult::ProcessAsMessage("Tell me a joke!".to_string())
    );
    assert_eq!(process_input(&mut app, "/suggest 0"), CommandResult::Continue);
    assert_eq!(process_input(&mut app, "/suggest 9"), CommandResult::Continue);
}

#[test]
fn speech_command_toggles_and_sets() {
    let (mut app, speaker) = create_test_app(Vec::new());
    assert!(!app.controller.speech_enabled());

    process_input(&mut app, "/speech");
    assert!(app.controller.speech_enabled());
    process_input(&mut app, "/speech off");
    assert!(!app.controller.speech_enabled());
    assert_eq!(speaker.events(), vec![SpeechEvent::Cancelled]);

    process_input(&mut app, "/speech loud");
    assert_eq!(app.take_notices().last().map(String::as_str), Some("Usage: /speech [on|off]"));
}

#[test]
fn quit_and_exit_both_quit() {
    let (mut app, _) = create_test_app(Vec::new());
    assert_eq!(process_input(&mut app, "/quit"), CommandResult::Quit);
    assert_eq!(process_input(&mut app, "/EXIT"), CommandResult::Quit);
}

#[tokio::test]
async fn memory_command_lists_remembered_facts() {
    let (mut app, _) = create_test_app(vec![vec![
        r#"Yay [MEMORIZE]{"key":"pet_name","value":"Biscuit"}[/MEMORIZE]"#.into(),
    ]]);
    process_input(&mut app, "/memory");
    assert_eq!(app.take_notices(), vec!["Nothing remembered yet."]);

    app.controller.initialize().await.expect("initialize");
    app.controller.run_turn("my dog is Biscuit", |_| {}).await;
    assert_eq!(
        app.controller.memory().and_then(|m| m.iter().next().cloned()),
        Some(MemoryEntry::new("pet_name", "Biscuit"))
    );

    process_input(&mut app, "/memory");
    assert!(app.take_notices()[0].contains("pet name: Biscuit"));
}

#[tokio::test]
async fn dump_writes_visible_transcript_once() {
    let (mut app, _) = create_test_app(vec![vec![
        "Hi! ".into(),
        r#"[MEMORIZE]{"key":"name","value":"Sam"}[/MEMORIZE]"#.into(),
    ]]);
    app.controller.initialize().await.expect("initialize");
    app.controller.run_turn("I'm Sam", |_| {}).await;

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("dump.txt");
    let filename = path.to_string_lossy().into_owned();

    process_input(&mut app, &format!("/dump {filename}"));
    let contents = std::fs::read_to_string(&path).expect("dump written");
    assert!(contents.starts_with("BFF Bot: Hey bestie!"));
    assert!(contents.contains("You: I'm Sam\n\nBFF Bot: Hi!\n"));
    assert!(!contents.contains("MEMORIZE"));

    app.take_notices();
    process_input(&mut app, &format!("/dump {filename}"));
    assert!(app.take_notices()[0].contains("already exists"));
}

#[test]
fn dump_refuses_an_empty_conversation() {
    let (mut app, _) = create_test_app(Vec::new());
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.txt");
    process_input(&mut app, &format!("/dump {}", path.display()));
    assert!(app.take_notices()[0].contains("empty"));
    assert!(!path.exists());
}

#[test]
fn log_command_enables_logging() {
    let (mut app, _) = create_test_app(Vec::new());
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("chat.log");

    process_input(&mut app, &format!("/log {}", path.display()));
    assert!(app.logging.is_active());
    process_input(&mut app, "/log");
    assert!(!app.logging.is_active());
}
