use super::CommandResult;
use crate::app::ChatApp;

pub type CommandHandler = fn(&mut ChatApp, CommandInvocation<'_>) -> CommandResult;

pub struct CommandUsage {
    pub syntax: &'static str,
    pub description: &'static str,
}

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usages: &'static [CommandUsage],
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands().iter().find(|command| {
        command.name.eq_ignore_ascii_case(name)
            || command
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/help",
            description: "Show available commands.",
        }],
        handler: super::handlers::core::handle_help,
    },
    Command {
        name: "memory",
        aliases: &["memories"],
        usages: &[CommandUsage {
            syntax: "/memory",
            description: "List what your friend remembers about you.",
        }],
        handler: super::handlers::core::handle_memory,
    },
    Command {
        name: "speech",
        aliases: &["speak"],
        usages: &[
            CommandUsage {
                syntax: "/speech",
                description: "Toggle reading replies aloud.",
            },
            CommandUsage {
                syntax: "/speech on|off",
                description: "Turn reading replies aloud on or off.",
            },
        ],
        handler: super::handlers::core::handle_speech,
    },
    Command {
        name: "suggest",
        aliases: &[],
        usages: &[
            CommandUsage {
                syntax: "/suggest",
                description: "List conversation starters.",
            },
            CommandUsage {
                syntax: "/suggest <n>",
                description: "Send conversation starter number n.",
            },
        ],
        handler: super::handlers::core::handle_suggest,
    },
    Command {
        name: "log",
        aliases: &[],
        usages: &[
            CommandUsage {
                syntax: "/log <filename>",
                description: "Start logging the conversation to a file.",
            },
            CommandUsage {
                syntax: "/log",
                description: "Pause or resume logging.",
            },
        ],
        handler: super::handlers::io::handle_log,
    },
    Command {
        name: "dump",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/dump [filename]",
            description: "Export the conversation so far to a file.",
        }],
        handler: super::handlers::io::handle_dump,
    },
    Command {
        name: "quit",
        aliases: &["exit"],
        usages: &[CommandUsage {
            syntax: "/quit",
            description: "Leave the chat.",
        }],
        handler: super::handlers::core::handle_quit,
    },
];
