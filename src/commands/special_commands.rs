//! Special commands parser for interactive chat
//!
//! This module parses the commands that can be entered during an
//! interactive tutoring session. Special commands allow users to:
//! - Start a new chat or switch to a stored one
//! - List stored sessions
//! - Attach an image to the next message
//! - Send one of the quick-start prompts
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/`; the command word is case-insensitive,
//! arguments are taken as written.

use crate::prompts::QUICK_START_PROMPTS;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Target of a `/switch` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    /// 1-based position in the `/list` output
    Index(usize),
    /// Full session id
    Id(String),
}

/// Special commands that can be executed during interactive chat
///
/// These commands change which session is active or provide information,
/// rather than being sent to the tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Clear the active session; the next message starts a new one
    NewChat,

    /// Show stored sessions, most recent first
    ListSessions,

    /// Make another session active
    Switch(SessionRef),

    /// Attach an image file to the next message
    AttachImage(PathBuf),

    /// Drop a pending image attachment
    ClearImage,

    /// Send the quick-start prompt with this 1-based number
    QuickStart(usize),

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the tutor as a regular message.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a command receives an invalid argument.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use ctutor::commands::special_commands::{parse_special_command, SessionRef, SpecialCommand};
///
/// let cmd = parse_special_command("/switch 2").unwrap();
/// assert_eq!(cmd, SpecialCommand::Switch(SessionRef::Index(2)));
///
/// let cmd = parse_special_command("what is a pointer?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/new" => no_argument("/new", arg, SpecialCommand::NewChat),
        "/list" | "/sessions" => no_argument("/list", arg, SpecialCommand::ListSessions),
        "/clear-image" => no_argument("/clear-image", arg, SpecialCommand::ClearImage),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        "/switch" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/switch".to_string(),
                    usage: "/switch <number|session-id>".to_string(),
                });
            }
            match arg.parse::<usize>() {
                Ok(0) => Err(CommandError::UnsupportedArgument {
                    command: "/switch".to_string(),
                    arg: arg.to_string(),
                }),
                Ok(n) => Ok(SpecialCommand::Switch(SessionRef::Index(n))),
                Err(_) => Ok(SpecialCommand::Switch(SessionRef::Id(arg.to_string()))),
            }
        }

        "/image" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/image".to_string(),
                    usage: "/image <path>".to_string(),
                })
            } else {
                Ok(SpecialCommand::AttachImage(PathBuf::from(arg)))
            }
        }

        "/quick" => {
            let usage = format!("/quick <1-{}>", QUICK_START_PROMPTS.len());
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/quick".to_string(),
                    usage,
                });
            }
            match arg.parse::<usize>() {
                Ok(n) if (1..=QUICK_START_PROMPTS.len()).contains(&n) => {
                    Ok(SpecialCommand::QuickStart(n))
                }
                _ => Err(CommandError::UnsupportedArgument {
                    command: "/quick".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }

        // Unknown command starting with "/"
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn no_argument(
    command: &str,
    arg: &str,
    parsed: SpecialCommand,
) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        Ok(parsed)
    } else {
        Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        })
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSIONS:
  /new              - Start a new chat (created when you send the next message)
  /list             - List stored chats, most recent first
  /sessions         - Same as /list
  /switch <n>       - Switch to chat number n from /list
  /switch <id>      - Switch to the chat with this id

ATTACHMENTS:
  /image <path>     - Attach an image (PNG, JPEG, WebP, GIF, BMP, TIFF) to the next message
  /clear-image      - Drop the pending attachment

QUICK START:
  /quick <1-4>      - Send one of the quick-start prompts shown at startup

SESSION CONTROL:
  /help             - Show this help message
  /?                - Same as /help
  exit, /exit       - Exit interactive mode
  quit, /quit       - Same as exit

NOTES:
  - Command names are case-insensitive
  - Regular text (not starting with /) is sent to the tutor
  - Chats are saved after every change and restored on the next start
"#
    );
}
