//! Special commands parser for interactive chat mode
//!
//! This module parses the slash commands that can be entered during an
//! interactive chat session. Special commands allow users to:
//! - Create, list, search, switch and delete conversations
//! - Change the category used for new messages
//! - Clear the visible transcript, check status and backend health
//! - Exit the session
//!
//! Commands are prefixed with `/`. The command word is case-insensitive;
//! arguments (conversation ids, titles, search text) are kept as typed.

use crate::api::Category;
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

/// Special commands that can be executed during interactive chat
///
/// These commands act on the conversation registry or the session rather
/// than being sent to the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Display help information
    Help,

    /// Create a conversation and switch to it
    ///
    /// The title is optional; the configured default title is used when
    /// omitted.
    NewConversation(Option<String>),

    /// List cached conversations, refreshing from the backend first
    ListConversations,

    /// Load another conversation's history and make it active
    SwitchConversation(String),

    /// Search conversations; an empty query lists everything
    Search(String),

    /// Delete a conversation
    DeleteConversation(String),

    /// Change the category used for new messages
    SwitchCategory(Category),

    /// Empty the visible transcript without touching the backend
    Clear,

    /// Display session status
    ShowStatus,

    /// Query backend health
    Health,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent as a regular chat message.
    None,
}

/// Parse a user input string into a special command
///
/// # Returns
///
/// Returns Ok(SpecialCommand) for valid commands or SpecialCommand::None for
/// regular messages.
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
/// use devassist::api::Category;
/// use devassist::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// let cmd = parse_special_command("/switch 3F1C-a2").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchConversation("3F1C-a2".to_string()));
///
/// let cmd = parse_special_command("/category bug-fix").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchCategory(Category::BugFix));
///
/// let cmd = parse_special_command("why does this panic?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') {
        return match lower.as_str() {
            "exit" | "quit" => Ok(SpecialCommand::Exit),
            _ => Ok(SpecialCommand::None),
        };
    }

    let (word, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match word.as_str() {
        "/help" | "/?" => no_argument(&word, arg, SpecialCommand::Help),
        "/new" => Ok(SpecialCommand::NewConversation(
            (!arg.is_empty()).then(|| arg.to_string()),
        )),
        "/list" => no_argument(&word, arg, SpecialCommand::ListConversations),
        "/switch" => required(&word, arg, "/switch <conversation_id>")
            .map(SpecialCommand::SwitchConversation),
        "/search" => Ok(SpecialCommand::Search(arg.to_string())),
        "/delete" => required(&word, arg, "/delete <conversation_id>")
            .map(SpecialCommand::DeleteConversation),
        "/category" => {
            let arg = required(&word, arg, "/category <bug-fix|learning|general>")?;
            arg.parse()
                .map(SpecialCommand::SwitchCategory)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: word.clone(),
                    arg,
                })
        }
        "/clear" => no_argument(&word, arg, SpecialCommand::Clear),
        "/status" => no_argument(&word, arg, SpecialCommand::ShowStatus),
        "/health" => no_argument(&word, arg, SpecialCommand::Health),
        "/exit" | "/quit" => no_argument(&word, arg, SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
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

fn required(command: &str, arg: &str, usage: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

/// Print help for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CONVERSATIONS:
  /new [title]      - Create a conversation and switch to it
  /list             - Refresh and list conversations
  /switch <id>      - Load a conversation's history and continue it
  /search [text]    - Search conversations (no text lists all)
  /delete <id>      - Delete a conversation

MESSAGES:
  /category <name>  - Category for new messages (bug-fix, learning, general)
  /clear            - Clear the visible transcript (server history is kept)
  Ctrl-C            - Cancel a reply that is still pending

SESSION INFORMATION:
  /status           - Show conversation, category and connection state
  /health           - Check the assistant backend and list its models
  /help             - Show this help message
  /?                - Same as /help

SESSION CONTROL:
  exit              - Exit interactive mode
  quit              - Same as exit

NOTES:
  - Command names are case-insensitive; ids and titles are not
  - Regular text (not starting with /) is sent to the assistant
  - A fenced code block (```lang ... ```) is attached as code context
  - In bug-fix mode, messages mentioning errors are attached as error context
"#
    );
}
