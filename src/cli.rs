//! Command-line interface definition for Devassist
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat command and one-shot conversation
//! management commands.

use crate::api::Category;
use clap::{Parser, Subcommand};

/// Devassist - chat with the team's coding assistant from the terminal
///
/// Conversations live on the assistant backend; this tool only talks to
/// its HTTP API.
#[derive(Parser, Debug, Clone)]
#[command(name = "devassist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend base URL from config
    #[arg(long)]
    pub base_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Devassist
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Resume an existing conversation instead of creating one
        #[arg(long)]
        conversation: Option<String>,

        /// Category for new messages (bug-fix, learning, general)
        #[arg(long)]
        category: Option<Category>,

        /// Title for the conversation created at start-up
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Manage conversations
    Conversations {
        /// Conversation management subcommand
        #[command(subcommand)]
        command: ConversationCommand,
    },

    /// Check backend liveness and available models
    Health,
}

/// Conversation management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConversationCommand {
    /// List all conversations
    List,

    /// Create a conversation
    Create {
        /// Conversation title
        #[arg(short, long)]
        title: String,

        /// Conversation category (bug-fix, learning, general)
        #[arg(long)]
        category: Option<Category>,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID
        id: String,
    },

    /// Search conversations by title or last message
    Search {
        /// Search text; empty lists everything
        #[arg(default_value = "")]
        query: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_chat_command() {
        let cli = Cli::try_parse_from(["devassist", "chat"]).unwrap();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Chat {
                conversation: None,
                category: None,
                title: None
            }
        ));
    }

    #[test]
    fn test_cli_parse_chat_with_options() {
        let cli = Cli::try_parse_from([
            "devassist",
            "chat",
            "--conversation",
            "abc-123",
            "--category",
            "bug-fix",
            "--title",
            "Flaky test",
        ])
        .unwrap();

        if let Commands::Chat {
            conversation,
            category,
            title,
        } = cli.command
        {
            assert_eq!(conversation.as_deref(), Some("abc-123"));
            assert_eq!(category, Some(Category::BugFix));
            assert_eq!(title.as_deref(), Some("Flaky test"));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_cli_rejects_unknown_category() {
        let result = Cli::try_parse_from(["devassist", "chat", "--category", "poetry"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "devassist",
            "--verbose",
            "--base-url",
            "http://assistant:8000",
            "health",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.base_url.as_deref(), Some("http://assistant:8000"));
        assert!(matches!(cli.command, Commands::Health));
    }

    #[test]
    fn test_cli_parse_conversation_create() {
        let cli = Cli::try_parse_from([
            "devassist",
            "conversations",
            "create",
            "--title",
            "Async Rust",
            "--category",
            "learning",
        ])
        .unwrap();

        match cli.command {
            Commands::Conversations {
                command: ConversationCommand::Create { title, category },
            } => {
                assert_eq!(title, "Async Rust");
                assert_eq!(category, Some(Category::Learning));
            }
            other => panic!("Expected conversations create, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_conversation_delete_and_search() {
        let cli = Cli::try_parse_from(["devassist", "conversations", "delete", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Conversations {
                command: ConversationCommand::Delete { ref id }
            } if id == "abc"
        ));

        let cli = Cli::try_parse_from(["devassist", "conversations", "search"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Conversations {
                command: ConversationCommand::Search { ref query }
            } if query.is_empty()
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["devassist"]).is_err());
    }
}
