/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive chat loop
- `conversations`: One-shot conversation management and health output
- `special_commands`: Slash-command parser for the chat loop
- `notice`: Time-limited error notices

Handlers are thin: conversation state lives in the library's registry and
session types, and every backend call goes through
[`ChatApi`](crate::api::ChatApi).
*/

use crate::api::{ChatMessage, MessageKind, MessageMetadata, Sender};
use colored::Colorize;

// Conversation management and health handlers
pub mod conversations;

// Time-limited notices
pub mod notice;

// Special commands parser for the chat loop
pub mod special_commands;

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Connects the conversation registry, opens or creates a conversation,
    //! and runs a readline-based loop that sends user input through the
    //! chat session. A line that opens a ``` fence keeps the editor reading
    //! until the fence closes, so code blocks arrive as one message. Ctrl-C
    //! while a reply or a backend command is pending abandons it.

    use super::conversations::{print_conversation_table, print_health, resolve_id, short_id};
    use super::notice::{NoticeBoard, GENERIC_NOTICE};
    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::api::{Category, ChatApi};
    use crate::config::Config;
    use crate::context::has_open_fence;
    use crate::error::{DevassistError, Result};
    use crate::registry::ConversationRegistry;
    use crate::session::{ChatSession, LoadOutcome, SendOutcome};
    use rustyline::completion::Completer;
    use rustyline::error::ReadlineError;
    use rustyline::highlight::Highlighter;
    use rustyline::hint::Hinter;
    use rustyline::history::DefaultHistory;
    use rustyline::validate::{ValidationContext, ValidationResult, Validator};
    use rustyline::{Editor, Helper};
    use std::sync::Arc;

    /// Line editor helper that treats an unclosed ``` fence as incomplete
    /// input, letting Enter insert a newline inside a code block
    pub struct FenceHelper;

    impl Completer for FenceHelper {
        type Candidate = String;
    }

    impl Hinter for FenceHelper {
        type Hint = String;
    }

    impl Highlighter for FenceHelper {}

    impl Validator for FenceHelper {
        fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
            if has_open_fence(ctx.input()) {
                Ok(ValidationResult::Incomplete)
            } else {
                Ok(ValidationResult::Valid(None))
            }
        }
    }

    impl Helper for FenceHelper {}

    /// Whether the loop keeps reading input after a line was handled
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LoopControl {
        Continue,
        Exit,
    }

    /// Everything the chat loop acts on between two prompts
    pub struct ChatState {
        config: Config,
        api: Arc<dyn ChatApi>,
        registry: ConversationRegistry,
        session: ChatSession,
        category: Category,
        notices: NoticeBoard,
    }

    impl ChatState {
        /// Connect the registry and open the starting conversation
        ///
        /// With `conversation` its history is loaded; a failed load is
        /// reported as a notice and the session stays bound to the id so
        /// the user can retry. Without it a new conversation is created.
        pub async fn start(
            config: Config,
            api: Arc<dyn ChatApi>,
            conversation: Option<String>,
            category: Option<Category>,
            title: Option<String>,
        ) -> Self {
            let explicit_category = category;
            let category = category.unwrap_or(config.chat.default_category);
            let notices = NoticeBoard::new(config.chat.notice_duration());
            let registry = ConversationRegistry::connect(api.clone()).await;

            let mut state = Self {
                session: ChatSession::new(api.clone(), conversation.clone().unwrap_or_default()),
                config,
                api,
                registry,
                category,
                notices,
            };

            state.take_registry_error();

            match conversation {
                Some(id) => match state.session.load(&id).await {
                    Ok(_) if explicit_category.is_none() => state.adopt_category(&id),
                    Ok(_) => {}
                    Err(error) => state.notices.post(error.message()),
                },
                None => state.open_new(title).await,
            }

            state
        }

        pub fn session(&self) -> &ChatSession {
            &self.session
        }

        pub fn registry(&self) -> &ConversationRegistry {
            &self.registry
        }

        pub fn category(&self) -> Category {
            self.category
        }

        pub fn notices(&mut self) -> &mut NoticeBoard {
            &mut self.notices
        }

        /// Create a conversation and bind the emptied session to it
        ///
        /// If the backend refuses, the session gets a fresh client-side id
        /// so the user can keep typing; the failure becomes a notice.
        async fn open_new(&mut self, title: Option<String>) {
            let title = title.unwrap_or_else(|| self.config.chat.default_title.clone());
            let id = match self.registry.create(&title, self.category).await {
                Ok(created) => created.id,
                Err(error) => {
                    self.notices.post(error.message());
                    self.registry.clear_error();
                    uuid::Uuid::new_v4().to_string()
                }
            };

            self.session.clear();
            self.session.set_conversation_id(id);
        }

        /// Take the category of a cached conversation, if it is known
        fn adopt_category(&mut self, conversation_id: &str) {
            if let Some(summary) = self.registry.get(conversation_id) {
                self.category = summary.category;
            }
        }

        /// Move a recorded registry failure onto the notice board
        fn take_registry_error(&mut self) {
            if let Some(error) = self.registry.error().map(str::to_string) {
                self.notices.post(error);
                self.registry.clear_error();
            }
        }

        /// Resolve a typed id (or unique prefix) against the cached list
        fn resolve(&self, input: &str) -> String {
            resolve_id(self.registry.conversations(), input)
                .unwrap_or(input)
                .to_string()
        }

        /// Colored prompt showing category and connection state
        pub fn prompt(&self) -> String {
            let connection = if self.session.is_connected() {
                "online".green()
            } else {
                "offline".red()
            };
            format!(
                "[{}][{}] {} >> ",
                self.category.as_str().cyan(),
                connection,
                short_id(&self.session.conversation_id())
            )
        }

        /// Apply one slash command
        pub async fn handle_command(&mut self, command: SpecialCommand) -> LoopControl {
            match command {
                SpecialCommand::Help => print_help(),
                SpecialCommand::NewConversation(title) => {
                    self.open_new(title).await;
                    println!(
                        "Started conversation {}\n",
                        self.session.conversation_id().cyan()
                    );
                }
                SpecialCommand::ListConversations => {
                    self.registry.load().await;
                    self.take_registry_error();
                    let active = self.session.conversation_id();
                    print_conversation_table(self.registry.conversations(), Some(&active));
                }
                SpecialCommand::Search(query) => {
                    self.registry.search(&query).await;
                    self.take_registry_error();
                    let active = self.session.conversation_id();
                    print_conversation_table(self.registry.conversations(), Some(&active));
                }
                SpecialCommand::SwitchConversation(input) => {
                    let id = self.resolve(&input);
                    match self.session.load(&id).await {
                        Ok(LoadOutcome::Applied) => {
                            self.adopt_category(&id);
                            println!("Switched to conversation {}\n", id.cyan());
                            for message in self.session.messages() {
                                print_message(&message);
                            }
                        }
                        Ok(LoadOutcome::Superseded) => {
                            println!("{}\n", "Switch cancelled".yellow());
                        }
                        Err(error) => self.notices.post(error.message()),
                    }
                }
                SpecialCommand::DeleteConversation(input) => {
                    let id = self.resolve(&input);
                    match self.registry.delete(&id).await {
                        Ok(()) => {
                            println!("{}", format!("Deleted conversation {}", id).green());
                            if id == self.session.conversation_id() {
                                self.open_new(None).await;
                                println!(
                                    "Started conversation {}\n",
                                    self.session.conversation_id().cyan()
                                );
                            }
                        }
                        Err(error) => {
                            self.notices.post(error.message());
                            self.registry.clear_error();
                        }
                    }
                }
                SpecialCommand::SwitchCategory(category) => {
                    self.category = category;
                    println!("Category set to {}\n", category.as_str().cyan());
                }
                SpecialCommand::Clear => {
                    self.session.clear();
                    println!("Transcript cleared\n");
                }
                SpecialCommand::ShowStatus => self.print_status(),
                SpecialCommand::Health => match self.api.health().await {
                    Ok(status) => print_health(&status),
                    Err(error) => self.notices.post(error.message()),
                },
                SpecialCommand::Exit => return LoopControl::Exit,
                SpecialCommand::None => {}
            }
            LoopControl::Continue
        }

        /// Send a message, cancelling it if Ctrl-C arrives first
        ///
        /// # Errors
        ///
        /// Returns error if the interrupt handler cannot be installed; the
        /// pending request is abandoned in that case.
        pub async fn send_interruptible(&self, text: &str) -> Result<SendOutcome> {
            let send = self.session.send_text(text, self.category);
            tokio::pin!(send);

            tokio::select! {
                outcome = &mut send => Ok(outcome),
                signal = tokio::signal::ctrl_c() => {
                    signal.map_err(DevassistError::Io)?;
                    self.session.cancel();
                    Ok(send.await)
                }
            }
        }

        /// Apply a slash command, abandoning it if Ctrl-C arrives first
        ///
        /// Registry and session state stay consistent when a command is
        /// dropped mid-request: their loading flags are lowered on drop.
        ///
        /// # Errors
        ///
        /// Returns error if the interrupt handler cannot be installed.
        async fn handle_command_interruptible(
            &mut self,
            command: SpecialCommand,
        ) -> Result<LoopControl> {
            tokio::select! {
                control = self.handle_command(command) => Ok(control),
                signal = tokio::signal::ctrl_c() => {
                    signal.map_err(DevassistError::Io)?;
                    println!("{}\n", "Command interrupted".yellow());
                    Ok(LoopControl::Continue)
                }
            }
        }

        /// Handle one line of input
        ///
        /// # Errors
        ///
        /// Returns unclassified errors; classified backend failures are
        /// already reflected in the transcript or the notice board.
        pub async fn handle_line(&mut self, line: &str) -> Result<LoopControl> {
            let command = match parse_special_command(line) {
                Ok(command) => command,
                Err(e) => {
                    println!("{}\n", e.to_string().red());
                    return Ok(LoopControl::Continue);
                }
            };

            if command != SpecialCommand::None {
                return self.handle_command_interruptible(command).await;
            }

            match self.send_interruptible(line).await? {
                SendOutcome::Delivered | SendOutcome::Failed(_) => {
                    if let Some(reply) = self.session.messages().last() {
                        print_message(reply);
                    }
                }
                SendOutcome::Superseded => println!("{}\n", "Request cancelled".yellow()),
                SendOutcome::Skipped => {}
            }
            Ok(LoopControl::Continue)
        }

        fn print_status(&self) {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                    Devassist Session Status                  ║");
            println!("╚══════════════════════════════════════════════════════════════╝\n");
            println!("Backend:           {}", self.config.api.base_url);
            println!("Conversation:      {}", self.session.conversation_id().cyan());
            if let Some(summary) = self.registry.get(&self.session.conversation_id()) {
                println!("Title:             {}", summary.title);
            }
            println!("Category:          {}", self.category.as_str().cyan());
            println!(
                "Connection:        {}",
                if self.session.is_connected() {
                    "connected".green()
                } else {
                    "disconnected".red()
                }
            );
            println!("Conversation Size: {} messages", self.session.message_count());
            println!("Known Conversations: {}", self.registry.conversations().len());
            println!();
        }
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `api` - Backend client
    /// * `conversation` - Existing conversation to resume
    /// * `category` - Override for the configured default category
    /// * `title` - Title for the conversation created at start-up
    pub async fn run_chat(
        config: Config,
        api: Arc<dyn ChatApi>,
        conversation: Option<String>,
        category: Option<Category>,
        title: Option<String>,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut rl: Editor<FenceHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(FenceHelper));
        let mut state = ChatState::start(config, api, conversation, category, title).await;

        print_welcome_banner(&state);
        for message in state.session().messages() {
            print_message(&message);
        }

        loop {
            if let Some(notice) = state.notices().active() {
                println!("{}\n", format!("! {}", notice.message).red());
            }

            match rl.readline(&state.prompt()) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let result = match rl.add_history_entry(trimmed) {
                        Ok(_) => state.handle_line(trimmed).await,
                        Err(e) => Err(DevassistError::from(e).into()),
                    };

                    match result {
                        Ok(LoopControl::Continue) => {}
                        Ok(LoopControl::Exit) => break,
                        Err(e) => {
                            tracing::error!("Unhandled error in chat loop: {:#}", e);
                            state.notices().post(GENERIC_NOTICE);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome_banner(state: &ChatState) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║          Devassist Interactive Chat - Welcome!               ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!(
            "Conversation: {}",
            state.session().conversation_id().cyan()
        );
        println!("Category:     {}\n", state.category().as_str().cyan());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

}

/// Render one message to the terminal
pub fn print_message(message: &ChatMessage) {
    let time = message.timestamp.format("%H:%M");
    match (message.sender, message.kind) {
        (_, Some(MessageKind::Error)) => {
            println!("{} {}\n", format!("[{}]", time).dimmed(), message.content.red());
            return;
        }
        (Sender::User, _) => println!(
            "{} {} {}",
            format!("[{}]", time).dimmed(),
            "you:".bold(),
            message.content
        ),
        (Sender::Ai, _) => println!(
            "{} {} {}",
            format!("[{}]", time).dimmed(),
            "assistant:".green().bold(),
            message.content
        ),
    }

    for example in &message.code_examples {
        println!("\n{}", format!("```{}", example.language).dimmed());
        println!("{}", example.code);
        println!("{}", "```".dimmed());
        if !example.explanation.is_empty() {
            println!("{}", example.explanation.italic());
        }
    }

    if !message.suggestions.is_empty() {
        println!("\n{}", "Suggestions:".bold());
        for suggestion in &message.suggestions {
            println!("  - {}", suggestion);
        }
    }

    if let Some(line) = message.metadata.as_ref().and_then(format_metadata) {
        println!("{}", line.dimmed());
    }
    println!();
}

/// One-line summary of response metadata, if it carries anything
pub fn format_metadata(metadata: &MessageMetadata) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(model) = &metadata.model {
        parts.push(model.clone());
    }
    if let Some(tokens) = metadata.tokens {
        parts.push(format!("{} tokens", tokens));
    }
    if let Some(ms) = metadata.processing_time {
        parts.push(format!("{} ms", ms));
    }
    if let Some(confidence) = metadata.confidence {
        parts.push(format!("confidence {:.0}%", confidence * 100.0));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" · "))
    }
}
