use crate::api::{ChatApi, ConversationSummary, HealthStatus};
use crate::cli::ConversationCommand;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use prettytable::{format, Table};

const TITLE_WIDTH: usize = 40;
const SHORT_ID_WIDTH: usize = 8;

/// Handle conversation management commands
pub async fn handle_conversations(
    config: &Config,
    api: &dyn ChatApi,
    command: ConversationCommand,
) -> Result<()> {
    match command {
        ConversationCommand::List => {
            let conversations = api.list_conversations().await?;
            print_conversation_table(&conversations, None);
        }
        ConversationCommand::Create { title, category } => {
            let category = category.unwrap_or(config.chat.default_category);
            let created = api.create_conversation(&title, category).await?;
            println!(
                "{}",
                format!("Created conversation {} ({})", created.id, created.title).green()
            );
            println!(
                "Use {} to continue it.",
                format!("devassist chat --conversation {}", created.id).cyan()
            );
        }
        ConversationCommand::Delete { id } => {
            api.delete_conversation(&id).await?;
            println!("{}", format!("Deleted conversation {}", id).green());
        }
        ConversationCommand::Search { query } => {
            let conversations = if query.trim().is_empty() {
                api.list_conversations().await?
            } else {
                api.search_conversations(&query).await?
            };
            print_conversation_table(&conversations, None);
        }
    }

    Ok(())
}

/// Query backend health and print the result
pub async fn check_health(api: &dyn ChatApi) -> Result<()> {
    let status = api.health().await?;
    print_health(&status);
    Ok(())
}

/// Print a health report
pub fn print_health(status: &HealthStatus) {
    let label = if status.is_ok() {
        status.status.green()
    } else {
        status.status.yellow()
    };
    println!("Backend status: {}", label);
    if status.models.is_empty() {
        println!("Models:         {}", "none reported".dimmed());
    } else {
        println!("Models:         {}", status.models.join(", "));
    }
}

/// Print conversations as a table, marking `active` if present
pub fn print_conversation_table(conversations: &[ConversationSummary], active: Option<&str>) {
    if conversations.is_empty() {
        println!("{}", "No conversations found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Category".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for conversation in conversations {
        let marker = if active == Some(conversation.id.as_str()) {
            "*"
        } else {
            " "
        };
        let updated = conversation.updated_at.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            format!("{}{}", marker, short_id(&conversation.id)).cyan(),
            truncate_title(&conversation.title),
            conversation.category,
            conversation.message_count,
            updated
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
}

/// First characters of an id, enough to recognise it in a table
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_WIDTH) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Shorten long titles to fit the table
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_WIDTH {
        let head: String = title.chars().take(TITLE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

/// Resolve a possibly shortened id against the cached conversations
///
/// An exact match wins; otherwise a unique prefix match is accepted.
pub fn resolve_id<'a>(conversations: &'a [ConversationSummary], input: &str) -> Option<&'a str> {
    if let Some(exact) = conversations.iter().find(|c| c.id == input) {
        return Some(&exact.id);
    }

    let mut matches = conversations.iter().filter(|c| c.id.starts_with(input));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(&only.id),
        _ => None,
    }
}
