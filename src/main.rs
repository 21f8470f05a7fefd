//! Devassist - terminal client for the coding assistant
//!
#![doc = "Devassist - terminal client for the coding assistant"]
#![doc = "Main entry point for the Devassist application."]

use anyhow::Result;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use devassist::api::{ApiClient, ChatApi};
use devassist::cli::{Cli, Commands};
use devassist::commands;
use devassist::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let api: Arc<dyn ChatApi> = Arc::new(ApiClient::new(&config)?);
    tracing::debug!("Using backend at {}", config.api.base_url);

    // Execute command
    match cli.command {
        Commands::Chat {
            conversation,
            category,
            title,
        } => {
            if let Some(id) = &conversation {
                tracing::debug!("Resuming conversation: {}", id);
            }
            if let Some(c) = &category {
                tracing::debug!("Using category override: {}", c);
            }

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config, api, conversation, category, title).await?;
            Ok(())
        }
        Commands::Conversations { command } => {
            tracing::info!("Starting conversation management command");
            commands::conversations::handle_conversations(&config, api.as_ref(), command).await?;
            Ok(())
        }
        Commands::Health => {
            commands::conversations::check_health(api.as_ref()).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "devassist=debug"
    } else {
        "devassist=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
