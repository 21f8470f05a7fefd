//! Devassist - terminal client for a conversational coding assistant
//!
//! This library holds the conversation and message state management that
//! sits between a user surface and the assistant's HTTP API: request
//! cancellation, optimistic message insertion, connection health derived
//! from error classification, and category-based context extraction.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Backend contract (`ChatApi`), wire types and the HTTP client
//! - `registry`: Cached conversation summaries
//! - `session`: Message sequence and request lifecycle for one conversation
//! - `context`: Code-block and error-text extraction for outgoing messages
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Terminal handlers used by the binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use devassist::{ApiClient, ChatSession, Config, ConversationRegistry};
//! use devassist::api::Category;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let api = Arc::new(ApiClient::new(&config)?);
//!     let mut registry = ConversationRegistry::connect(api.clone()).await;
//!     let created = registry.create("Lifetimes", Category::Learning).await?;
//!
//!     let session = ChatSession::new(api, created.id);
//!     session.send_text("What is 'static?", Category::Learning).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use api::{ApiClient, ChatApi};
pub use config::Config;
pub use context::extract_context;
pub use error::{ApiError, DevassistError, Result};
pub use registry::ConversationRegistry;
pub use session::{ChatSession, LoadOutcome, SendOutcome};

#[cfg(test)]
pub mod test_utils;
