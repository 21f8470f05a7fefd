//! Backend API contract for Devassist
//!
//! [`ChatApi`] is the seam the conversation registry and chat sessions
//! depend on; [`ApiClient`] implements it over HTTP.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{
    parse_timestamp, Category, ChatContext, ChatMessage, ChatRequest, ChatResponse, CodeExample,
    ConversationSummary, HealthStatus, MessageKind, MessageMetadata, Sender, LOCAL_ID_PREFIX,
};

use crate::error::ApiError;
use async_trait::async_trait;

/// Result of a backend call: a decoded payload or a classified failure
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One operation per backend endpoint
///
/// Implementations must classify every failure into [`ApiError`]; callers
/// rely on `is_network()` to derive connection health.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `POST /api/chat`
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatResponse>;

    /// `GET /api/conversations`
    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>>;

    /// `GET /api/conversations/{id}/messages`
    ///
    /// Wire timestamps are converted to points in time; missing ones
    /// become "now".
    async fn conversation_messages(&self, conversation_id: &str) -> ApiResult<Vec<ChatMessage>>;

    /// `POST /api/conversations`
    async fn create_conversation(
        &self,
        title: &str,
        category: Category,
    ) -> ApiResult<ConversationSummary>;

    /// `DELETE /api/conversations/{id}`
    async fn delete_conversation(&self, conversation_id: &str) -> ApiResult<()>;

    /// `GET /api/conversations/search?q={query}`
    async fn search_conversations(&self, query: &str) -> ApiResult<Vec<ConversationSummary>>;

    /// `GET /api/health`
    async fn health(&self) -> ApiResult<HealthStatus>;
}
