//! Conversation registry
//!
//! Client-side cache of conversation summaries. The cache is only ever
//! replaced from backend responses: loads and searches swap it wholesale,
//! creation prepends the returned summary, deletion removes an entry only
//! after the backend confirmed it.

use crate::api::{ApiResult, Category, ChatApi, ConversationSummary};
use crate::error::ApiError;
use std::sync::Arc;

/// Raises the loading flag for as long as it lives
///
/// A listing whose future is dropped mid-request still lowers the flag.
struct LoadingFlag<'a>(&'a mut bool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Cached conversation list plus its error and loading state
///
/// There is one registry per process. It is created with
/// [`ConversationRegistry::connect`], which performs the first load, and
/// handed by reference to whatever needs it.
pub struct ConversationRegistry {
    api: Arc<dyn ChatApi>,
    conversations: Vec<ConversationSummary>,
    error: Option<String>,
    loading: bool,
}

impl ConversationRegistry {
    /// Create the registry and perform the initial load
    ///
    /// A failed initial load leaves an empty cache and sets
    /// [`error`](Self::error).
    pub async fn connect(api: Arc<dyn ChatApi>) -> Self {
        let mut registry = Self {
            api,
            conversations: Vec::new(),
            error: None,
            loading: false,
        };
        registry.load().await;
        registry
    }

    /// Cached summaries, most recently created first after local creates
    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    /// Message of the last failed operation, if it has not been cleared
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a list or search request is outstanding
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Look up a cached summary by identity
    pub fn get(&self, conversation_id: &str) -> Option<&ConversationSummary> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    /// Dismiss the current error
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn record_failure(&mut self, operation: &str, error: &ApiError) {
        tracing::warn!(
            "Conversation {} failed: {} ({})",
            operation,
            error.message(),
            error.code()
        );
        self.error = Some(error.message().to_string());
    }

    /// Fetch the full list and replace the cache
    ///
    /// On failure the previous cache is kept and the error is recorded.
    pub async fn load(&mut self) {
        let result = {
            let _loading = LoadingFlag::raise(&mut self.loading);
            self.api.list_conversations().await
        };
        self.apply_listing("load", result);
    }

    fn apply_listing(&mut self, operation: &str, result: ApiResult<Vec<ConversationSummary>>) {
        match result {
            Ok(conversations) => {
                tracing::debug!("Conversation {} returned {} entries", operation, conversations.len());
                self.conversations = conversations;
                self.error = None;
            }
            Err(error) => self.record_failure(operation, &error),
        }
    }

    /// Create a conversation and prepend it to the cache
    ///
    /// # Errors
    ///
    /// Returns the classified error (also recorded in
    /// [`error`](Self::error)) so callers can abort dependent actions.
    pub async fn create(
        &mut self,
        title: &str,
        category: Category,
    ) -> ApiResult<ConversationSummary> {
        match self.api.create_conversation(title, category).await {
            Ok(summary) => {
                tracing::info!("Created conversation {} ({})", summary.id, summary.title);
                self.conversations.insert(0, summary.clone());
                self.error = None;
                Ok(summary)
            }
            Err(error) => {
                self.record_failure("create", &error);
                Err(error)
            }
        }
    }

    /// Delete a conversation, then drop it from the cache
    ///
    /// The cache is untouched unless the backend confirmed the deletion.
    ///
    /// # Errors
    ///
    /// Returns the classified error, which is also recorded in
    /// [`error`](Self::error).
    pub async fn delete(&mut self, conversation_id: &str) -> ApiResult<()> {
        match self.api.delete_conversation(conversation_id).await {
            Ok(()) => {
                tracing::info!("Deleted conversation {}", conversation_id);
                self.conversations.retain(|c| c.id != conversation_id);
                self.error = None;
                Ok(())
            }
            Err(error) => {
                self.record_failure("delete", &error);
                Err(error)
            }
        }
    }

    /// Replace the cache with search results
    ///
    /// A blank query is a full [`load`](Self::load).
    pub async fn search(&mut self, query: &str) {
        if query.trim().is_empty() {
            self.load().await;
            return;
        }

        let result = {
            let _loading = LoadingFlag::raise(&mut self.loading);
            self.api.search_conversations(query).await
        };
        self.apply_listing("search", result);
    }
}
