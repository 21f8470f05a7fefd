//! Test utilities for Devassist
//!
//! Provides [`MockApi`], an in-memory [`ChatApi`] with scripted chat
//! replies, plus builders for common payloads.

use crate::api::{
    ApiResult, Category, ChatApi, ChatMessage, ChatRequest, ChatResponse, ConversationSummary,
    HealthStatus, MessageMetadata, Sender,
};
use crate::error::ApiError;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct ChatReply {
    result: ApiResult<ChatResponse>,
    gate: Option<Arc<Notify>>,
}

#[derive(Default)]
struct MockState {
    conversations: Vec<ConversationSummary>,
    messages: HashMap<String, Vec<ChatMessage>>,
    chat_replies: VecDeque<ChatReply>,
    chat_requests: Vec<ChatRequest>,
    failure: Option<ApiError>,
    history_gate: Option<Arc<Notify>>,
    listing_gate: Option<Arc<Notify>>,
    next_id: usize,
    list_calls: usize,
    search_calls: usize,
    history_calls: usize,
}

/// In-memory backend double
///
/// Conversation endpoints behave like the real backend's store (newest
/// conversations are appended, search matches title or last message).
/// `fail_with` makes every conversation endpoint fail until reset. Chat
/// replies are consumed in order; a gated reply waits on its [`Notify`]
/// before resolving.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `send_message`
    pub fn push_chat_reply(&self, result: ApiResult<ChatResponse>) {
        self.state.lock().unwrap().chat_replies.push_back(ChatReply { result, gate: None });
    }

    /// Queue a result that is held back until `gate` is notified
    pub fn push_gated_chat_reply(&self, result: ApiResult<ChatResponse>, gate: Arc<Notify>) {
        self.state.lock().unwrap().chat_replies.push_back(ChatReply {
            result,
            gate: Some(gate),
        });
    }

    /// Seed a conversation into the backend store
    pub fn insert_conversation(&self, title: &str, category: Category) -> ConversationSummary {
        let mut state = self.state.lock().unwrap();
        let summary = summary(&format!("conv-{}", state.next_id), title, category);
        state.next_id += 1;
        state.conversations.push(summary.clone());
        summary
    }

    /// Seed a conversation's history
    pub fn insert_messages(&self, conversation_id: &str, messages: Vec<ChatMessage>) {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert(conversation_id.to_string(), messages);
    }

    /// Hold the next history fetch until `gate` is notified
    pub fn gate_next_history(&self, gate: Arc<Notify>) {
        self.state.lock().unwrap().history_gate = Some(gate);
    }

    /// Hold the next conversation listing until `gate` is notified
    pub fn gate_next_listing(&self, gate: Arc<Notify>) {
        self.state.lock().unwrap().listing_gate = Some(gate);
    }

    /// Make every conversation endpoint fail with `error`
    pub fn fail_with(&self, error: ApiError) {
        self.state.lock().unwrap().failure = Some(error);
    }

    /// Let conversation endpoints succeed again
    pub fn recover(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.state.lock().unwrap().chat_requests.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn search_calls(&self) -> usize {
        self.state.lock().unwrap().search_calls
    }

    pub fn history_requests(&self) -> usize {
        self.state.lock().unwrap().history_calls
    }

    fn check_failure(&self) -> ApiResult<()> {
        match &self.state.lock().unwrap().failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.chat_requests.push(request.clone());
            state.chat_replies.pop_front()
        };

        let Some(reply) = reply else {
            return Err(ApiError::http_status(500));
        };
        if let Some(gate) = reply.gate {
            gate.notified().await;
        }
        reply.result
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;
            state.listing_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure()?;
        Ok(self.state.lock().unwrap().conversations.clone())
    }

    async fn conversation_messages(&self, conversation_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.history_calls += 1;
            state.history_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_conversation(
        &self,
        title: &str,
        category: Category,
    ) -> ApiResult<ConversationSummary> {
        self.check_failure()?;
        Ok(self.insert_conversation(title, category))
    }

    async fn delete_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        state.conversations.retain(|c| c.id != conversation_id);
        state.messages.remove(conversation_id);
        Ok(())
    }

    async fn search_conversations(&self, query: &str) -> ApiResult<Vec<ConversationSummary>> {
        self.state.lock().unwrap().search_calls += 1;
        self.check_failure()?;
        let query = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&query)
                    || c.last_message.to_lowercase().contains(&query)
            })
            .cloned()
            .collect())
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.check_failure()?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            models: vec!["llama3.1".to_string()],
        })
    }
}

/// Build a conversation summary with fixed timestamps
pub fn summary(id: &str, title: &str, category: Category) -> ConversationSummary {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    ConversationSummary {
        id: id.to_string(),
        title: title.to_string(),
        category,
        last_message: String::new(),
        message_count: 0,
        created_at: created,
        updated_at: created + Duration::minutes(5),
    }
}

/// Build a successful chat response
pub fn chat_response(id: &str, content: &str) -> ChatResponse {
    ChatResponse {
        id: id.to_string(),
        content: content.to_string(),
        timestamp: "2024-01-01T09:00:00Z".to_string(),
        metadata: MessageMetadata {
            model: Some("llama3.1".to_string()),
            tokens: Some(0),
            processing_time: Some(120),
            confidence: None,
        },
        suggestions: None,
        code_examples: None,
    }
}

/// Build a message as the history endpoint would return it
pub fn history_message(id: &str, content: &str, sender: Sender) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        content: content.to_string(),
        sender,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        kind: None,
        category: Some(Category::General),
        metadata: None,
        suggestions: Vec::new(),
        code_examples: Vec::new(),
    }
}
