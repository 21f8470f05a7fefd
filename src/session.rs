//! Chat session state for one active conversation
//!
//! A [`ChatSession`] owns the ordered message sequence, the loading flag,
//! and the connection flag derived from request outcomes. Only one request
//! is outstanding at a time. Starting a load, clearing, or cancelling
//! supersedes it: the transport future is aborted through a
//! [`CancellationToken`], and a generation counter compared on completion
//! keeps a late response from ever reaching the sequence.

use crate::api::{ApiResult, Category, ChatApi, ChatContext, ChatMessage, ChatRequest};
use crate::context::extract_context;
use crate::error::ApiError;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// What became of a call to [`ChatSession::send`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Nothing was sent: blank content, or another request was in flight
    Skipped,
    /// The AI answer was appended
    Delivered,
    /// The request failed; a synthesized error message was appended
    Failed(ApiError),
    /// The request was cancelled or superseded before its result applied
    Superseded,
}

/// What became of a successful call to [`ChatSession::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The history replaced the sequence and the session was rebound
    Applied,
    /// A later load, clear or cancel took over; nothing was applied
    Superseded,
}

#[derive(Debug)]
struct SessionState {
    conversation_id: String,
    messages: Vec<ChatMessage>,
    loading: bool,
    connected: bool,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl SessionState {
    /// Abandon the outstanding request, if any, and invalidate its result
    fn supersede(&mut self) {
        if let Some(token) = self.in_flight.take() {
            tracing::debug!("Cancelling in-flight request (generation {})", self.generation);
            token.cancel();
        }
        self.generation += 1;
        self.loading = false;
    }

    /// Start a new request and return its cancellation token and generation
    fn begin(&mut self) -> (CancellationToken, u64) {
        self.supersede();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        self.loading = true;
        (token, self.generation)
    }
}

/// Clears the loading flag and in-flight handle when a request ends,
/// however it ends, unless a newer request has taken over the session.
struct InFlightGuard<'a> {
    session: &'a ChatSession,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.session.state();
        if state.generation == self.generation {
            state.loading = false;
            state.in_flight = None;
        }
    }
}

/// Client-side controller for one conversation's messages
///
/// All methods take `&self`; state changes happen under a lock that is
/// never held across an await, so concurrent calls on the same session
/// interleave only at network I/O.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use devassist::api::{ApiClient, Category};
/// use devassist::config::Config;
/// use devassist::session::ChatSession;
///
/// # async fn example() -> anyhow::Result<()> {
/// let api = Arc::new(ApiClient::new(&Config::default())?);
/// let session = ChatSession::new(api, "3f1c0a2e");
/// session.load("3f1c0a2e").await?;
/// session.send_text("What does `?` do?", Category::Learning).await;
/// # Ok(())
/// # }
/// ```
pub struct ChatSession {
    api: Arc<dyn ChatApi>,
    state: Mutex<SessionState>,
}

impl ChatSession {
    /// Create an idle, connected session bound to a conversation
    pub fn new(api: Arc<dyn ChatApi>, conversation_id: impl Into<String>) -> Self {
        Self {
            api,
            state: Mutex::new(SessionState {
                conversation_id: conversation_id.into(),
                messages: Vec::new(),
                loading: false,
                connected: true,
                generation: 0,
                in_flight: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the message sequence, in insertion order
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state().messages.clone()
    }

    /// Number of messages in the sequence
    pub fn message_count(&self) -> usize {
        self.state().messages.len()
    }

    /// Whether a request is outstanding
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// Whether the backend was reachable on the last completed request
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Conversation that sends are addressed to
    pub fn conversation_id(&self) -> String {
        self.state().conversation_id.clone()
    }

    /// Point the session at another conversation without touching the
    /// message sequence
    pub fn set_conversation_id(&self, conversation_id: impl Into<String>) {
        self.state().conversation_id = conversation_id.into();
    }

    /// Run `request` unless it is cancelled first
    ///
    /// Returns `None` when cancelled. A `Some` result still has to be
    /// checked against the current generation before it is applied.
    async fn run<T, F>(&self, token: CancellationToken, generation: u64, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = request => Some(result),
        };

        if result.is_none() {
            tracing::debug!("Request cancelled (generation {})", generation);
        }
        result
    }

    /// Send a message and append the exchange to the sequence
    ///
    /// Blank content, or a call made while another request is in flight,
    /// is a no-op. Otherwise the user message is appended immediately, the
    /// request is issued, and either the AI answer or a synthesized error
    /// message follows it. The connection flag becomes false only for
    /// network-classified failures.
    pub async fn send(
        &self,
        content: &str,
        category: Category,
        context: Option<ChatContext>,
    ) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Skipped;
        }

        let (request, token, generation) = {
            let mut state = self.state();
            if state.loading {
                tracing::debug!("Ignoring send while a request is in flight");
                return SendOutcome::Skipped;
            }

            state.messages.push(ChatMessage::user(content, category));
            let (token, generation) = state.begin();
            let request = ChatRequest {
                message: content.to_string(),
                conversation_id: state.conversation_id.clone(),
                category,
                context: context.filter(|c| !c.is_empty()),
            };
            (request, token, generation)
        };

        let _guard = InFlightGuard {
            session: self,
            generation,
        };

        let Some(result) = self
            .run(token, generation, self.api.send_message(&request))
            .await
        else {
            return SendOutcome::Superseded;
        };

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Discarding stale chat response (generation {})", generation);
            return SendOutcome::Superseded;
        }

        match result {
            Ok(response) => {
                state
                    .messages
                    .push(ChatMessage::from_response(response, category));
                state.connected = true;
                SendOutcome::Delivered
            }
            Err(error) => {
                tracing::warn!(
                    "Message to conversation {} failed: {} ({})",
                    request.conversation_id,
                    error.message(),
                    error.code()
                );
                state.connected = !error.is_network();
                state
                    .messages
                    .push(ChatMessage::error(error.message(), category));
                SendOutcome::Failed(error)
            }
        }
    }

    /// Extract a context bundle from `content`, then [`send`](Self::send)
    pub async fn send_text(&self, content: &str, category: Category) -> SendOutcome {
        let context = extract_context(content, category);
        self.send(content, category, context).await
    }

    /// Replace the sequence with a conversation's history
    ///
    /// On success the session is rebound to `conversation_id`. On failure
    /// the sequence and binding are left as they were and the error is
    /// returned. A load superseded by a later call returns
    /// [`LoadOutcome::Superseded`] without applying anything.
    pub async fn load(&self, conversation_id: &str) -> ApiResult<LoadOutcome> {
        let (token, generation) = self.state().begin();
        let _guard = InFlightGuard {
            session: self,
            generation,
        };

        let Some(result) = self
            .run(
                token,
                generation,
                self.api.conversation_messages(conversation_id),
            )
            .await
        else {
            return Ok(LoadOutcome::Superseded);
        };

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Discarding stale history for {}", conversation_id);
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok(messages) => {
                tracing::debug!(
                    "Loaded {} messages for conversation {}",
                    messages.len(),
                    conversation_id
                );
                state.messages = messages;
                state.conversation_id = conversation_id.to_string();
                state.connected = true;
                Ok(LoadOutcome::Applied)
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to load conversation {}: {} ({})",
                    conversation_id,
                    error.message(),
                    error.code()
                );
                state.connected = !error.is_network();
                Err(error)
            }
        }
    }

    /// Empty the sequence without any network call
    ///
    /// An outstanding request is abandoned so its result cannot land in
    /// the emptied sequence.
    pub fn clear(&self) {
        let mut state = self.state();
        state.supersede();
        state.messages.clear();
    }

    /// Abandon the outstanding request, if any
    ///
    /// Returns whether a request was actually cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = self.state();
        let had_request = state.in_flight.is_some();
        state.supersede();
        had_request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MessageKind, Sender};
    use crate::error::{HTTP_ERROR, NETWORK_ERROR};
    use crate::test_utils::{chat_response, history_message, MockApi};
    use tokio::sync::Notify;

    fn session_with(api: &Arc<MockApi>) -> ChatSession {
        ChatSession::new(api.clone(), "conv-1")
    }

    async fn wait_for_requests(api: &MockApi, count: usize) {
        while api.chat_requests().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_new_session_is_idle_and_connected() {
        let api = Arc::new(MockApi::new());
        let session = session_with(&api);
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
        assert!(session.is_connected());
        assert_eq!(session.conversation_id(), "conv-1");
    }

    #[tokio::test]
    async fn test_blank_send_is_inert() {
        let api = Arc::new(MockApi::new());
        let session = session_with(&api);

        for content in ["", "   ", "\n\t"] {
            let outcome = session.send(content, Category::General, None).await;
            assert_eq!(outcome, SendOutcome::Skipped);
        }

        assert!(session.messages().is_empty());
        assert!(api.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_successful_send_appends_user_then_ai() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "Use an Option")));
        let session = session_with(&api);

        let outcome = session.send("How do I avoid null?", Category::Learning, None).await;

        assert_eq!(outcome, SendOutcome::Delivered);
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "How do I avoid null?");
        assert!(messages[0].is_local());
        assert_eq!(messages[1].sender, Sender::Ai);
        assert_eq!(messages[1].id, "ai-1");
        assert_eq!(messages[1].content, "Use an Option");
        assert!(!session.is_loading());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_request_targets_session_conversation() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);
        let context = ChatContext {
            framework: Some("axum".to_string()),
            ..Default::default()
        };

        session
            .send("routing question", Category::General, Some(context.clone()))
            .await;

        let requests = api.chat_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].conversation_id, "conv-1");
        assert_eq!(requests[0].category, Category::General);
        assert_eq!(requests[0].context, Some(context));
    }

    #[tokio::test]
    async fn test_empty_context_is_not_attached() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);

        session
            .send("hi", Category::General, Some(ChatContext::default()))
            .await;

        assert_eq!(api.chat_requests()[0].context, None);
    }

    #[tokio::test]
    async fn test_send_text_extracts_context() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);

        session
            .send_text("it failed with undefined", Category::BugFix)
            .await;

        let context = api.chat_requests()[0].context.clone().unwrap();
        assert_eq!(
            context.error_message.as_deref(),
            Some("it failed with undefined")
        );
    }

    #[tokio::test]
    async fn test_network_failure_appends_error_and_disconnects() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Err(ApiError::network("connection refused")));
        let session = session_with(&api);

        let outcome = session.send("hello", Category::General, None).await;

        assert!(matches!(outcome, SendOutcome::Failed(ref e) if e.code() == NETWORK_ERROR));
        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Ai);
        assert_eq!(messages[1].kind, Some(MessageKind::Error));
        assert!(messages[1]
            .content
            .contains(ApiError::network("x").message()));
        assert!(!session.is_loading());
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_http_failure_keeps_connection() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Err(ApiError::network("down")));
        api.push_chat_reply(Err(ApiError::http_status(500)));
        let session = session_with(&api);

        session.send("first", Category::General, None).await;
        assert!(!session.is_connected());

        let outcome = session.send("second", Category::General, None).await;
        assert!(matches!(outcome, SendOutcome::Failed(ref e) if e.code() == HTTP_ERROR));
        assert!(session.is_connected());
        assert_eq!(session.message_count(), 4);
        assert!(session.messages()[3].content.contains("500"));
    }

    #[tokio::test]
    async fn test_backend_error_code_keeps_connection() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Err(ApiError::Http {
            status: 502,
            message: "model offline".to_string(),
            code: "MODEL_PROVIDER_ERROR".to_string(),
            details: None,
        }));
        let session = session_with(&api);

        session.send("hello", Category::General, None).await;

        assert!(session.is_connected());
        assert!(session.messages()[1].content.contains("model offline"));
    }

    #[tokio::test]
    async fn test_success_after_network_failure_reconnects() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Err(ApiError::network("down")));
        api.push_chat_reply(Ok(chat_response("ai-2", "back")));
        let session = session_with(&api);

        session.send("one", Category::General, None).await;
        assert!(!session.is_connected());
        session.send("two", Category::General, None).await;
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_send_while_in_flight_is_noop() {
        let api = Arc::new(MockApi::new());
        let gate = Arc::new(Notify::new());
        api.push_gated_chat_reply(Ok(chat_response("ai-1", "first answer")), gate.clone());
        let session = session_with(&api);

        let (first, second) = tokio::join!(
            session.send("first", Category::General, None),
            async {
                wait_for_requests(&api, 1).await;
                assert!(session.is_loading());
                let outcome = session.send("second", Category::General, None).await;
                gate.notify_one();
                outcome
            }
        );

        assert_eq!(first, SendOutcome::Delivered);
        assert_eq!(second, SendOutcome::Skipped);
        assert_eq!(api.chat_requests().len(), 1);
        let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["first", "first answer"]);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_superseded_send_result_is_discarded() {
        let api = Arc::new(MockApi::new());
        let gate = Arc::new(Notify::new());
        api.push_gated_chat_reply(Ok(chat_response("ai-1", "stale answer")), gate.clone());
        api.push_chat_reply(Ok(chat_response("ai-2", "fresh answer")));
        let session = session_with(&api);

        let (first, second) = tokio::join!(
            session.send("first", Category::General, None),
            async {
                wait_for_requests(&api, 1).await;
                assert!(session.cancel());
                let outcome = session.send("second", Category::General, None).await;
                gate.notify_one();
                outcome
            }
        );

        assert_eq!(first, SendOutcome::Superseded);
        assert_eq!(second, SendOutcome::Delivered);
        let contents: Vec<String> = session.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["first", "second", "fresh answer"]);
        assert!(!session.is_loading());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_result() {
        let api = Arc::new(MockApi::new());
        let gate = Arc::new(Notify::new());
        api.push_gated_chat_reply(Ok(chat_response("ai-1", "late")), gate.clone());
        let session = session_with(&api);

        let (outcome, _) = tokio::join!(session.send("hello", Category::General, None), async {
            wait_for_requests(&api, 1).await;
            session.clear();
            gate.notify_one();
        });

        assert_eq!(outcome, SendOutcome::Superseded);
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_cancel_without_request_reports_false() {
        let api = Arc::new(MockApi::new());
        let session = session_with(&api);
        assert!(!session.cancel());
    }

    #[tokio::test]
    async fn test_dropped_send_future_clears_loading() {
        let api = Arc::new(MockApi::new());
        let gate = Arc::new(Notify::new());
        api.push_gated_chat_reply(Ok(chat_response("ai-1", "never")), gate);
        let session = session_with(&api);

        {
            let send = session.send("hello", Category::General, None);
            tokio::pin!(send);
            let polled = tokio::time::timeout(std::time::Duration::from_millis(20), &mut send).await;
            assert!(polled.is_err());
            assert!(session.is_loading());
        }

        assert!(!session.is_loading());
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn test_load_replaces_messages_and_rebinds() {
        let api = Arc::new(MockApi::new());
        api.insert_messages(
            "conv-2",
            vec![
                history_message("u-1", "question", Sender::User),
                history_message("a-1", "answer", Sender::Ai),
            ],
        );
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);
        session.send("old", Category::General, None).await;

        assert_eq!(session.load("conv-2").await.unwrap(), LoadOutcome::Applied);

        let ids: Vec<String> = session.messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["u-1", "a-1"]);
        assert_eq!(session.conversation_id(), "conv-2");
        assert!(!session.is_loading());
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_stale_messages() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);
        session.send("keep me", Category::General, None).await;

        api.fail_with(ApiError::network("unreachable"));
        let error = session.load("conv-2").await.unwrap_err();

        assert!(error.is_network());
        assert_eq!(session.message_count(), 2);
        assert_eq!(session.conversation_id(), "conv-1");
        assert!(!session.is_connected());
        assert!(!session.is_loading());

        api.fail_with(ApiError::http_status(404));
        let error = session.load("conv-2").await.unwrap_err();
        assert_eq!(error.code(), HTTP_ERROR);
        assert!(session.is_connected());
        assert_eq!(session.message_count(), 2);
    }

    #[tokio::test]
    async fn test_superseded_load_reports_superseded() {
        let api = Arc::new(MockApi::new());
        api.insert_messages("conv-2", vec![history_message("u-1", "old", Sender::User)]);
        let gate = Arc::new(Notify::new());
        api.gate_next_history(gate.clone());
        let session = session_with(&api);

        let (outcome, _) = tokio::join!(session.load("conv-2"), async {
            while api.history_requests() < 1 {
                tokio::task::yield_now().await;
            }
            assert!(session.cancel());
            gate.notify_one();
        });

        assert_eq!(outcome.unwrap(), LoadOutcome::Superseded);
        assert!(session.messages().is_empty());
        assert_eq!(session.conversation_id(), "conv-1");
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn test_clear_empties_without_network() {
        let api = Arc::new(MockApi::new());
        api.push_chat_reply(Ok(chat_response("ai-1", "ok")));
        let session = session_with(&api);
        session.send("hello", Category::General, None).await;

        session.clear();
        session.set_conversation_id("conv-new");

        assert!(session.messages().is_empty());
        assert_eq!(session.conversation_id(), "conv-new");
        assert_eq!(api.chat_requests().len(), 1);
        assert_eq!(api.history_requests(), 0);
    }
}
