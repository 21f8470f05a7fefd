//! HTTP implementation of the backend contract
//!
//! Every call goes through [`ApiClient::execute`], which is the single
//! place failures are classified: non-success statuses become
//! [`ApiError::Http`], everything else (transport failures, undecodable
//! success bodies) becomes [`ApiError::Network`].

use crate::api::types::{CreateConversationRequest, WireChatMessage};
use crate::api::{
    ApiResult, Category, ChatApi, ChatMessage, ChatRequest, ChatResponse, ConversationSummary,
    HealthStatus,
};
use crate::config::Config;
use crate::error::{ApiError, DevassistError, Result, HTTP_ERROR};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Structured error body: `{message, code, details?}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// The backend either returns the error body directly or nests it under
/// `detail`, which is how its HTTP framework serializes raised errors.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Bare(ErrorBody),
    Wrapped { detail: ErrorBody },
}

/// Classify a non-success response from its status and raw body
fn classify_http_failure(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope::Bare(error)) | Ok(ErrorEnvelope::Wrapped { detail: error }) => {
            ApiError::Http {
                status,
                message: error.message,
                code: error.code.unwrap_or_else(|| HTTP_ERROR.to_string()),
                details: error.details,
            }
        }
        Err(_) => ApiError::http_status(status),
    }
}

/// HTTP client for the assistant backend
///
/// Holds no state besides the connection pool and base address: no
/// retries, no caching, and no timeout beyond the transport default.
///
/// # Examples
///
/// ```
/// use devassist::api::ApiClient;
/// use devassist::config::Config;
///
/// let client = ApiClient::new(&Config::default()).unwrap();
/// assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be built
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| DevassistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized API client: base_url={}", base_url);

        Ok(Self { client, base_url })
    }

    /// The backend base address
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL by appending percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("{} {}", method, url.path());
        self.client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
    }

    /// Perform a request and classify any failure
    async fn execute(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Request to assistant backend failed: {}", e);
            ApiError::network(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_http_failure(status.as_u16(), &body);
        tracing::warn!(
            "Assistant backend returned {}: code={}, message={}",
            status,
            error.code(),
            error.message()
        );
        Err(error)
    }

    /// Perform a request and decode its JSON body
    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.execute(request).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::warn!("Failed to decode assistant backend response: {}", e);
            ApiError::network(e)
        })
    }
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn send_message(&self, request: &ChatRequest) -> ApiResult<ChatResponse> {
        let url = self.endpoint(&["api", "chat"]);
        tracing::debug!(
            "Sending message to conversation {} (category={}, context={})",
            request.conversation_id,
            request.category,
            request.context.is_some()
        );
        self.fetch_json(self.request(Method::POST, url).json(request))
            .await
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        let url = self.endpoint(&["api", "conversations"]);
        self.fetch_json(self.request(Method::GET, url)).await
    }

    async fn conversation_messages(&self, conversation_id: &str) -> ApiResult<Vec<ChatMessage>> {
        let url = self.endpoint(&["api", "conversations", conversation_id, "messages"]);
        let messages: Vec<WireChatMessage> =
            self.fetch_json(self.request(Method::GET, url)).await?;
        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }

    async fn create_conversation(
        &self,
        title: &str,
        category: Category,
    ) -> ApiResult<ConversationSummary> {
        let url = self.endpoint(&["api", "conversations"]);
        let body = CreateConversationRequest { title, category };
        self.fetch_json(self.request(Method::POST, url).json(&body))
            .await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["api", "conversations", conversation_id]);
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn search_conversations(&self, query: &str) -> ApiResult<Vec<ConversationSummary>> {
        let mut url = self.endpoint(&["api", "conversations", "search"]);
        url.query_pairs_mut().append_pair("q", query);
        self.fetch_json(self.request(Method::GET, url)).await
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        let url = self.endpoint(&["api", "health"]);
        self.fetch_json(self.request(Method::GET, url)).await
    }
}
