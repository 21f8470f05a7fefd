//! Wire and domain types for the assistant backend
//!
//! Field names follow the backend's camelCase JSON. Wire-only shapes
//! (string timestamps, request envelopes) are kept separate from the
//! domain [`ChatMessage`] the session stores.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix for identities minted on the client
///
/// Backend identities are UUIDs or `user-`/`ai-` tagged UUIDs, so nothing
/// the backend issues can start with this prefix.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Conversation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Debugging help; enables error-context extraction
    BugFix,
    /// Explanations and tutorials
    Learning,
    /// Anything else
    #[default]
    General,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Category; 3] = [Category::BugFix, Category::Learning, Category::General];

    /// The wire representation of this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BugFix => "bug-fix",
            Self::Learning => "learning",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Parse a category name, accepting `bugfix` and `bug_fix` as aliases
    ///
    /// # Examples
    ///
    /// ```
    /// use devassist::api::Category;
    ///
    /// assert_eq!("bug-fix".parse::<Category>().unwrap(), Category::BugFix);
    /// assert_eq!("Learning".parse::<Category>().unwrap(), Category::Learning);
    /// assert!("poetry".parse::<Category>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug-fix" | "bugfix" | "bug_fix" => Ok(Self::BugFix),
            "learning" => Ok(Self::Learning),
            "general" => Ok(Self::General),
            other => Err(format!(
                "Unknown category: {}. Must be one of: bug-fix, learning, general",
                other
            )),
        }
    }
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Presentation hint attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Code,
    Error,
}

/// Model bookkeeping reported alongside an AI answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Model that produced the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Tokens consumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    /// Backend processing time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
    /// Optional confidence score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A code sample attached to an AI answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExample {
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub explanation: String,
}

/// One message in a conversation, as held by a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Backend identity, or a [`LOCAL_ID_PREFIX`] identity for local messages
    pub id: String,
    /// Text of the message
    pub content: String,
    /// Author
    pub sender: Sender,
    /// When the message was written
    pub timestamp: DateTime<Utc>,
    /// Presentation hint
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Category the message was sent under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Model bookkeeping for AI messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    /// Follow-up prompts suggested by the backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Code samples returned with the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_examples: Vec<CodeExample>,
}

impl ChatMessage {
    /// Build an optimistic user message with a fresh local identity
    ///
    /// # Examples
    ///
    /// ```
    /// use devassist::api::{Category, ChatMessage, Sender};
    ///
    /// let msg = ChatMessage::user("why does this panic?", Category::BugFix);
    /// assert_eq!(msg.sender, Sender::User);
    /// assert!(msg.is_local());
    /// ```
    pub fn user(content: impl Into<String>, category: Category) -> Self {
        Self {
            id: local_id(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            kind: None,
            category: Some(category),
            metadata: None,
            suggestions: Vec::new(),
            code_examples: Vec::new(),
        }
    }

    /// Build an AI-authored message reporting a failed exchange
    pub fn error(error_message: &str, category: Category) -> Self {
        Self {
            id: local_id(),
            content: format!("Sorry, I encountered an error: {}", error_message),
            sender: Sender::Ai,
            timestamp: Utc::now(),
            kind: Some(MessageKind::Error),
            category: Some(category),
            metadata: None,
            suggestions: Vec::new(),
            code_examples: Vec::new(),
        }
    }

    /// Build the AI message for a successful chat response
    pub fn from_response(response: ChatResponse, category: Category) -> Self {
        Self {
            timestamp: parse_timestamp(Some(&response.timestamp)),
            id: response.id,
            content: response.content,
            sender: Sender::Ai,
            kind: None,
            category: Some(category),
            metadata: Some(response.metadata),
            suggestions: response.suggestions.unwrap_or_default(),
            code_examples: response.code_examples.unwrap_or_default(),
        }
    }

    /// Whether this message was minted on the client
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }
}

fn local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4())
}

/// A message as returned by the history endpoint
///
/// The timestamp is a string and may be missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireChatMessage {
    id: String,
    #[serde(default)]
    content: String,
    sender: Sender,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<MessageKind>,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    metadata: Option<MessageMetadata>,
}

impl From<WireChatMessage> for ChatMessage {
    fn from(wire: WireChatMessage) -> Self {
        Self {
            timestamp: parse_timestamp(wire.timestamp.as_deref()),
            id: wire.id,
            content: wire.content,
            sender: wire.sender,
            kind: wire.kind,
            category: wire.category,
            metadata: wire.metadata,
            suggestions: Vec::new(),
            code_examples: Vec::new(),
        }
    }
}

/// Convert a wire timestamp into a point in time
///
/// Absent or unparseable values become "now". Accepts RFC 3339 and
/// offset-less ISO 8601 (read as UTC).
///
/// # Examples
///
/// ```
/// use devassist::api::parse_timestamp;
///
/// let ts = parse_timestamp(Some("2024-05-01T12:30:00Z"));
/// assert_eq!(ts.to_rfc3339(), "2024-05-01T12:30:00+00:00");
/// ```
pub fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Utc::now();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }

    tracing::warn!("Unparseable message timestamp {:?}, using current time", raw);
    Utc::now()
}

/// Structured hints attached to a chat request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

impl ChatContext {
    /// True when no field is populated
    pub fn is_empty(&self) -> bool {
        self.code_snippet.is_none()
            && self.error_message.is_none()
            && self.language.is_none()
            && self.framework.is_none()
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    pub category: Category,
    /// Omitted from the JSON entirely when nothing was extracted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

/// Body returned by `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub metadata: MessageMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_examples: Option<Vec<CodeExample>>,
}

/// Summary of one conversation as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub message_count: usize,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Deserialize a wire timestamp with the same leniency as message history
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(parse_timestamp(raw.as_deref()))
}

/// Body of `POST /api/conversations`
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateConversationRequest<'a> {
    pub title: &'a str,
    pub category: Category,
}

/// Body returned by `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub models: Vec<String>,
}

impl HealthStatus {
    /// Whether the backend reports itself fully operational
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
