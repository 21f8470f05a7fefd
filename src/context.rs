//! Context-bundle extraction
//!
//! Scans outgoing message text for a fenced code block and, for bug-fix
//! conversations, failure keywords. The result is attached to the chat
//! request only when something was found.

use crate::api::{Category, ChatContext};
use regex::Regex;
use std::sync::OnceLock;

/// Keywords that mark a bug-fix message as carrying an error report
pub const ERROR_KEYWORDS: [&str; 6] = [
    "error",
    "exception",
    "failed",
    "undefined",
    "null",
    "cannot",
];

fn code_fence() -> &'static Regex {
    static CODE_FENCE: OnceLock<Regex> = OnceLock::new();
    CODE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+#.-]+)?[ \t]*\r?\n(.*?)```")
            .expect("code fence pattern is valid")
    })
}

/// Extract a context bundle from raw message text
///
/// Returns `None` when neither a code block nor (for
/// [`Category::BugFix`]) an error keyword is present, so the request
/// carries no `context` field at all.
///
/// # Examples
///
/// ```
/// use devassist::api::Category;
/// use devassist::context::extract_context;
///
/// let context = extract_context("```python\nx=1\n```", Category::General).unwrap();
/// assert_eq!(context.language.as_deref(), Some("python"));
/// assert_eq!(context.code_snippet.as_deref(), Some("x=1\n"));
/// assert!(context.error_message.is_none());
///
/// assert!(extract_context("hello", Category::General).is_none());
/// ```
pub fn extract_context(text: &str, category: Category) -> Option<ChatContext> {
    let mut context = ChatContext::default();

    if let Some(captures) = code_fence().captures(text) {
        context.language = captures.get(1).map(|m| m.as_str().to_string());
        context.code_snippet = captures.get(2).map(|m| m.as_str().to_string());
    }

    if category == Category::BugFix && mentions_failure(text) {
        context.error_message = Some(text.to_string());
    }

    if context.is_empty() {
        None
    } else {
        tracing::debug!(
            "Extracted context: code={}, language={:?}, error={}",
            context.code_snippet.is_some(),
            context.language,
            context.error_message.is_some()
        );
        Some(context)
    }
}

/// Whether `text` opens a code fence it never closes
///
/// Line editors use this to keep reading until the block is complete.
pub fn has_open_fence(text: &str) -> bool {
    text.matches("```").count() % 2 == 1
}

/// Case-insensitive check for any of [`ERROR_KEYWORDS`]
pub fn mentions_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    ERROR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}
