//! Time-limited error notices for the chat front-end
//!
//! Failures that are not shown inline in the transcript (a failed create,
//! delete, or history load) surface as a notice that expires after a
//! configured lifetime. Posting a new notice replaces the previous one.

use std::time::{Duration, Instant};

/// Shown when a failure carries no usable message
pub const GENERIC_NOTICE: &str = "Something went wrong. Please try again.";

/// A single notice and the moment it stops being shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// Holds at most one active notice
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    lifetime: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            current: None,
        }
    }

    /// Post a notice starting now
    pub fn post(&mut self, message: impl Into<String>) {
        self.post_at(message, Instant::now());
    }

    /// Post a notice starting at `now`
    ///
    /// A blank message is replaced by [`GENERIC_NOTICE`].
    pub fn post_at(&mut self, message: impl Into<String>, now: Instant) {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = GENERIC_NOTICE.to_string();
        }
        tracing::debug!("Posting notice: {}", message);
        self.current = Some(Notice {
            message,
            expires_at: now + self.lifetime,
        });
    }

    /// The notice still showing now, if any
    pub fn active(&mut self) -> Option<&Notice> {
        self.active_at(Instant::now())
    }

    /// The notice still showing at `now`; expired notices are dropped
    pub fn active_at(&mut self, now: Instant) -> Option<&Notice> {
        if self
            .current
            .as_ref()
            .is_some_and(|notice| now >= notice.expires_at)
        {
            self.current = None;
        }
        self.current.as_ref()
    }

    /// Dismiss the current notice
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
