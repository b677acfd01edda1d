//! User-facing notifications ("toasts") emitted by mutations.

use std::sync::{Mutex, PoisonError};

use crate::error::ApiError;

/// A notification shown to staff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Failure(String),
}

/// Receives mutation outcomes.
pub trait Notifier: Send + Sync {
    /// A mutation succeeded.
    fn success(&self, message: &str);

    /// A mutation failed with `error`.
    fn failure(&self, message: &str, error: &ApiError);
}

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = %message, "Mutation succeeded");
    }

    fn failure(&self, message: &str, error: &ApiError) {
        tracing::warn!(notification = %message, error = %error, "Mutation failed");
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Notification> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of failure notifications recorded.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Notification::Failure(_)))
            .count()
    }

    /// Number of success notifications recorded.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Notification::Success(_)))
            .count()
    }

    fn push(&self, notification: Notification) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn failure(&self, message: &str, _error: &ApiError) {
        self.push(Notification::Failure(message.to_string()));
    }
}
