//! User-facing notices and confirmations.
//!
//! Containers receive a [`Notifier`] and a [`Confirmer`] at construction
//! instead of reaching for global state. Front ends subscribe to the notice
//! stream and render it however they like.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Level::Success => "ok",
            Level::Info => "info",
            Level::Warning => "warn",
            Level::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn notify(&self, level: Level, message: impl Into<String>) -> Notice {
        let notice = Notice {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            at: Utc::now(),
        };
        match level {
            Level::Error => error!(message = %notice.message, "notice"),
            Level::Warning => warn!(message = %notice.message, "notice"),
            Level::Success | Level::Info => info!(message = %notice.message, "notice"),
        }
        // No subscribers is fine; the notice is still logged.
        let _ = self.tx.send(notice.clone());
        notice
    }

    pub fn success(&self, message: impl Into<String>) -> Notice {
        self.notify(Level::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Notice {
        self.notify(Level::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> Notice {
        self.notify(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Notice {
        self.notify(Level::Error, message)
    }
}

/// Take every notice currently buffered in `rx`. Notices the receiver fell
/// too far behind on are skipped and logged; the rest are still returned.
pub fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(notice) => out.push(notice),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "notices dropped"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    out
}

/// A destructive action waiting for the user's go-ahead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub danger: bool,
}

impl ConfirmRequest {
    pub fn danger(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            danger: true,
        }
    }
}

#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, request: &ConfirmRequest) -> bool;
}

/// Answers every request with a fixed value.
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmer(pub bool);

#[async_trait]
impl Confirmer for FixedConfirmer {
    async fn confirm(&self, _request: &ConfirmRequest) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_notices() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let sent = notifier.warning("2 files could not be deleted");
        let received = rx.recv().await.unwrap();
        assert_eq!(received, sent);
        assert_eq!(received.level, Level::Warning);
    }

    #[test]
    fn notify_without_subscribers_does_not_fail() {
        let notifier = Notifier::new();
        let notice = notifier.success("saved");
        assert_eq!(notice.message, "saved");
    }

    #[test]
    fn drain_continues_past_lagged_notices() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        let total = CHANNEL_CAPACITY + 6;
        for i in 0..total {
            notifier.info(format!("notice {}", i));
        }
        let drained = drain(&mut rx);
        assert_eq!(drained.len(), CHANNEL_CAPACITY);
        assert_eq!(drained[0].message, "notice 6");
        assert_eq!(
            drained.last().map(|n| n.message.clone()),
            Some(format!("notice {}", total - 1))
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn fixed_confirmer_answers() {
        let req = ConfirmRequest::danger("Delete", "Really?");
        assert!(FixedConfirmer(true).confirm(&req).await);
        assert!(!FixedConfirmer(false).confirm(&req).await);
    }
}
