//! The two operator-facing dispatchers: Telegram (primary) and email
//! (fallback). Both implement the same `Dispatcher` trait so the queue's
//! worker loop can treat them uniformly.

mod email;
mod telegram;

pub use email::EmailDispatcher;
pub use telegram::TelegramDispatcher;

use async_trait::async_trait;
use bridge_common::MessageRecord;

/// Outcome of a single `send` attempt, classified so the caller can decide
/// whether to fall back, back off, or give up.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Delivered,
    /// Carries the number of seconds the caller should wait before trying
    /// this dispatcher again.
    RateLimited(u64),
    TransientError(String),
    TerminalError(String),
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, record: &MessageRecord) -> DispatchOutcome;
}
