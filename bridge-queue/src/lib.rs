//! The bounded Message Queue (§4.4): multiple concurrent workers pull
//! records highest-priority-first, try the Telegram dispatcher then the
//! email fallback, apply exponential backoff with jitter on failure, and
//! hand exhausted records to the Dead Letter Office.

mod error;
mod policy;
mod queue;

pub use error::EnqueueError;
pub use policy::RetryPolicy;
pub use queue::{MessageQueue, QueueMetrics};
