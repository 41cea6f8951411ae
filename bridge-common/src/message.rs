use serde::{Deserialize, Serialize};

use crate::ids::{NodeId, SmsId};

/// Advisory priority. Ordering is FIFO within a priority bucket; higher
/// priority buckets drain first when workers are idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    /// Index into a fixed 3-bucket queue, highest priority first.
    pub fn bucket(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// The immutable unit of work flowing through the bridge, from ingest to
/// either successful dispatch or Dead Letter Office capture.
///
/// `sms_id` is the idempotency key across the entire pipeline lifetime,
/// including the DLO: re-enqueueing a dead letter preserves `sms_id` and
/// resets `retry_count` to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sms_id: SmsId,
    pub sender: String,
    /// Opaque ciphertext if `encrypted` is true, otherwise plaintext.
    pub body: String,
    pub timestamp: u64,
    pub node_id: NodeId,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default = "crate::now_secs")]
    pub created_at: u64,
}

impl MessageRecord {
    /// Resets mutable dispatch state for a record re-entering the queue
    /// from the Dead Letter Office. `sms_id` and payload fields are untouched.
    pub fn reset_for_retry(&mut self) {
        self.retry_count = 0;
        self.last_error = None;
    }
}
