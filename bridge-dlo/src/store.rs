use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bridge_common::{now_secs, ids::SmsId, MessageRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::DloError;

/// Redaction sentinel: every serialized Dead Letter exposes this in place
/// of `body`, regardless of the `encrypted` flag on the underlying record.
const REDACTED: &str = "[ENCRYPTED]";

/// A Message Record that exhausted its retries, plus when it landed here
/// and when it's eligible for TTL purge.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub record: MessageRecord,
    pub dead_lettered_at: u64,
    pub expires_at: u64,
}

/// The wire form of a `DeadLetter`: identical field set, `body` always
/// replaced by the redaction sentinel.
#[derive(Debug, Serialize)]
pub struct SerializedDeadLetter {
    pub sms_id: SmsId,
    pub sender: String,
    pub body: &'static str,
    pub node_id: bridge_common::NodeId,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub dead_lettered_at: u64,
    pub expires_at: u64,
}

impl From<&DeadLetter> for SerializedDeadLetter {
    fn from(dl: &DeadLetter) -> Self {
        Self {
            sms_id: dl.record.sms_id.clone(),
            sender: dl.record.sender.clone(),
            body: REDACTED,
            node_id: dl.record.node_id.clone(),
            retry_count: dl.record.retry_count,
            last_error: dl.record.last_error.clone(),
            dead_lettered_at: dl.dead_lettered_at,
            expires_at: dl.expires_at,
        }
    }
}

/// Callback invoked after every successful `capture`, carrying the DLO's
/// current size so the CTO-Agent can evaluate growth thresholds without
/// the DLO importing the agent (cyclic-reference avoidance via
/// event-emitter, per the design notes).
pub type OnCaptureFn = Box<dyn Fn(usize) + Send + Sync>;

pub struct DeadLetterOffice {
    entries: Mutex<VecDeque<DeadLetter>>,
    max: usize,
    ttl_sec: u64,
    on_capture: Mutex<Option<OnCaptureFn>>,
    dlo_overflow: AtomicU64,
}

impl DeadLetterOffice {
    pub fn new(max: usize, ttl_sec: u64) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(max)),
            max,
            ttl_sec,
            on_capture: Mutex::new(None),
            dlo_overflow: AtomicU64::new(0),
        }
    }

    /// Registers the callback fired after each capture. Only one callback
    /// is supported; intended to be wired once at startup.
    pub fn on_capture(&self, f: OnCaptureFn) {
        *self.on_capture.lock().unwrap() = Some(f);
    }

    pub fn dlo_overflow(&self) -> u64 {
        self.dlo_overflow.load(Ordering::Relaxed)
    }

    /// Records `record` as dead-lettered with the given failure reason.
    /// When the store is already at capacity, the oldest entry is evicted
    /// to make room and `dlo_overflow` is incremented.
    pub fn capture(&self, mut record: MessageRecord, last_error: String) {
        record.last_error = Some(last_error);
        let now = now_secs();
        let letter = DeadLetter {
            record,
            dead_lettered_at: now,
            expires_at: now + self.ttl_sec,
        };

        let size = {
            let mut entries = self.entries.lock().unwrap();
            if entries.len() >= self.max {
                entries.pop_front();
                self.dlo_overflow.fetch_add(1, Ordering::Relaxed);
                warn!(max = self.max, "DLO at capacity, evicted oldest entry");
            }
            entries.push_back(letter);
            entries.len()
        };

        if let Some(cb) = self.on_capture.lock().unwrap().as_ref() {
            cb(size);
        }
    }

    /// Returns current dead letters, newest first, after pruning any that
    /// have expired.
    pub fn list(&self) -> Vec<SerializedDeadLetter> {
        self.prune_expired();
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().map(SerializedDeadLetter::from).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the dead letter with the given id, resetting its retry
    /// state for re-enqueue. The caller is responsible for calling
    /// `queue.enqueue` with the returned record and re-admitting it via
    /// `readmit` if the queue refuses.
    pub fn retry(&self, sms_id: &SmsId) -> Result<MessageRecord, DloError> {
        let mut entries = self.entries.lock().unwrap();
        let pos = entries
            .iter()
            .position(|dl| &dl.record.sms_id == sms_id)
            .ok_or(DloError::NotFound)?;
        let mut letter = entries.remove(pos).expect("position was just found");
        letter.record.reset_for_retry();
        info!(sms_id = %sms_id, "dead letter retried");
        Ok(letter.record)
    }

    /// Re-inserts a record that a failed `retry` attempt couldn't hand
    /// back to the queue (e.g. the queue rejected it as full).
    pub fn readmit(&self, record: MessageRecord, last_error: String) {
        self.capture(record, last_error);
    }

    /// Removes every dead letter, returning the count removed.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let n = entries.len();
        entries.clear();
        n
    }

    /// Removes entries whose TTL has elapsed, returning the count removed.
    pub fn prune_expired(&self) -> usize {
        let now = now_secs();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|dl| dl.expires_at > now);
        before - entries.len()
    }
}
