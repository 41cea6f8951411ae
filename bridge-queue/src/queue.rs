use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ahash::AHashSet;
use bridge_common::ids::SmsId;
use bridge_common::MessageRecord;
use bridge_dispatch::{DispatchOutcome, Dispatcher};
use bridge_dlo::DeadLetterOffice;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::EnqueueError;
use crate::policy::RetryPolicy;

const BUCKETS: usize = 3;
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);
const IDLE_REPOLL: Duration = Duration::from_millis(200);

/// Snapshot of the queue's counters, matching the wire shape of `/api/metrics`.
#[derive(Debug, Clone, Copy)]
pub struct QueueMetrics {
    pub total_enqueued: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
    pub current_depth: usize,
    pub running: bool,
    pub consumers: usize,
}

struct Inner {
    capacity: usize,
    buckets: [Mutex<VecDeque<MessageRecord>>; BUCKETS],
    /// sms_ids currently admitted to the pipeline: queued, in-flight, or
    /// waiting out a backoff/rate-limit timer. Doubles as the duplicate
    /// check and the capacity counter — the Dead Letter Office's own
    /// store is intentionally not consulted here, so a retry from the DLO
    /// never reads as a duplicate.
    present: Mutex<AHashSet<SmsId>>,
    in_flight: AtomicUsize,
    running: AtomicBool,
    notify: Notify,

    telegram: Arc<dyn Dispatcher>,
    email: Arc<dyn Dispatcher>,
    dlo: Arc<DeadLetterOffice>,
    policy: RetryPolicy,

    total_enqueued: AtomicU64,
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
    consumers: AtomicUsize,
}

impl Inner {
    fn depth(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().unwrap().len()).sum()
    }

    fn push_tail(&self, record: MessageRecord) {
        self.buckets[record.priority.bucket()]
            .lock()
            .unwrap()
            .push_back(record);
    }

    fn push_head(&self, record: MessageRecord) {
        self.buckets[record.priority.bucket()]
            .lock()
            .unwrap()
            .push_front(record);
    }

    /// Highest priority bucket first, FIFO within a bucket.
    fn pop_next(&self) -> Option<MessageRecord> {
        for bucket in &self.buckets {
            if let Some(record) = bucket.lock().unwrap().pop_front() {
                return Some(record);
            }
        }
        None
    }
}

/// The bounded Message Queue (§4.4): `N` worker tasks pull records
/// highest-priority-first, try the Telegram dispatcher then the email
/// fallback, apply exponential backoff with jitter on failure, and hand
/// records that exhaust their retry budget to the Dead Letter Office.
///
/// Cheaply cloneable: every clone shares the same underlying state, so
/// workers and the facade can hold independent handles.
#[derive(Clone)]
pub struct MessageQueue {
    inner: Arc<Inner>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MessageQueue {
    pub fn new(
        capacity: usize,
        telegram: Arc<dyn Dispatcher>,
        email: Arc<dyn Dispatcher>,
        dlo: Arc<DeadLetterOffice>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                buckets: Default::default(),
                present: Mutex::new(AHashSet::new()),
                in_flight: AtomicUsize::new(0),
                running: AtomicBool::new(true),
                notify: Notify::new(),
                telegram,
                email,
                dlo,
                policy,
                total_enqueued: AtomicU64::new(0),
                total_delivered: AtomicU64::new(0),
                total_failed: AtomicU64::new(0),
                consumers: AtomicUsize::new(0),
            }),
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Admits a record to the pipeline. Returns the depth right after
    /// admission. No blocking: a full queue or an in-flight duplicate
    /// both fail immediately so the caller can decide to drop, buffer
    /// externally, or shed.
    pub fn enqueue(&self, record: MessageRecord) -> Result<usize, EnqueueError> {
        if !self.inner.running.load(Ordering::Acquire) {
            return Err(EnqueueError::Stopped);
        }

        {
            let mut present = self.inner.present.lock().unwrap();
            if present.contains(&record.sms_id) {
                return Err(EnqueueError::Duplicate);
            }
            if present.len() >= self.inner.capacity {
                return Err(EnqueueError::QueueFull);
            }
            present.insert(record.sms_id.clone());
        }

        self.inner.total_enqueued.fetch_add(1, Ordering::Relaxed);
        self.inner.push_tail(record);
        self.inner.notify.notify_one();
        Ok(self.inner.depth())
    }

    /// Spawns `n_workers` worker tasks. Safe to call once per queue
    /// lifetime; the queue must have been constructed with `running`
    /// already true (the default).
    pub fn start(&self, n_workers: usize) {
        self.inner.running.store(true, Ordering::Release);
        self.inner.consumers.store(n_workers, Ordering::Relaxed);
        let mut workers = self.workers.lock().unwrap();
        for id in 0..n_workers {
            let inner = self.inner.clone();
            workers.push(tokio::spawn(worker_loop(inner, id)));
        }
    }

    /// Flips the running flag (new `enqueue` calls now return
    /// `queue_full`) and waits for in-flight workers to drain, up to a
    /// 10-second grace deadline, after which remaining workers are
    /// aborted.
    pub async fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        self.inner.notify.notify_waiters();

        let handles = std::mem::take(&mut *self.workers.lock().unwrap());
        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        if tokio::time::timeout(DEFAULT_STOP_GRACE, drain).await.is_err() {
            warn!("queue shutdown grace period elapsed with workers still in flight");
        }
    }

    pub fn depth(&self) -> usize {
        self.inner.depth()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> QueueMetrics {
        QueueMetrics {
            total_enqueued: self.inner.total_enqueued.load(Ordering::Relaxed),
            total_delivered: self.inner.total_delivered.load(Ordering::Relaxed),
            total_failed: self.inner.total_failed.load(Ordering::Relaxed),
            current_depth: self.inner.depth(),
            running: self.is_running(),
            consumers: self.inner.consumers.load(Ordering::Relaxed),
        }
    }
}

async fn worker_loop(inner: Arc<Inner>, id: usize) {
    debug!(worker = id, "queue worker started");
    loop {
        if !inner.running.load(Ordering::Acquire) {
            break;
        }

        match inner.pop_next() {
            Some(record) => {
                inner.in_flight.fetch_add(1, Ordering::Relaxed);
                process_record(inner.clone(), record).await;
            }
            None => {
                tokio::select! {
                    _ = inner.notify.notified() => {}
                    _ = tokio::time::sleep(IDLE_REPOLL) => {}
                }
            }
        }
    }
    debug!(worker = id, "queue worker stopped");
}

/// Tries primary then fallback. A terminal failure on *both* channels
/// skips the retry budget and goes straight to the DLO (§7: "if fallback
/// also terminal, DLO immediately"); anything else — a transient failure
/// on either leg — still spends a retry and backs off per the usual
/// schedule.
async fn process_record(inner: Arc<Inner>, mut record: MessageRecord) {
    let primary_terminal = match inner.telegram.send(&record).await {
        DispatchOutcome::Delivered => {
            finish_delivered(&inner, &record);
            return;
        }
        DispatchOutcome::RateLimited(retry_after) => {
            let delay = inner.policy.rate_limit_delay(retry_after);
            schedule_requeue(inner, record, delay, Requeue::Head);
            return;
        }
        DispatchOutcome::TransientError(reason) => {
            record.last_error = Some(reason);
            false
        }
        DispatchOutcome::TerminalError(reason) => {
            record.last_error = Some(reason);
            true
        }
    };

    let (fallback_terminal, fallback_reason) = match inner.email.send(&record).await {
        DispatchOutcome::Delivered => {
            finish_delivered(&inner, &record);
            return;
        }
        DispatchOutcome::TransientError(reason) => (false, reason),
        DispatchOutcome::TerminalError(reason) => (true, reason),
        // The email dispatcher never rate-limits in practice, but any
        // outcome other than Delivered counts as a fallback failure.
        DispatchOutcome::RateLimited(secs) => (false, format!("rate limited, retry after {secs}s")),
    };

    record.last_error = Some(fallback_reason);

    if primary_terminal && fallback_terminal {
        finish_dead_lettered(&inner, record);
        return;
    }

    record.retry_count += 1;
    if record.retry_count < inner.policy.max_retries {
        let delay = inner.policy.backoff_for(record.retry_count);
        schedule_requeue(inner, record, delay, Requeue::Tail);
    } else {
        finish_dead_lettered(&inner, record);
    }
}

fn finish_delivered(inner: &Arc<Inner>, record: &MessageRecord) {
    inner.in_flight.fetch_sub(1, Ordering::Relaxed);
    inner.present.lock().unwrap().remove(&record.sms_id);
    inner.total_delivered.fetch_add(1, Ordering::Relaxed);
    info!(sms_id = %record.sms_id, "message delivered");
}

fn finish_dead_lettered(inner: &Arc<Inner>, record: MessageRecord) {
    inner.in_flight.fetch_sub(1, Ordering::Relaxed);
    inner.present.lock().unwrap().remove(&record.sms_id);
    inner.total_failed.fetch_add(1, Ordering::Relaxed);
    let sms_id = record.sms_id.clone();
    let reason = record.last_error.clone().unwrap_or_default();
    inner.dlo.capture(record, reason);
    warn!(sms_id = %sms_id, "message exhausted retries, moved to DLO");
}

enum Requeue {
    Head,
    Tail,
}

/// Re-inserts `record` after `delay` without holding a worker: the delay
/// runs as its own task (a per-record timer, per the design notes'
/// "scheduled-release mechanism"), counted as in-flight the whole time so
/// the conservation invariant holds even while it's not sitting in a
/// bucket or being actively dispatched.
fn schedule_requeue(inner: Arc<Inner>, record: MessageRecord, delay: Duration, mode: Requeue) {
    tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        inner.in_flight.fetch_sub(1, Ordering::Relaxed);
        match mode {
            Requeue::Head => inner.push_head(record),
            Requeue::Tail => inner.push_tail(record),
        }
        inner.notify.notify_one();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_common::Priority;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration as StdDuration;

    struct ScriptedDispatcher {
        outcomes: Mutex<VecDeque<DispatchOutcome>>,
        calls: AtomicU32,
    }

    impl ScriptedDispatcher {
        fn new(outcomes: Vec<DispatchOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn send(&self, _record: &MessageRecord) -> DispatchOutcome {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let mut outcomes = self.outcomes.lock().unwrap();
            outcomes.pop_front().unwrap_or(DispatchOutcome::TerminalError("exhausted script".into()))
        }
    }

    fn sample(id: &str) -> MessageRecord {
        MessageRecord {
            sms_id: id.into(),
            sender: "+10000000000".into(),
            body: "123456".into(),
            timestamp: 0,
            node_id: "node-1".into(),
            priority: Priority::Normal,
            encrypted: false,
            retry_count: 0,
            last_error: None,
            created_at: 0,
        }
    }

    fn test_queue(
        telegram_outcomes: Vec<DispatchOutcome>,
        email_outcomes: Vec<DispatchOutcome>,
    ) -> (MessageQueue, Arc<ScriptedDispatcher>, Arc<ScriptedDispatcher>, Arc<DeadLetterOffice>) {
        let telegram = Arc::new(ScriptedDispatcher::new(telegram_outcomes));
        let email = Arc::new(ScriptedDispatcher::new(email_outcomes));
        let dlo = Arc::new(DeadLetterOffice::new(100, 3600));
        let queue = MessageQueue::new(
            10,
            telegram.clone(),
            email.clone(),
            dlo.clone(),
            RetryPolicy::new(5),
        );
        (queue, telegram, email, dlo)
    }

    #[tokio::test(start_paused = true)]
    async fn happy_path_delivers_via_primary() {
        let (queue, telegram, _email, dlo) =
            test_queue(vec![DispatchOutcome::Delivered], vec![]);
        queue.start(2);
        queue.enqueue(sample("sms-1")).unwrap();

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        queue.stop().await;

        assert_eq!(telegram.calls(), 1);
        assert_eq!(queue.metrics().total_delivered, 1);
        assert_eq!(dlo.len(), 0);
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn primary_failure_falls_back_to_email() {
        let (queue, telegram, email, dlo) = test_queue(
            vec![DispatchOutcome::TransientError("500".into())],
            vec![DispatchOutcome::Delivered],
        );
        queue.start(1);
        queue.enqueue(sample("sms-2")).unwrap();

        tokio::time::sleep(StdDuration::from_millis(50)).await;
        queue.stop().await;

        assert_eq!(telegram.calls(), 1);
        assert_eq!(email.calls(), 1);
        assert_eq!(queue.metrics().total_delivered, 1);
        assert_eq!(dlo.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_land_in_dlo() {
        let (queue, _telegram, _email, dlo) = test_queue(
            vec![
                DispatchOutcome::TransientError("e".into()); 6
            ],
            vec![DispatchOutcome::TransientError("e".into()); 6],
        );
        queue.start(1);
        queue.enqueue(sample("sms-3")).unwrap();

        // advance past every backoff step (base=2s doubling, capped at 60s)
        for _ in 0..6 {
            tokio::time::advance(StdDuration::from_secs(65)).await;
            tokio::task::yield_now().await;
        }
        queue.stop().await;

        assert_eq!(dlo.len(), 1);
        let letters = dlo.list();
        assert_eq!(letters[0].retry_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_both_channels_skips_retry_budget() {
        let (queue, telegram, email, dlo) = test_queue(
            vec![DispatchOutcome::TerminalError("bad token".into())],
            vec![DispatchOutcome::TerminalError("bad address".into())],
        );
        queue.start(1);
        queue.enqueue(sample("sms-terminal")).unwrap();

        tokio::time::advance(StdDuration::from_millis(50)).await;
        tokio::task::yield_now().await;
        queue.stop().await;

        assert_eq!(telegram.calls(), 1);
        assert_eq!(email.calls(), 1);
        assert_eq!(dlo.len(), 1);
        let letters = dlo.list();
        assert_eq!(letters[0].retry_count, 0);
    }

    #[test]
    fn duplicate_enqueue_is_rejected() {
        let (queue, _t, _e, _dlo) = test_queue(vec![], vec![]);
        assert!(queue.enqueue(sample("dup")).is_ok());
        assert_eq!(queue.enqueue(sample("dup")), Err(EnqueueError::Duplicate));
    }

    #[test]
    fn full_queue_rejects_enqueue() {
        let telegram = Arc::new(ScriptedDispatcher::new(vec![]));
        let email = Arc::new(ScriptedDispatcher::new(vec![]));
        let dlo = Arc::new(DeadLetterOffice::new(100, 3600));
        let queue = MessageQueue::new(1, telegram, email, dlo, RetryPolicy::new(5));
        queue.enqueue(sample("a")).unwrap();
        assert_eq!(queue.enqueue(sample("b")), Err(EnqueueError::QueueFull));
    }

    #[tokio::test]
    async fn stop_rejects_new_enqueues() {
        let (queue, _t, _e, _dlo) = test_queue(vec![], vec![]);
        queue.start(1);
        queue.stop().await;
        assert_eq!(queue.enqueue(sample("late")), Err(EnqueueError::Stopped));
    }
}
