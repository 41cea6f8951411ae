use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_common::MessageRecord;
use bridge_crypto::Envelope;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::{DispatchOutcome, Dispatcher};

const DEFAULT_PERMITS: usize = 30;
const BACKOFF_CAP_SEC: u64 = 60;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends decrypted message bodies to a Telegram chat via the Bot API.
/// Decryption happens immediately before the network call so plaintext
/// exists only on this call's stack.
pub struct TelegramDispatcher {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
    envelope: Option<Arc<Envelope>>,
    permits: Arc<Semaphore>,

    total_sent: AtomicU64,
    total_rate_limited: AtomicU64,
    total_errors: AtomicU64,
    connected: AtomicBool,
    rate_limited: AtomicBool,
    consecutive_rate_limits: AtomicU64,
}

impl TelegramDispatcher {
    pub fn new(bot_token: String, chat_id: String, envelope: Option<Arc<Envelope>>) -> Self {
        Self::with_permits(bot_token, chat_id, envelope, DEFAULT_PERMITS)
    }

    pub fn with_permits(
        bot_token: String,
        chat_id: String,
        envelope: Option<Arc<Envelope>>,
        permits: usize,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
            envelope,
            permits: Arc::new(Semaphore::new(permits)),
            total_sent: AtomicU64::new(0),
            total_rate_limited: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            rate_limited: AtomicBool::new(false),
            consecutive_rate_limits: AtomicU64::new(0),
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    pub fn total_rate_limited(&self) -> u64 {
        self.total_rate_limited.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::Relaxed)
    }

    fn decrypt_body(&self, record: &MessageRecord) -> Result<String, DispatchOutcome> {
        if !record.encrypted {
            return Ok(record.body.clone());
        }
        match &self.envelope {
            Some(envelope) => envelope.decrypt_to_string(&record.body).map_err(|e| {
                DispatchOutcome::TerminalError(format!("cannot decrypt message body: {e}"))
            }),
            None => Err(DispatchOutcome::TerminalError(
                "message marked encrypted but no encryption key is configured".into(),
            )),
        }
    }

    /// Acquires a send permit that self-releases after one second, giving
    /// a steady-state rate of `permits` sends per second.
    async fn acquire_permit(&self) {
        let permit = self.permits.clone().acquire_owned().await;
        if let Ok(permit) = permit {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                drop(permit);
            });
        }
    }

    fn exponential_backoff(&self) -> u64 {
        let streak = self.consecutive_rate_limits.fetch_add(1, Ordering::Relaxed) + 1;
        let shift = (streak - 1).min(6) as u32;
        (1u64 << shift).min(BACKOFF_CAP_SEC)
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    async fn send(&self, record: &MessageRecord) -> DispatchOutcome {
        let body = match self.decrypt_body(record) {
            Ok(body) => body,
            Err(outcome) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return outcome;
            }
        };

        self.acquire_permit().await;

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let req = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &body,
            parse_mode: "Markdown",
        };

        let response = match self.http.post(&url).json(&req).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.connected.store(false, Ordering::Relaxed);
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::TransientError(format!("network error: {e}"));
            }
        };

        let status = response.status();

        if status.is_success() {
            self.total_sent.fetch_add(1, Ordering::Relaxed);
            self.connected.store(true, Ordering::Relaxed);
            self.rate_limited.store(false, Ordering::Relaxed);
            self.consecutive_rate_limits.store(0, Ordering::Relaxed);
            return DispatchOutcome::Delivered;
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(|| self.exponential_backoff());

            self.total_rate_limited.fetch_add(1, Ordering::Relaxed);
            self.rate_limited.store(true, Ordering::Relaxed);
            return DispatchOutcome::RateLimited(retry_after);
        }

        self.total_errors.fetch_add(1, Ordering::Relaxed);

        if status.is_server_error() {
            self.connected.store(false, Ordering::Relaxed);
            return DispatchOutcome::TransientError(format!("telegram server error: {status}"));
        }

        DispatchOutcome::TerminalError(format!("telegram rejected request: {status}"))
    }
}
