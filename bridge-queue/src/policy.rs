use std::time::Duration;

use rand::Rng;

const DEFAULT_BASE: Duration = Duration::from_secs(2);
const DEFAULT_CAP: Duration = Duration::from_secs(60);
const DEFAULT_JITTER: Duration = Duration::from_secs(1);

/// Backoff timing for the queue worker's retry loop (§4.4 step 3) and the
/// rate-limit re-insertion delay (§4.2/§4.4 step 1). Pure: every method is
/// a function of its inputs plus the process RNG.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub jitter: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            base: DEFAULT_BASE,
            cap: DEFAULT_CAP,
            jitter: DEFAULT_JITTER,
            max_retries,
        }
    }

    /// `min(BASE * 2^(retry_count-1) + U(0, JITTER), CAP)`. `retry_count`
    /// is the count *after* incrementing for this failure, so the first
    /// retry (`retry_count == 1`) waits `BASE` plus jitter.
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(6);
        let multiplier = 1u32 << exponent;
        let scaled = self.base.saturating_mul(multiplier);

        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };

        (scaled + Duration::from_millis(jitter)).min(self.cap)
    }

    /// `retry_after` seconds reported by (or defaulted for) the Telegram
    /// dispatcher, with up to ±10% jitter applied.
    pub fn rate_limit_delay(&self, retry_after_sec: u64) -> Duration {
        let base_ms = retry_after_sec.saturating_mul(1000) as i64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let spread = (base_ms / 10).max(1);
        let delta = rand::rng().random_range(-spread..=spread);
        let total_ms = (base_ms + delta).max(0) as u64;
        Duration::from_millis(total_ms)
    }
}
