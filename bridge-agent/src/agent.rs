use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bridge_common::{now_secs, Alert, Incident, WebhookStatus};
use tracing::{info, warn};

use crate::cooldown::CooldownMap;
use crate::ring::IncidentRing;
use crate::sign::{canonical_json, sign};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AgentConfig {
    pub webhook_url: String,
    pub webhook_secret: String,
    pub cooldown_sec: u64,
}

/// Assigns `inc-<YYYYMMDD>-<seq>` ids, resetting the sequence whenever the
/// UTC day rolls over.
struct IdSequence {
    day: String,
    seq: u64,
}

impl IdSequence {
    fn next(&mut self, today: &str) -> String {
        if self.day != today {
            self.day = today.to_string();
            self.seq = 0;
        }
        self.seq += 1;
        format!("inc-{}-{:03}", self.day, self.seq)
    }
}

pub struct CtoAgent {
    http: reqwest::Client,
    webhook_url: String,
    webhook_secret: String,
    cooldown: CooldownMap,
    ring: IncidentRing,
    id_seq: Mutex<IdSequence>,
    total_suppressed: AtomicU64,
    total_delivered: AtomicU64,
    total_failed: AtomicU64,
}

impl CtoAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: config.webhook_url,
            webhook_secret: config.webhook_secret,
            cooldown: CooldownMap::new(config.cooldown_sec),
            ring: IncidentRing::new(),
            id_seq: Mutex::new(IdSequence {
                day: String::new(),
                seq: 0,
            }),
            total_suppressed: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
            total_failed: AtomicU64::new(0),
        }
    }

    pub fn total_suppressed(&self) -> u64 {
        self.total_suppressed.load(Ordering::Relaxed)
    }

    pub fn total_delivered(&self) -> u64 {
        self.total_delivered.load(Ordering::Relaxed)
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed.load(Ordering::Relaxed)
    }

    pub fn incidents(&self, limit: usize) -> Vec<Incident> {
        self.ring.list(limit)
    }

    fn next_id(&self, now: u64) -> String {
        let today = chrono::DateTime::from_timestamp(now as i64, 0)
            .map(|dt| dt.format("%Y%m%d").to_string())
            .unwrap_or_else(|| "19700101".to_string());
        self.id_seq.lock().unwrap().next(&today)
    }

    /// Processes one alert: suppresses it if its kind is within cooldown,
    /// otherwise signs and posts an incident to the external webhook. The
    /// cooldown stamp is only updated on non-network-failure outcomes —
    /// a delivered POST or an HTTP 4xx response both count as "the
    /// operator has been told"; a network failure does not, so the next
    /// alert can retry immediately.
    pub async fn handle(&self, alert: Alert) -> Incident {
        let now = now_secs();

        if self.cooldown.is_active(alert.kind, now) {
            self.total_suppressed.fetch_add(1, Ordering::Relaxed);
            let incident = Incident::from_alert(self.next_id(now), &alert, now, WebhookStatus::Suppressed);
            self.ring.push(incident.clone());
            return incident;
        }

        let id = self.next_id(now);
        let mut incident = Incident::from_alert(id.clone(), &alert, now, WebhookStatus::Pending);

        let body = canonical_json(&incident);
        let signature = sign(&self.webhook_secret, &body);

        let response = self
            .http
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .header("X-Signature", signature)
            .header("X-Incident-Id", &id)
            .timeout(WEBHOOK_TIMEOUT)
            .body(body)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                incident.webhook_status = WebhookStatus::Delivered;
                self.total_delivered.fetch_add(1, Ordering::Relaxed);
                self.cooldown.stamp(alert.kind, now);
                info!(incident_id = %id, "incident webhook delivered");
            }
            Ok(resp) if resp.status().is_client_error() => {
                incident.webhook_status = WebhookStatus::Failed;
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                self.cooldown.stamp(alert.kind, now);
                warn!(incident_id = %id, status = %resp.status(), "incident webhook rejected");
            }
            Ok(resp) => {
                incident.webhook_status = WebhookStatus::Failed;
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                warn!(incident_id = %id, status = %resp.status(), "incident webhook server error, cooldown not engaged");
            }
            Err(e) => {
                incident.webhook_status = WebhookStatus::Failed;
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                warn!(incident_id = %id, error = %e, "incident webhook transport failure, cooldown not engaged");
            }
        }

        self.ring.push(incident.clone());
        incident
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentConfig {
        AgentConfig {
            webhook_url: "https://n8n.example.com/webhook/does-not-exist".into(),
            webhook_secret: "shh".into(),
            cooldown_sec: 300,
        }
    }

    #[test]
    fn id_sequence_resets_on_new_day() {
        let mut seq = IdSequence {
            day: "20260727".into(),
            seq: 3,
        };
        assert_eq!(seq.next("20260727"), "inc-20260727-004");
        assert_eq!(seq.next("20260728"), "inc-20260728-001");
    }

    #[tokio::test]
    async fn second_alert_within_cooldown_is_suppressed() {
        let agent = CtoAgent::new(config());
        // First handle will attempt a real network call to a
        // non-existent endpoint and fail as a transport error, which
        // does NOT engage the cooldown per the design notes — so we
        // stamp the cooldown directly to exercise the suppression path
        // in isolation from network behaviour.
        agent.cooldown.stamp(bridge_common::AlertKind::LowBattery, now_secs());

        let alert = Alert::new(
            bridge_common::AlertKind::LowBattery,
            bridge_common::Severity::Warning,
            vec!["battery low".into()],
        );
        let incident = agent.handle(alert).await;
        assert_eq!(incident.webhook_status, WebhookStatus::Suppressed);
        assert_eq!(agent.total_suppressed(), 1);
    }

    #[test]
    fn incidents_ring_starts_empty() {
        let agent = CtoAgent::new(config());
        assert!(agent.incidents(10).is_empty());
    }
}
