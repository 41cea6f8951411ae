use std::collections::VecDeque;
use std::sync::Mutex;

use bridge_common::Incident;

const CAPACITY: usize = 200;

/// Immutable-once-created incident history, capped at the last 200
/// entries (oldest dropped on overflow).
pub struct IncidentRing {
    entries: Mutex<VecDeque<Incident>>,
}

impl Default for IncidentRing {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentRing {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }

    pub fn push(&self, incident: Incident) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= CAPACITY {
            entries.pop_front();
        }
        entries.push_back(incident);
    }

    /// Returns up to `limit` incidents, newest first.
    pub fn list(&self, limit: usize) -> Vec<Incident> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_common::{Action, AlertKind, Severity, WebhookStatus};

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.into(),
            alert_type: AlertKind::LowBattery,
            severity: Severity::Warning,
            action: Action::NotifyOperator,
            issues: vec!["low battery".into()],
            timestamp: 0,
            subject_node_id: None,
            webhook_status: WebhookStatus::Delivered,
        }
    }

    #[test]
    fn list_returns_newest_first() {
        let ring = IncidentRing::new();
        ring.push(incident("a"));
        ring.push(incident("b"));
        let listed = ring.list(10);
        assert_eq!(listed[0].id, "b");
        assert_eq!(listed[1].id, "a");
    }

    #[test]
    fn caps_at_200_dropping_oldest() {
        let ring = IncidentRing::new();
        for i in 0..205 {
            ring.push(incident(&format!("inc-{i}")));
        }
        assert_eq!(ring.len(), CAPACITY);
        let listed = ring.list(CAPACITY);
        assert!(listed.iter().all(|i| i.id != "inc-0"));
        assert_eq!(listed[0].id, "inc-204");
    }

    #[test]
    fn list_respects_limit() {
        let ring = IncidentRing::new();
        for i in 0..10 {
            ring.push(incident(&format!("inc-{i}")));
        }
        assert_eq!(ring.list(3).len(), 3);
    }
}
