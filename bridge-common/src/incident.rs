use serde::{Deserialize, Serialize};

use crate::alert::{Alert, AlertKind, Severity};
use crate::ids::NodeId;

/// Corrective action the CTO-Agent attaches to an incident, derived
/// deterministically from the triggering alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    NotifyOperator,
    RestartNetworkSwitch,
    RestartGatewayNode,
    EmergencyQueueDrain,
    LogOnly,
}

impl Action {
    pub fn for_alert_kind(kind: AlertKind) -> Self {
        match kind {
            AlertKind::HeartbeatTimeout | AlertKind::WeakSignal => Action::RestartNetworkSwitch,
            AlertKind::LowBattery => Action::NotifyOperator,
            AlertKind::WdtStorm => Action::RestartGatewayNode,
            AlertKind::QueueNearFull => Action::EmergencyQueueDrain,
            AlertKind::DloGrowth => Action::NotifyOperator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookStatus {
    Pending,
    Delivered,
    Failed,
    Suppressed,
}

/// An Alert that has been processed by the CTO-Agent: assigned an id,
/// given a derived action, and (unless suppressed by cooldown) signed and
/// posted to the external automation webhook. Immutable once created,
/// except for the `webhook_status` field which is set once the POST
/// resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub alert_type: AlertKind,
    pub severity: Severity,
    pub action: Action,
    pub issues: Vec<String>,
    pub timestamp: u64,
    pub subject_node_id: Option<NodeId>,
    pub webhook_status: WebhookStatus,
}

impl Incident {
    pub fn from_alert(id: String, alert: &Alert, timestamp: u64, webhook_status: WebhookStatus) -> Self {
        Self {
            id,
            alert_type: alert.kind,
            severity: alert.severity,
            action: Action::for_alert_kind(alert.kind),
            issues: alert.issues.clone(),
            timestamp,
            subject_node_id: alert.subject_node_id.clone(),
            webhook_status,
        }
    }

    /// The exact field set and ordering the CTO-Agent signs: canonical JSON
    /// is produced from this map by `bridge-agent`, not from `self`
    /// directly, so that key order is independent of struct field order.
    pub fn signable_fields(&self) -> SignableIncident<'_> {
        SignableIncident {
            id: &self.id,
            alert_type: self.alert_type,
            severity: self.severity,
            action: self.action,
            issues: &self.issues,
            timestamp: self.timestamp,
            subject_node_id: self.subject_node_id.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignableIncident<'a> {
    pub id: &'a str,
    pub alert_type: AlertKind,
    pub severity: Severity,
    pub action: Action,
    pub issues: &'a [String],
    pub timestamp: u64,
    pub subject_node_id: Option<&'a NodeId>,
}
