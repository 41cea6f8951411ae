use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HeartbeatTimeout,
    LowBattery,
    WeakSignal,
    QueueNearFull,
    WdtStorm,
    DloGrowth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    Emergency,
}

/// Raised by the health monitor (or, for `queue_near_full`/`dlo_growth`,
/// by the queue and DLO respectively) when a threshold is breached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub issues: Vec<String>,
    pub subject_node_id: Option<NodeId>,
}

impl Alert {
    pub fn new(kind: AlertKind, severity: Severity, issues: Vec<String>) -> Self {
        Self {
            kind,
            severity,
            issues,
            subject_node_id: None,
        }
    }

    pub fn with_subject(mut self, node_id: NodeId) -> Self {
        self.subject_node_id = Some(node_id);
        self
    }
}
