use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// A single telemetry report from a cellular edge node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTelemetrySample {
    pub node_id: NodeId,
    pub battery_mv: i32,
    /// dBm, negative.
    pub wifi_rssi: i32,
    pub wifi_state: u8,
    pub reconnects: u32,
    pub wdt_resets: u32,
    pub uptime_sec: u64,
    pub heap_free: u64,
    #[serde(default = "crate::now_secs")]
    pub received_at: u64,
}

/// Latest known state for a node: the most recent telemetry sample plus
/// when it was last seen. A node is stale when `now - last_seen` exceeds
/// the configured heartbeat timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub node_id: NodeId,
    pub sample: NodeTelemetrySample,
    pub last_seen: u64,
}

impl NodeState {
    pub fn from_sample(sample: NodeTelemetrySample) -> Self {
        Self {
            node_id: sample.node_id.clone(),
            last_seen: sample.received_at,
            sample,
        }
    }

    pub fn update(&mut self, sample: NodeTelemetrySample) {
        self.last_seen = sample.received_at;
        self.sample = sample;
    }

    pub fn is_stale(&self, now: u64, heartbeat_timeout_sec: u64) -> bool {
        now.saturating_sub(self.last_seen) > heartbeat_timeout_sec
    }
}
