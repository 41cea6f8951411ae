//! Node Health Monitor (§4.6): aggregates per-node telemetry, detects
//! threshold breaches and heartbeat timeouts, and publishes alerts for the
//! CTO-Agent to consume. The monitor never sends anything itself.

mod monitor;

pub use monitor::{HealthSnapshot, NodeHealthMonitor, OnAlertFn};
