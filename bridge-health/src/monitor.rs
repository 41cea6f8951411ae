use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use bridge_common::{now_secs, Alert, AlertKind, NodeId, NodeState, NodeTelemetrySample, Severity};
use tracing::debug;

const WDT_STORM_WINDOW_SEC: u64 = 3600;
const WDT_STORM_THRESHOLD: u32 = 5;
const QUEUE_NEAR_FULL_RATIO: f64 = 0.9;

/// Per-node bookkeeping beyond the latest telemetry sample: the watchdog
/// baseline used to detect a storm of resets within a rolling hour.
struct TrackedNode {
    state: NodeState,
    wdt_baseline: u32,
    wdt_baseline_set_at: u64,
}

/// Aggregated view returned by `snapshot`: latest per-node state plus
/// whatever alarms are currently active.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub nodes: Vec<NodeState>,
    pub alerts: Vec<Alert>,
}

pub type OnAlertFn = Box<dyn Fn(Alert) + Send + Sync>;

/// Accepts telemetry samples per edge node, tracks current state, and
/// evaluates the threshold table from the design notes on every ingest
/// and on an external timer tick.
pub struct NodeHealthMonitor {
    nodes: RwLock<HashMap<NodeId, TrackedNode>>,
    heartbeat_timeout_sec: u64,
    battery_low_mv: i32,
    wifi_weak_dbm: i32,
    on_alert: Mutex<Option<OnAlertFn>>,
    dlo_over_threshold: AtomicBool,
}

impl NodeHealthMonitor {
    pub fn new(heartbeat_timeout_sec: u64, battery_low_mv: i32, wifi_weak_dbm: i32) -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            heartbeat_timeout_sec,
            battery_low_mv,
            wifi_weak_dbm,
            on_alert: Mutex::new(None),
            dlo_over_threshold: AtomicBool::new(false),
        }
    }

    pub fn on_alert(&self, f: OnAlertFn) {
        *self.on_alert.lock().unwrap() = Some(f);
    }

    fn publish(&self, alert: Alert) {
        if let Some(cb) = self.on_alert.lock().unwrap().as_ref() {
            cb(alert);
        }
    }

    /// Records a telemetry sample and immediately evaluates the
    /// node-local rules (battery, signal, watchdog storm, and — since the
    /// node just proved it's alive — heartbeat timeout is skipped here and
    /// left to the periodic `evaluate` sweep).
    pub fn ingest(&self, sample: NodeTelemetrySample) {
        let node_id = sample.node_id.clone();
        let mut nodes = self.nodes.write().unwrap();

        let entry = nodes.entry(node_id.clone()).or_insert_with(|| TrackedNode {
            state: NodeState::from_sample(sample.clone()),
            wdt_baseline: sample.wdt_resets,
            wdt_baseline_set_at: sample.received_at,
        });

        if sample.received_at.saturating_sub(entry.wdt_baseline_set_at) > WDT_STORM_WINDOW_SEC {
            entry.wdt_baseline = sample.wdt_resets;
            entry.wdt_baseline_set_at = sample.received_at;
        }

        entry.state.update(sample.clone());

        let alerts = self.evaluate_node_locked(&node_id, entry, sample.received_at, false);
        drop(nodes);

        for alert in alerts {
            self.publish(alert);
        }
    }

    fn evaluate_node_locked(
        &self,
        node_id: &NodeId,
        tracked: &TrackedNode,
        now: u64,
        include_heartbeat: bool,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let sample = &tracked.state.sample;

        if include_heartbeat && tracked.state.is_stale(now, self.heartbeat_timeout_sec) {
            alerts.push(
                Alert::new(
                    AlertKind::HeartbeatTimeout,
                    Severity::Critical,
                    vec![format!(
                        "node {node_id} last seen {}s ago (timeout {}s)",
                        now.saturating_sub(tracked.state.last_seen),
                        self.heartbeat_timeout_sec
                    )],
                )
                .with_subject(node_id.clone()),
            );
        }

        if sample.battery_mv < self.battery_low_mv {
            alerts.push(
                Alert::new(
                    AlertKind::LowBattery,
                    Severity::Warning,
                    vec![format!(
                        "node {node_id} battery at {}mV (threshold {}mV)",
                        sample.battery_mv, self.battery_low_mv
                    )],
                )
                .with_subject(node_id.clone()),
            );
        }

        if sample.wifi_rssi < self.wifi_weak_dbm {
            alerts.push(
                Alert::new(
                    AlertKind::WeakSignal,
                    Severity::Warning,
                    vec![format!(
                        "node {node_id} signal at {}dBm (threshold {}dBm)",
                        sample.wifi_rssi, self.wifi_weak_dbm
                    )],
                )
                .with_subject(node_id.clone()),
            );
        }

        let wdt_delta = sample.wdt_resets.saturating_sub(tracked.wdt_baseline);
        if wdt_delta > WDT_STORM_THRESHOLD {
            alerts.push(
                Alert::new(
                    AlertKind::WdtStorm,
                    Severity::Warning,
                    vec![format!(
                        "node {node_id} had {wdt_delta} watchdog resets in the last hour"
                    )],
                )
                .with_subject(node_id.clone()),
            );
        }

        alerts
    }

    /// Pure function of current state: evaluates every tracked node,
    /// including heartbeat timeouts. Intended to be driven by the
    /// 15-second timer as well as ad hoc inspection (e.g. tests).
    pub fn evaluate(&self) -> Vec<Alert> {
        let now = now_secs();
        let nodes = self.nodes.read().unwrap();
        nodes
            .iter()
            .flat_map(|(node_id, tracked)| self.evaluate_node_locked(node_id, tracked, now, true))
            .collect()
    }

    /// Runs `evaluate` and publishes any alerts found. Meant to be called
    /// from the periodic health-evaluation timer.
    pub fn evaluate_and_publish(&self) {
        for alert in self.evaluate() {
            self.publish(alert);
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let nodes = self.nodes.read().unwrap();
        let node_states = nodes.values().map(|t| t.state.clone()).collect();
        drop(nodes);
        HealthSnapshot {
            nodes: node_states,
            alerts: self.evaluate(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn heartbeat_timeout_sec(&self) -> u64 {
        self.heartbeat_timeout_sec
    }

    /// Count of tracked nodes currently stale (no sample within the
    /// heartbeat timeout), for the Ingest Facade's `/api/health` surface.
    pub fn stale_node_count(&self) -> usize {
        let now = now_secs();
        self.nodes
            .read()
            .unwrap()
            .values()
            .filter(|t| t.state.is_stale(now, self.heartbeat_timeout_sec))
            .count()
    }

    /// Drives `evaluate_and_publish` on a fixed interval until `shutdown`
    /// fires, also feeding `queue_depth` the queue's current depth and
    /// capacity each tick for the `queue_near_full` rule. The bridge's
    /// 15-second health sweep runs this against an `Arc<NodeHealthMonitor>`
    /// spawned alongside the queue workers; `queue_depth` is a closure
    /// rather than a direct `bridge-queue` dependency so this crate stays
    /// out of that cyclic reference (§9's design notes).
    pub async fn serve(
        self: std::sync::Arc<Self>,
        interval: std::time::Duration,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
        queue_depth: impl Fn() -> (usize, usize) + Send + Sync + 'static,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.evaluate_and_publish();
                    let (depth, capacity) = queue_depth();
                    self.check_queue_depth(depth, capacity);
                }
                _ = shutdown.recv() => {
                    debug!("health monitor shutting down");
                    break;
                }
            }
        }
    }

    /// `queue_near_full` is an externally-driven rule: the queue reports
    /// its depth and capacity, the monitor decides whether it crosses the
    /// 90% threshold and, if so, publishes an emergency alert.
    pub fn check_queue_depth(&self, depth: usize, capacity: usize) {
        if capacity == 0 {
            return;
        }
        let ratio = depth as f64 / capacity as f64;
        if ratio > QUEUE_NEAR_FULL_RATIO {
            self.publish(Alert::new(
                AlertKind::QueueNearFull,
                Severity::Emergency,
                vec![format!("queue depth {depth}/{capacity} ({:.0}%)", ratio * 100.0)],
            ));
        }
    }

    /// `dlo_growth` fires only on crossing the configured threshold, not
    /// on every tick the DLO stays above it.
    pub fn check_dlo_size(&self, size: usize, threshold: usize) {
        let over = size >= threshold;
        let was_over = self.dlo_over_threshold.swap(over, Ordering::Relaxed);
        if over && !was_over {
            self.publish(Alert::new(
                AlertKind::DloGrowth,
                Severity::Warning,
                vec![format!("DLO size {size} crossed threshold {threshold}")],
            ));
        } else {
            debug!(size, threshold, "dlo size below growth threshold");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(node_id: &str, now: u64) -> NodeTelemetrySample {
        NodeTelemetrySample {
            node_id: node_id.into(),
            battery_mv: 4000,
            wifi_rssi: -60,
            wifi_state: 1,
            reconnects: 0,
            wdt_resets: 0,
            uptime_sec: 1000,
            heap_free: 40_000,
            received_at: now,
        }
    }

    #[test]
    fn low_battery_triggers_warning() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let mut s = sample("n1", now_secs());
        s.battery_mv = 3000;
        monitor.ingest(s);

        let snap = monitor.snapshot();
        assert!(snap
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::LowBattery && a.severity == Severity::Warning));
    }

    #[test]
    fn weak_signal_triggers_warning() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let mut s = sample("n1", now_secs());
        s.wifi_rssi = -110;
        monitor.ingest(s);

        let snap = monitor.snapshot();
        assert!(snap
            .alerts
            .iter()
            .any(|a| a.kind == AlertKind::WeakSignal));
    }

    #[test]
    fn healthy_sample_raises_nothing() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        monitor.ingest(sample("n1", now_secs()));
        let snap = monitor.snapshot();
        assert!(snap.alerts.is_empty());
    }

    #[test]
    fn wdt_storm_triggers_after_six_resets_in_window() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let base = now_secs();
        monitor.ingest(sample("n1", base));

        let mut s = sample("n1", base + 10);
        s.wdt_resets = 6;
        monitor.ingest(s);

        let snap = monitor.snapshot();
        assert!(snap.alerts.iter().any(|a| a.kind == AlertKind::WdtStorm));
    }

    #[test]
    fn heartbeat_timeout_detected_on_evaluate() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let stale_time = now_secs().saturating_sub(200);
        monitor.ingest(sample("n1", stale_time));

        let alerts = monitor.evaluate();
        assert!(alerts.iter().any(|a| a.kind == AlertKind::HeartbeatTimeout));
    }

    #[test]
    fn queue_near_full_fires_only_above_90_percent() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let fired = std::sync::Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        monitor.on_alert(Box::new(move |a| {
            if a.kind == AlertKind::QueueNearFull {
                fired_clone.store(true, Ordering::Relaxed);
            }
        }));

        monitor.check_queue_depth(800, 1000);
        assert!(!fired.load(Ordering::Relaxed));

        monitor.check_queue_depth(950, 1000);
        assert!(fired.load(Ordering::Relaxed));
    }

    #[test]
    fn dlo_growth_fires_only_on_crossing() {
        let monitor = NodeHealthMonitor::new(120, 3300, -100);
        let count = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let count_clone = count.clone();
        monitor.on_alert(Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        }));

        monitor.check_dlo_size(10, 100);
        assert_eq!(count.load(Ordering::Relaxed), 0);

        monitor.check_dlo_size(120, 100);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        monitor.check_dlo_size(130, 100);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        monitor.check_dlo_size(50, 100);
        monitor.check_dlo_size(120, 100);
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
