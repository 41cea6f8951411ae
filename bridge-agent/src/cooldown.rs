use std::collections::HashMap;
use std::sync::Mutex;

use bridge_common::AlertKind;

/// Per-alert-kind cooldown state machine: idle -> active (on dispatch) ->
/// idle (on cooldown expiry). Stored as the timestamp the cooldown
/// expires at; a kind with no entry, or an entry in the past, is idle.
pub struct CooldownMap {
    active_until: Mutex<HashMap<AlertKind, u64>>,
    cooldown_sec: u64,
}

impl CooldownMap {
    pub fn new(cooldown_sec: u64) -> Self {
        Self {
            active_until: Mutex::new(HashMap::new()),
            cooldown_sec,
        }
    }

    pub fn is_active(&self, kind: AlertKind, now: u64) -> bool {
        self.active_until
            .lock()
            .unwrap()
            .get(&kind)
            .is_some_and(|&expiry| expiry > now)
    }

    /// Moves the kind's cooldown entry to `active`, expiring
    /// `cooldown_sec` from now. Called only on non-network-failure
    /// outcomes, per the design notes: a failed transport shouldn't block
    /// the next attempt from going out.
    pub fn stamp(&self, kind: AlertKind, now: u64) {
        self.active_until
            .lock()
            .unwrap()
            .insert(kind, now + self.cooldown_sec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_by_default() {
        let map = CooldownMap::new(300);
        assert!(!map.is_active(AlertKind::LowBattery, 1_000));
    }

    #[test]
    fn active_immediately_after_stamp() {
        let map = CooldownMap::new(300);
        map.stamp(AlertKind::LowBattery, 1_000);
        assert!(map.is_active(AlertKind::LowBattery, 1_100));
    }

    #[test]
    fn idle_again_after_expiry() {
        let map = CooldownMap::new(300);
        map.stamp(AlertKind::LowBattery, 1_000);
        assert!(!map.is_active(AlertKind::LowBattery, 1_301));
    }

    #[test]
    fn kinds_are_independent() {
        let map = CooldownMap::new(300);
        map.stamp(AlertKind::LowBattery, 1_000);
        assert!(!map.is_active(AlertKind::WeakSignal, 1_000));
    }
}
