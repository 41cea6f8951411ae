//! Shared data model, error types, configuration, and logging setup for the
//! SMS-to-operator delivery bridge.

pub mod alert;
pub mod config;
pub mod error;
pub mod ids;
pub mod incident;
pub mod logging;
pub mod message;
pub mod response;
pub mod telemetry;

pub use alert::{Alert, AlertKind, Severity};
pub use error::{BridgeError, ValidationError};
pub use ids::{NodeId, SmsId};
pub use incident::{Action, Incident, WebhookStatus};
pub use message::{MessageRecord, Priority};
pub use response::ApiResponse;
pub use telemetry::{NodeState, NodeTelemetrySample};

/// Seconds since the Unix epoch, used throughout the bridge instead of
/// `SystemTime` directly so timestamps serialize as plain integers.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
