//! The autonomous CTO-Agent (§4.7): receives alerts from the health
//! monitor and the DLO, suppresses duplicates within a per-kind cooldown,
//! composes a signed incident record, and posts it to an external
//! automation webhook.

mod agent;
mod cooldown;
mod ring;
mod sign;

pub use agent::{AgentConfig, CtoAgent};
pub use cooldown::CooldownMap;
pub use ring::IncidentRing;
