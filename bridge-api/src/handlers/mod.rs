pub mod dlo;
pub mod health;
pub mod incidents;
pub mod inbound;
pub mod metrics;
pub mod telemetry;
