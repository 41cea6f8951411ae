//! The Ingest Facade (§4.8): the HTTP surface cellular edge nodes and
//! operators use to submit SMS, report telemetry, and read back queue,
//! health, metrics, and incident state.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use routes::router;
pub use state::AppState;
