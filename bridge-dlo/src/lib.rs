//! Dead Letter Office (§4.5): retains records that exhausted retries,
//! with bounded capacity, TTL-based expiry, listing, and manual retry.

mod error;
mod store;

pub use error::DloError;
pub use store::{DeadLetter, DeadLetterOffice, OnCaptureFn, SerializedDeadLetter};
