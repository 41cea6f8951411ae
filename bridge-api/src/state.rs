use std::sync::Arc;

use bridge_agent::CtoAgent;
use bridge_crypto::Envelope;
use bridge_dispatch::{EmailDispatcher, TelegramDispatcher};
use bridge_dlo::DeadLetterOffice;
use bridge_health::NodeHealthMonitor;
use bridge_queue::MessageQueue;

/// Everything the Ingest Facade's handlers need, handed out by the
/// application root at startup. Cheaply cloneable: every field is an
/// `Arc`, so cloning `AppState` for each request is just reference
/// counting, the same shape `axum::extract::State` expects.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<MessageQueue>,
    pub dlo: Arc<DeadLetterOffice>,
    pub health: Arc<NodeHealthMonitor>,
    pub agent: Arc<CtoAgent>,
    pub telegram: Arc<TelegramDispatcher>,
    pub email: Arc<EmailDispatcher>,
    pub envelope: Option<Arc<Envelope>>,
}
