use std::sync::Arc;

use bridge_agent::{AgentConfig, CtoAgent};
use bridge_dispatch::{EmailDispatcher, TelegramDispatcher};
use bridge_dlo::DeadLetterOffice;
use bridge_health::NodeHealthMonitor;
use bridge_queue::{MessageQueue, RetryPolicy};

use crate::state::AppState;

/// Builds an `AppState` wired to real (but unreachable) dispatchers, for
/// handler tests that exercise routing, validation, and the queue/DLO
/// surface without making a network call.
pub(crate) fn test_state() -> (
    AppState,
    Arc<TelegramDispatcher>,
    Arc<EmailDispatcher>,
    Arc<DeadLetterOffice>,
) {
    let telegram = Arc::new(TelegramDispatcher::new(
        "test-token".into(),
        "chat-1".into(),
        None,
    ));
    let email = Arc::new(EmailDispatcher::new(
        "smtp.example.com".into(),
        587,
        "user@example.com".into(),
        "pass".into(),
        "bridge@example.com".into(),
        "ops@example.com".into(),
        None,
    ));
    let dlo = Arc::new(DeadLetterOffice::new(100, 3600));
    let queue = Arc::new(MessageQueue::new(
        10,
        telegram.clone(),
        email.clone(),
        dlo.clone(),
        RetryPolicy::new(5),
    ));
    let health = Arc::new(NodeHealthMonitor::new(120, 3300, -100));
    let agent = Arc::new(CtoAgent::new(AgentConfig {
        webhook_url: "https://example.com/webhook".into(),
        webhook_secret: "shh".into(),
        cooldown_sec: 300,
    }));

    let state = AppState {
        queue,
        dlo: dlo.clone(),
        health,
        agent,
        telegram: telegram.clone(),
        email: email.clone(),
        envelope: None,
    };
    (state, telegram, email, dlo)
}
