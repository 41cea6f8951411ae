use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialises the global `tracing` subscriber. Reads `LOG_LEVEL`
/// (falling back to `RUST_LOG`, then `info`) so operators can raise
/// verbosity without a redeploy.
///
/// Must be called exactly once, before any other bridge component logs.
/// Never logs secrets: callers are responsible for keeping the Fernet
/// key, the webhook HMAC secret, and decrypted message bodies out of any
/// `tracing` event field.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer().with_target(true).with_ansi(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
