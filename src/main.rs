//! Entrypoint for the SMS-to-operator delivery bridge (§6): loads
//! configuration, wires the queue, dispatchers, Dead Letter Office, node
//! health monitor, and CTO-Agent together, then serves the Ingest Facade
//! until a shutdown signal arrives.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use bridge_agent::{AgentConfig, CtoAgent};
use bridge_api::AppState;
use bridge_common::config::BridgeConfig;
use bridge_crypto::Envelope;
use bridge_dispatch::{EmailDispatcher, TelegramDispatcher};
use bridge_dlo::DeadLetterOffice;
use bridge_health::NodeHealthMonitor;
use bridge_queue::{MessageQueue, RetryPolicy};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

const LISTEN_ADDR: &str = "0.0.0.0:8080";
const HEALTH_EVAL_INTERVAL: Duration = Duration::from_secs(15);
const DLO_PRUNE_INTERVAL: Duration = Duration::from_secs(60);
/// DLO growth alert fires once the store crosses 80% of its configured
/// capacity, per the design notes' threshold table.
const DLO_GROWTH_RATIO_NUM: usize = 8;
const DLO_GROWTH_RATIO_DEN: usize = 10;

static SHUTDOWN: LazyLock<broadcast::Sender<()>> = LazyLock::new(|| broadcast::channel(16).0);

#[tokio::main]
async fn main() {
    bridge_common::logging::init_tracing();

    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!(error = %e, "unrecoverable runtime error");
        std::process::exit(2);
    }
}

async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let envelope = Arc::new(Envelope::from_base64_key(&config.fernet_encryption_key)?);

    let telegram = Arc::new(TelegramDispatcher::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
        Some(envelope.clone()),
    ));
    let email = Arc::new(EmailDispatcher::new(
        config.smtp_host.clone(),
        config.smtp_port,
        config.smtp_user.clone(),
        config.smtp_pass.clone(),
        config.smtp_from.clone(),
        config.smtp_to.clone(),
        Some(envelope.clone()),
    ));

    let dlo = Arc::new(DeadLetterOffice::new(config.dlo_max, config.dlo_ttl_sec));
    let health = Arc::new(NodeHealthMonitor::new(
        config.heartbeat_timeout_sec,
        config.battery_low_mv,
        config.wifi_weak_dbm,
    ));
    let agent = Arc::new(CtoAgent::new(AgentConfig {
        webhook_url: config.n8n_webhook_url.clone(),
        webhook_secret: config.n8n_webhook_secret.clone(),
        cooldown_sec: config.cto_cooldown_sec,
    }));

    let dlo_growth_threshold = config.dlo_max * DLO_GROWTH_RATIO_NUM / DLO_GROWTH_RATIO_DEN;

    // DLO capture -> health growth check, and health alert -> agent
    // dispatch, wired through callbacks rather than direct calls so none
    // of bridge-dlo, bridge-health, or bridge-agent import each other.
    {
        let health = health.clone();
        dlo.on_capture(Box::new(move |size| {
            health.check_dlo_size(size, dlo_growth_threshold);
        }));
    }
    {
        let agent = agent.clone();
        health.on_alert(Box::new(move |alert| {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent.handle(alert).await;
            });
        }));
    }

    let queue = Arc::new(MessageQueue::new(
        config.queue_capacity,
        telegram.clone(),
        email.clone(),
        dlo.clone(),
        RetryPolicy::new(config.max_retries),
    ));
    queue.start(config.worker_count);

    {
        let queue = queue.clone();
        tokio::spawn(
            health
                .clone()
                .serve(HEALTH_EVAL_INTERVAL, SHUTDOWN.subscribe(), move || {
                    (queue.depth(), queue.capacity())
                }),
        );
    }
    tokio::spawn(dlo_prune_loop(dlo.clone()));
    tokio::spawn(shutdown_signal());

    let state = AppState {
        queue: queue.clone(),
        dlo,
        health,
        agent,
        telegram,
        email,
        envelope: Some(envelope),
    };

    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!(address = LISTEN_ADDR, "ingest facade listening");

    axum::serve(listener, bridge_api::router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    info!("server stopped, draining queue workers");
    queue.stop().await;
    Ok(())
}

async fn wait_for_shutdown() {
    let mut rx = SHUTDOWN.subscribe();
    let _ = rx.recv().await;
}

/// Races CTRL+C against SIGTERM and broadcasts a single shutdown signal to
/// every other task racing `SHUTDOWN.subscribe()`.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("CTRL+C received, shutting down"),
        () = terminate => info!("SIGTERM received, shutting down"),
    }

    let _ = SHUTDOWN.send(());
}

/// Sweeps the Dead Letter Office for TTL-expired entries on a fixed
/// interval, per §4.5.
async fn dlo_prune_loop(dlo: Arc<DeadLetterOffice>) {
    let mut ticker = tokio::time::interval(DLO_PRUNE_INTERVAL);
    let mut shutdown = SHUTDOWN.subscribe();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let pruned = dlo.prune_expired();
                if pruned > 0 {
                    warn!(pruned, "pruned expired dead letters");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
