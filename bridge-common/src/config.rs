use std::env;

use crate::error::BridgeError;

fn env_var(name: &str) -> Result<String, BridgeError> {
    env::var(name).map_err(|_| BridgeError::Config(format!("missing required env var {name}")))
}

fn env_var_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, BridgeError> {
    match env_var_opt(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| BridgeError::Config(format!("env var {name} is not a valid value"))),
    }
}

/// All runtime configuration, loaded once at startup from the process
/// environment. Construction fails fast (process exit code 1, per the
/// Ingest Facade's startup contract) rather than defaulting credentials.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    pub fernet_encryption_key: String,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub smtp_from: String,
    pub smtp_to: String,

    pub n8n_webhook_url: String,
    pub n8n_webhook_secret: String,

    pub queue_capacity: usize,
    pub worker_count: usize,
    pub max_retries: u32,

    pub dlo_ttl_sec: u64,
    pub dlo_max: usize,

    pub cto_cooldown_sec: u64,

    pub heartbeat_timeout_sec: u64,
    pub battery_low_mv: i32,
    pub wifi_weak_dbm: i32,
}

impl BridgeConfig {
    /// Loads configuration from the environment, applying the defaults
    /// documented for each knob. Credentials and endpoint addresses have
    /// no defaults and must be present.
    pub fn from_env() -> Result<Self, BridgeError> {
        Ok(Self {
            telegram_bot_token: env_var("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: env_var("TELEGRAM_CHAT_ID")?,

            fernet_encryption_key: env_var("FERNET_ENCRYPTION_KEY")?,

            smtp_host: env_var("SMTP_HOST")?,
            smtp_port: env_parse("SMTP_PORT", 587u16)?,
            smtp_user: env_var("SMTP_USER")?,
            smtp_pass: env_var("SMTP_PASS")?,
            smtp_from: env_var("SMTP_FROM")?,
            smtp_to: env_var("SMTP_TO")?,

            n8n_webhook_url: env_var("N8N_WEBHOOK_URL")?,
            n8n_webhook_secret: env_var("N8N_WEBHOOK_SECRET")?,

            queue_capacity: env_parse("QUEUE_CAPACITY", 10_000usize)?,
            worker_count: env_parse("WORKER_COUNT", 4usize)?,
            max_retries: env_parse("MAX_RETRIES", 5u32)?,

            dlo_ttl_sec: env_parse("DLO_TTL_SEC", 72 * 3600u64)?,
            dlo_max: env_parse("DLO_MAX", 1_000usize)?,

            cto_cooldown_sec: env_parse("CTO_COOLDOWN_SEC", 300u64)?,

            heartbeat_timeout_sec: env_parse("HEARTBEAT_TIMEOUT_SEC", 120u64)?,
            battery_low_mv: env_parse("BATTERY_LOW_MV", 3300i32)?,
            wifi_weak_dbm: env_parse("WIFI_WEAK_DBM", -100i32)?,
        })
    }
}
