use thiserror::Error;

/// Failures produced while validating inbound data at the Ingest Facade
/// boundary (§4.8). Kept separate from `BridgeError` so the API layer can
/// map each variant to a precise 400 response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("sms_id must not be empty")]
    SmsIdEmpty,
    #[error("sms_id must not exceed {max} characters")]
    SmsIdTooLong { max: usize },
    #[error("sender must not be empty")]
    SenderEmpty,
    #[error("body must not exceed {max} characters")]
    BodyTooLong { max: usize },
    #[error("node_id must not be empty")]
    NodeIdEmpty,
}

/// Top-level error type shared across bridge components, used wherever a
/// concern outside validation (config, crypto, startup wiring) is
/// surfaced.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
