use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_common::MessageRecord;
use bridge_crypto::Envelope;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{DispatchOutcome, Dispatcher};

/// Fallback channel. Opens an SMTP session per call — fallback traffic is
/// light enough that connection pooling isn't worth the complexity.
pub struct EmailDispatcher {
    smtp_host: String,
    smtp_port: u16,
    smtp_user: String,
    smtp_pass: String,
    smtp_from: String,
    smtp_to: String,
    envelope: Option<Arc<Envelope>>,

    total_sent: AtomicU64,
    total_errors: AtomicU64,
}

impl EmailDispatcher {
    pub fn new(
        smtp_host: String,
        smtp_port: u16,
        smtp_user: String,
        smtp_pass: String,
        smtp_from: String,
        smtp_to: String,
        envelope: Option<Arc<Envelope>>,
    ) -> Self {
        Self {
            smtp_host,
            smtp_port,
            smtp_user,
            smtp_pass,
            smtp_from,
            smtp_to,
            envelope,
            total_sent: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    pub fn total_sent(&self) -> u64 {
        self.total_sent.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    fn decrypt_body(&self, record: &MessageRecord) -> Result<String, DispatchOutcome> {
        if !record.encrypted {
            return Ok(record.body.clone());
        }
        match &self.envelope {
            Some(envelope) => envelope.decrypt_to_string(&record.body).map_err(|e| {
                DispatchOutcome::TerminalError(format!("cannot decrypt message body: {e}"))
            }),
            None => Err(DispatchOutcome::TerminalError(
                "message marked encrypted but no encryption key is configured".into(),
            )),
        }
    }

    fn build_transport(
        &self,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchOutcome> {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.smtp_host)
            .map(|builder| {
                builder
                    .port(self.smtp_port)
                    .credentials(Credentials::new(
                        self.smtp_user.clone(),
                        self.smtp_pass.clone(),
                    ))
                    .build()
            })
            .map_err(|e| DispatchOutcome::TerminalError(format!("smtp relay config error: {e}")))
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    async fn send(&self, record: &MessageRecord) -> DispatchOutcome {
        let body = match self.decrypt_body(record) {
            Ok(body) => body,
            Err(outcome) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return outcome;
            }
        };

        let from: Mailbox = match self.smtp_from.parse() {
            Ok(m) => m,
            Err(e) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::TerminalError(format!("malformed from address: {e}"));
            }
        };
        let to: Mailbox = match self.smtp_to.parse() {
            Ok(m) => m,
            Err(e) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::TerminalError(format!("malformed to address: {e}"));
            }
        };

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("OTP from {}", record.sender))
            .body(body);

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::TerminalError(format!("malformed message: {e}"));
            }
        };

        let transport = match self.build_transport() {
            Ok(t) => t,
            Err(outcome) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                return outcome;
            }
        };

        match transport.send(message).await {
            Ok(_) => {
                self.total_sent.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::Delivered
            }
            Err(e) => {
                self.total_errors.fetch_add(1, Ordering::Relaxed);
                if e.is_permanent() || e.is_client_error() {
                    DispatchOutcome::TerminalError(format!("smtp rejected message: {e}"))
                } else {
                    DispatchOutcome::TransientError(format!("smtp transient failure: {e}"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> EmailDispatcher {
        EmailDispatcher::new(
            "smtp.example.com".into(),
            587,
            "user@example.com".into(),
            "pass".into(),
            "bridge@example.com".into(),
            "ops@example.com".into(),
            None,
        )
    }

    #[test]
    fn encrypted_body_without_envelope_is_terminal() {
        let d = dispatcher();
        let record = MessageRecord {
            sms_id: "a".into(),
            sender: "+10000000000".into(),
            body: "ciphertext".into(),
            timestamp: 0,
            node_id: "node-1".into(),
            priority: bridge_common::Priority::Normal,
            encrypted: true,
            retry_count: 0,
            last_error: None,
            created_at: 0,
        };
        match d.decrypt_body(&record) {
            Err(DispatchOutcome::TerminalError(_)) => {}
            other => panic!("expected TerminalError, got {other:?}"),
        }
    }

    #[test]
    fn builds_transport_for_valid_host() {
        let d = dispatcher();
        assert!(d.build_transport().is_ok());
    }
}
