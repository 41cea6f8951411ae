use bridge_common::{MessageRecord, ValidationError};
use bridge_crypto::Envelope;

const MAX_SMS_ID_LEN: usize = 128;
const MAX_BODY_LEN: usize = 4096;

/// Input validation for `POST /api/sms/inbound` (§4.8). Invalid input
/// fails with the specific `ValidationError` variant; the caller maps
/// that to a 400 response and the record is never counted as enqueued.
pub fn validate_message(record: &MessageRecord, envelope: Option<&Envelope>) -> Result<(), ValidationError> {
    if record.sms_id.as_str().is_empty() {
        return Err(ValidationError::SmsIdEmpty);
    }
    if record.sms_id.as_str().chars().count() > MAX_SMS_ID_LEN {
        return Err(ValidationError::SmsIdTooLong { max: MAX_SMS_ID_LEN });
    }
    if record.sender.trim().is_empty() {
        return Err(ValidationError::SenderEmpty);
    }
    if record.node_id.as_str().is_empty() {
        return Err(ValidationError::NodeIdEmpty);
    }
    validate_body_length(record, envelope)
}

/// Encrypted bodies are measured against their decrypted length whenever
/// the envelope can decode them. A token that fails to decrypt here
/// (wrong or rotated key, malformed framing) is not rejected at ingest —
/// per §9's Open Question on the edge encoding, it is admitted and left
/// to the dispatcher's own decrypt-then-DLO path (§7) to resolve.
fn validate_body_length(record: &MessageRecord, envelope: Option<&Envelope>) -> Result<(), ValidationError> {
    if !record.encrypted {
        if record.body.chars().count() > MAX_BODY_LEN {
            return Err(ValidationError::BodyTooLong { max: MAX_BODY_LEN });
        }
        return Ok(());
    }

    if let Some(envelope) = envelope {
        if let Ok(plaintext) = envelope.decrypt_to_string(&record.body) {
            if plaintext.chars().count() > MAX_BODY_LEN {
                return Err(ValidationError::BodyTooLong { max: MAX_BODY_LEN });
            }
        }
    }
    Ok(())
}
