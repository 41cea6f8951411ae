use bridge_common::Incident;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Serializes the signable subset of an incident to canonical JSON: UTF-8,
/// no whitespace, keys sorted. `serde_json::Value`'s object representation
/// is a `BTreeMap` (this workspace does not enable the `preserve_order`
/// feature), so round-tripping through `Value` sorts keys for free.
pub fn canonical_json(incident: &Incident) -> Vec<u8> {
    let value = serde_json::to_value(incident.signable_fields())
        .expect("signable incident fields always serialize");
    serde_json::to_vec(&value).expect("canonical value always serializes")
}

/// Computes `sha256=<hex>`, the exact form the webhook's `X-Signature`
/// header carries.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_common::{Action, AlertKind, Severity, WebhookStatus};

    fn incident() -> Incident {
        Incident {
            id: "inc-20260727-001".into(),
            alert_type: AlertKind::LowBattery,
            severity: Severity::Warning,
            action: Action::NotifyOperator,
            issues: vec!["battery at 3000mV".into()],
            timestamp: 1_800_000_000,
            subject_node_id: Some("node-1".into()),
            webhook_status: WebhookStatus::Pending,
        }
    }

    #[test]
    fn canonical_json_has_sorted_keys_and_no_whitespace() {
        let bytes = canonical_json(&incident());
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains(' '));
        let action_pos = text.find("\"action\"").unwrap();
        let alert_type_pos = text.find("\"alert_type\"").unwrap();
        assert!(action_pos < alert_type_pos);
    }

    #[test]
    fn signature_is_deterministic_for_same_input() {
        let body = canonical_json(&incident());
        let sig_a = sign("secret", &body);
        let sig_b = sign("secret", &body);
        assert_eq!(sig_a, sig_b);
        assert!(sig_a.starts_with("sha256="));
    }

    #[test]
    fn signature_changes_with_secret() {
        let body = canonical_json(&incident());
        assert_ne!(sign("secret-a", &body), sign("secret-b", &body));
    }
}
