//! Webhook notification authentication
//!
//! The gateway signs each notification with
//! `sha512(order_id + status_code + gross_amount + server_key)` and sends
//! the hex digest as `signature_key`.

use crate::gateway::types::GatewayNotification;
use crate::gateway::utils::secure_eq;
use sha2::{Digest, Sha512};

pub fn notification_signature(
    order_id: &str,
    status_code: &str,
    gross_amount: &str,
    server_key: &str,
) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a notification's signature in constant time
///
/// A missing `signature_key` fails verification.
pub fn verify_notification_signature(
    notification: &GatewayNotification,
    server_key: &str,
) -> bool {
    let provided = match &notification.signature_key {
        Some(signature) => signature.trim(),
        None => return false,
    };

    let expected = notification_signature(
        &notification.order_id,
        &notification.status_code,
        &notification.gross_amount,
        server_key,
    );

    secure_eq(expected.as_bytes(), provided.to_lowercase().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(signature_key: Option<String>) -> GatewayNotification {
        GatewayNotification {
            order_id: "tx-1".to_string(),
            status_code: "200".to_string(),
            gross_amount: "50000.00".to_string(),
            signature_key,
            transaction_status: "settlement".to_string(),
            fraud_status: None,
        }
    }

    #[test]
    fn accepts_valid_signature() {
        let signature = notification_signature("tx-1", "200", "50000.00", "server-key");
        let note = notification(Some(signature));
        assert!(verify_notification_signature(&note, "server-key"));
    }

    #[test]
    fn rejects_wrong_server_key() {
        let signature = notification_signature("tx-1", "200", "50000.00", "other-key");
        let note = notification(Some(signature));
        assert!(!verify_notification_signature(&note, "server-key"));
    }

    #[test]
    fn rejects_tampered_fields() {
        let signature = notification_signature("tx-1", "200", "50000.00", "server-key");
        let mut note = notification(Some(signature));
        note.gross_amount = "99999.00".to_string();
        assert!(!verify_notification_signature(&note, "server-key"));
    }

    #[test]
    fn rejects_missing_signature() {
        let note = notification(None);
        assert!(!verify_notification_signature(&note, "server-key"));
    }

    #[test]
    fn signature_is_hex_sha512() {
        let signature = notification_signature("tx-1", "200", "50000.00", "server-key");
        assert_eq!(signature.len(), 128);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
