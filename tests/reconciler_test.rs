//! Gateway status mapping tests
//!
//! Tests cover:
//! - The full settlement report mapping table
//! - Fraud review outcomes for card captures
//! - Reports that must not change local state

use trashvalue_backend::services::payment_reconciler::map_gateway_status;
use trashvalue_backend::services::transaction_manager::TransactionStatus;

#[test]
fn test_settlement_mapping_table() {
    let cases: &[(&str, Option<&str>, Option<TransactionStatus>)] = &[
        ("capture", Some("challenge"), Some(TransactionStatus::Processing)),
        ("capture", Some("accept"), Some(TransactionStatus::Completed)),
        ("capture", Some("deny"), None),
        ("capture", None, None),
        ("settlement", None, Some(TransactionStatus::Completed)),
        ("settlement", Some("accept"), Some(TransactionStatus::Completed)),
        ("cancel", None, Some(TransactionStatus::Rejected)),
        ("deny", None, Some(TransactionStatus::Rejected)),
        ("expire", None, Some(TransactionStatus::Rejected)),
        ("pending", None, Some(TransactionStatus::Processing)),
        ("refund", None, None),
        ("partial_refund", None, None),
        ("authorize", None, None),
        ("", None, None),
    ];

    for (transaction_status, fraud_status, expected) in cases {
        assert_eq!(
            map_gateway_status(transaction_status, *fraud_status),
            *expected,
            "mapping failed for transaction_status={transaction_status:?} fraud_status={fraud_status:?}"
        );
    }
}

#[test]
fn test_mapping_normalizes_case_and_whitespace() {
    assert_eq!(
        map_gateway_status("SETTLEMENT", None),
        Some(TransactionStatus::Completed)
    );
    assert_eq!(
        map_gateway_status(" Capture ", Some(" ACCEPT ")),
        Some(TransactionStatus::Completed)
    );
    assert_eq!(
        map_gateway_status("Expire", None),
        Some(TransactionStatus::Rejected)
    );
}
