//! State machine tests for dropoff and transaction statuses
//!
//! Tests cover:
//! - Every legal transition in both machines
//! - Terminal state behavior
//! - Parsing and wire formats

use trashvalue_backend::services::dropoff_lifecycle::DropoffStatus;
use trashvalue_backend::services::transaction_manager::{TransactionStatus, TransactionType};

#[test]
fn test_dropoff_transition_table() {
    let all = [
        DropoffStatus::Pending,
        DropoffStatus::Processing,
        DropoffStatus::Completed,
        DropoffStatus::Rejected,
        DropoffStatus::Cancelled,
    ];

    let allowed: &[(DropoffStatus, DropoffStatus)] = &[
        (DropoffStatus::Pending, DropoffStatus::Processing),
        (DropoffStatus::Pending, DropoffStatus::Completed),
        (DropoffStatus::Pending, DropoffStatus::Rejected),
        (DropoffStatus::Pending, DropoffStatus::Cancelled),
        (DropoffStatus::Processing, DropoffStatus::Completed),
        (DropoffStatus::Processing, DropoffStatus::Rejected),
    ];

    for from in all {
        for to in all {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition(to),
                expected,
                "{} -> {} should be {}",
                from,
                to,
                if expected { "allowed" } else { "refused" }
            );
        }
    }
}

#[test]
fn test_dropoff_terminal_states() {
    assert!(!DropoffStatus::Pending.is_terminal());
    assert!(!DropoffStatus::Processing.is_terminal());
    assert!(DropoffStatus::Completed.is_terminal());
    assert!(DropoffStatus::Rejected.is_terminal());
    assert!(DropoffStatus::Cancelled.is_terminal());
}

#[test]
fn test_dropoff_status_round_trips_through_storage_format() {
    let all = [
        DropoffStatus::Pending,
        DropoffStatus::Processing,
        DropoffStatus::Completed,
        DropoffStatus::Rejected,
        DropoffStatus::Cancelled,
    ];
    for status in all {
        assert_eq!(DropoffStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(DropoffStatus::parse("  pending "), Some(DropoffStatus::Pending));
    assert_eq!(DropoffStatus::parse("DONE"), None);
}

#[test]
fn test_transaction_transition_table() {
    let all = [
        TransactionStatus::Pending,
        TransactionStatus::Processing,
        TransactionStatus::Completed,
        TransactionStatus::Rejected,
    ];

    let allowed: &[(TransactionStatus, TransactionStatus)] = &[
        (TransactionStatus::Pending, TransactionStatus::Processing),
        (TransactionStatus::Pending, TransactionStatus::Completed),
        (TransactionStatus::Pending, TransactionStatus::Rejected),
        (TransactionStatus::Processing, TransactionStatus::Completed),
        (TransactionStatus::Processing, TransactionStatus::Rejected),
    ];

    for from in all {
        for to in all {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition(to),
                expected,
                "{} -> {} should be {}",
                from,
                to,
                if expected { "allowed" } else { "refused" }
            );
        }
    }
}

#[test]
fn test_transaction_cannot_leave_terminal_states() {
    for terminal in [TransactionStatus::Completed, TransactionStatus::Rejected] {
        assert!(terminal.is_terminal());
        for target in [
            TransactionStatus::Pending,
            TransactionStatus::Processing,
            TransactionStatus::Completed,
            TransactionStatus::Rejected,
        ] {
            assert!(!terminal.can_transition(target));
        }
    }
}

#[test]
fn test_transaction_type_wire_format() {
    assert_eq!(TransactionType::Deposit.as_str(), "DEPOSIT");
    assert_eq!(TransactionType::Withdrawal.as_str(), "WITHDRAWAL");
    assert_eq!(
        TransactionType::parse("withdrawal"),
        Some(TransactionType::Withdrawal)
    );
    assert_eq!(TransactionType::parse("REFUND"), None);
}

#[test]
fn test_statuses_serialize_as_screaming_snake_case() {
    let json = serde_json::to_string(&DropoffStatus::Cancelled).unwrap();
    assert_eq!(json, "\"CANCELLED\"");
    let json = serde_json::to_string(&TransactionStatus::Processing).unwrap();
    assert_eq!(json, "\"PROCESSING\"");

    let status: DropoffStatus = serde_json::from_str("\"REJECTED\"").unwrap();
    assert_eq!(status, DropoffStatus::Rejected);
}
