//! Ledger arithmetic tests
//!
//! Tests cover:
//! - Service cost for both collection methods
//! - Ceiling behavior on fractional and negative weights
//! - Points-first debit planning
//! - Item amount rounding

use sqlx::types::BigDecimal;
use std::str::FromStr;
use trashvalue_backend::services::waste_item_ledger::{item_amount, plan_debit, service_cost};

fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).expect("valid decimal literal")
}

#[test]
fn test_pickup_fee_scales_with_weight() {
    let fee = dec("10000");
    assert_eq!(service_cost(&dec("1"), "PICKUP", &fee), dec("10000"));
    assert_eq!(service_cost(&dec("5"), "PICKUP", &fee), dec("50000"));
    assert_eq!(service_cost(&dec("0.5"), "PICKUP", &fee), dec("5000"));
}

#[test]
fn test_dropoff_method_never_charges() {
    let fee = dec("10000");
    for weight in ["0.001", "1", "5", "250"] {
        assert_eq!(service_cost(&dec(weight), "DROPOFF", &fee), dec("0"));
    }
}

#[test]
fn test_fractional_cost_rounds_up_to_whole_currency() {
    let fee = dec("333");
    // 1.5 * 333 = 499.5
    assert_eq!(service_cost(&dec("1.5"), "PICKUP", &fee), dec("500"));
    // 0.01 * 333 = 3.33
    assert_eq!(service_cost(&dec("0.01"), "PICKUP", &fee), dec("4"));
}

#[test]
fn test_negative_weight_delta_refunds_less_than_charge() {
    let fee = dec("333");
    let charged = service_cost(&dec("1.5"), "PICKUP", &fee);
    let refunded = service_cost(&dec("-1.5"), "PICKUP", &fee);
    // ceil(499.5) = 500 charged, ceil(-499.5) = -499 refunded
    assert_eq!(charged, dec("500"));
    assert_eq!(refunded, dec("-499"));
    assert!(charged + refunded >= dec("0"));
}

#[test]
fn test_debit_plan_prefers_points() {
    let split = plan_debit(&dec("30000"), &dec("100000"), &dec("20000")).unwrap();
    assert_eq!(split.from_points, dec("20000"));
    assert_eq!(split.from_balance, dec("0"));
}

#[test]
fn test_debit_plan_spills_remainder_into_balance() {
    let split = plan_debit(&dec("5000"), &dec("100000"), &dec("20000")).unwrap();
    assert_eq!(split.from_points, dec("5000"));
    assert_eq!(split.from_balance, dec("15000"));
}

#[test]
fn test_debit_plan_rejects_underfunded_account() {
    assert!(plan_debit(&dec("5000"), &dec("1000"), &dec("20000")).is_none());
    assert!(plan_debit(&dec("0"), &dec("0"), &dec("1")).is_none());
}

#[test]
fn test_debit_plan_accepts_exact_funds() {
    let split = plan_debit(&dec("19999"), &dec("1"), &dec("20000")).unwrap();
    assert_eq!(split.from_points, dec("19999"));
    assert_eq!(split.from_balance, dec("1"));
}

#[test]
fn test_zero_cost_needs_no_funds() {
    let split = plan_debit(&dec("0"), &dec("0"), &dec("0")).unwrap();
    assert_eq!(split.from_points, dec("0"));
    assert_eq!(split.from_balance, dec("0"));
}

#[test]
fn test_item_amount_rounds_half_up_to_cents() {
    assert_eq!(item_amount(&dec("2.5"), &dec("3000")), dec("7500.00"));
    // 1.234 * 1500.55 = 1851.6787
    assert_eq!(item_amount(&dec("1.234"), &dec("1500.55")), dec("1851.68"));
    // 0.005 * 1000 = 5.00 exactly at the boundary
    assert_eq!(item_amount(&dec("0.005"), &dec("1000")), dec("5.00"));
}
