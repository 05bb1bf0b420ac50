//! Payment Gateway Reconciler
//!
//! Translates gateway settlement reports into local transaction state,
//! from webhooks and from on-demand status polls. Application is
//! idempotent: replayed reports and reports for terminal transactions
//! change nothing.

use crate::database::account_repository::AccountRepository;
use crate::database::error::DatabaseError;
use crate::database::transaction_repository::{Transaction, TransactionRepository};
use crate::error::{AppError, AppResult};
use crate::gateway::{GatewayNotification, GatewayStatus, PaymentGateway};
use crate::services::notification::NotificationService;
use crate::services::transaction_manager::{
    parse_transaction_status, TransactionStatus, TransactionType,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Map a gateway settlement report onto the local state machine
///
/// Returns `None` for reports that carry no local state change, such as
/// a capture still under fraud review.
pub fn map_gateway_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Option<TransactionStatus> {
    let transaction_status = transaction_status.trim().to_lowercase();
    let fraud_status = fraud_status.map(|f| f.trim().to_lowercase());

    match transaction_status.as_str() {
        "capture" => match fraud_status.as_deref() {
            Some("challenge") => Some(TransactionStatus::Processing),
            Some("accept") => Some(TransactionStatus::Completed),
            _ => None,
        },
        "settlement" => Some(TransactionStatus::Completed),
        "cancel" | "deny" | "expire" => Some(TransactionStatus::Rejected),
        "pending" => Some(TransactionStatus::Processing),
        _ => None,
    }
}

/// A polled transaction together with the raw gateway report
#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusOutcome {
    pub transaction: Transaction,
    pub payment_status: GatewayStatus,
}

pub struct PaymentReconciler {
    pool: PgPool,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    gateway: Arc<dyn PaymentGateway>,
    server_key: String,
    notifications: NotificationService,
}

impl PaymentReconciler {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, server_key: String) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            pool,
            gateway,
            server_key,
            notifications: NotificationService::new(),
        }
    }

    /// Verify a webhook's signature against the shared server key
    pub fn authenticate(&self, notification: &GatewayNotification) -> bool {
        crate::gateway::verify_notification_signature(notification, &self.server_key)
    }

    /// Apply a gateway settlement report to the referenced transaction
    ///
    /// A completed deposit credits the user's balance in the same
    /// database transaction as the status change, so a replayed report
    /// can never credit twice.
    pub async fn apply(
        &self,
        order_id: &str,
        transaction_status: &str,
        fraud_status: Option<&str>,
    ) -> AppResult<Transaction> {
        let id = Uuid::parse_str(order_id).map_err(|_| {
            AppError::invalid_input("order_id", "Order id must be a transaction UUID")
        })?;

        let record = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", id.to_string()))?;

        let target = match map_gateway_status(transaction_status, fraud_status) {
            Some(target) => target,
            None => {
                debug!(
                    transaction_id = %record.id,
                    gateway_status = transaction_status,
                    "Gateway status has no local mapping, leaving transaction unchanged"
                );
                return Ok(record);
            }
        };

        let current = parse_transaction_status(&record.status)?;
        if current == target {
            debug!(
                transaction_id = %record.id,
                status = current.as_str(),
                "Gateway report already applied"
            );
            return Ok(record);
        }
        if current.is_terminal() {
            info!(
                transaction_id = %record.id,
                status = current.as_str(),
                gateway_status = transaction_status,
                "Ignoring gateway report for terminal transaction"
            );
            return Ok(record);
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let updated = match self
            .transactions
            .update_status(&mut tx, record.id, current.as_str(), target.as_str())
            .await?
        {
            Some(updated) => updated,
            None => {
                // Lost the race to a concurrent reconciler; the winner's
                // state stands
                drop(tx);
                info!(
                    transaction_id = %record.id,
                    "Concurrent update applied first, re-reading"
                );
                return self
                    .transactions
                    .find_by_id(record.id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Transaction", record.id.to_string()));
            }
        };

        if record.transaction_type == TransactionType::Deposit.as_str()
            && target == TransactionStatus::Completed
        {
            self.accounts
                .credit_balance(&mut tx, record.user_id, record.amount.clone())
                .await?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            transaction_id = %updated.id,
            from = current.as_str(),
            to = target.as_str(),
            gateway_status = transaction_status,
            "Gateway report reconciled"
        );
        self.notifications
            .transaction_status_changed(&updated, current.as_str())
            .await;

        Ok(updated)
    }

    /// Poll the gateway for a transaction's charge and reconcile the
    /// answer
    pub async fn poll(&self, transaction_id: Uuid) -> AppResult<PaymentStatusOutcome> {
        let record = self
            .transactions
            .find_by_id(transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", transaction_id.to_string()))?;

        let status = self.gateway.fetch_status(&record.id.to_string()).await?;

        let transaction = self
            .apply(
                &record.id.to_string(),
                status.transaction_status.as_deref().unwrap_or(""),
                status.fraud_status.as_deref(),
            )
            .await?;

        Ok(PaymentStatusOutcome {
            transaction,
            payment_status: status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_follows_fraud_review() {
        assert_eq!(
            map_gateway_status("capture", Some("challenge")),
            Some(TransactionStatus::Processing)
        );
        assert_eq!(
            map_gateway_status("capture", Some("accept")),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(map_gateway_status("capture", Some("deny")), None);
        assert_eq!(map_gateway_status("capture", None), None);
    }

    #[test]
    fn settlement_completes() {
        assert_eq!(
            map_gateway_status("settlement", None),
            Some(TransactionStatus::Completed)
        );
    }

    #[test]
    fn failures_reject() {
        for status in ["cancel", "deny", "expire"] {
            assert_eq!(
                map_gateway_status(status, None),
                Some(TransactionStatus::Rejected),
                "{status} should reject"
            );
        }
    }

    #[test]
    fn pending_keeps_processing() {
        assert_eq!(
            map_gateway_status("pending", None),
            Some(TransactionStatus::Processing)
        );
    }

    #[test]
    fn unknown_statuses_are_ignored() {
        assert_eq!(map_gateway_status("refund", None), None);
        assert_eq!(map_gateway_status("", None), None);
    }

    #[test]
    fn mapping_is_case_insensitive() {
        assert_eq!(
            map_gateway_status(" SETTLEMENT ", None),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(
            map_gateway_status("Capture", Some("ACCEPT")),
            Some(TransactionStatus::Completed)
        );
    }
}
