use crate::database::dropoff_repository::Dropoff;
use crate::database::transaction_repository::Transaction;
use sqlx::types::BigDecimal;
use tracing::{error, info};

/// Emits user-facing notifications for ledger events
///
/// Placeholder for real delivery (email, push). Events are logged with a
/// structured format so downstream collectors can fan them out.
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }

    pub async fn dropoff_status_changed(&self, dropoff: &Dropoff, previous: &str) {
        if dropoff.status == "REJECTED" {
            error!(
                dropoff_id = %dropoff.id,
                user_id = %dropoff.user_id,
                from = %previous,
                to = %dropoff.status,
                "🔔 NOTIFICATION: Dropoff rejected"
            );
        } else {
            info!(
                dropoff_id = %dropoff.id,
                user_id = %dropoff.user_id,
                from = %previous,
                to = %dropoff.status,
                "🔔 NOTIFICATION: Dropoff status changed"
            );
        }
    }

    pub async fn dropoff_reward_issued(
        &self,
        dropoff: &Dropoff,
        points: &BigDecimal,
        balance: &BigDecimal,
    ) {
        info!(
            dropoff_id = %dropoff.id,
            user_id = %dropoff.user_id,
            total_amount = %dropoff.total_amount,
            points_reward = %points,
            balance_reward = %balance,
            "🔔 NOTIFICATION: Dropoff completed, reward issued"
        );
    }

    pub async fn withdrawal_requested(&self, tx: &Transaction) {
        info!(
            transaction_id = %tx.id,
            user_id = %tx.user_id,
            amount = %tx.amount,
            payment_method = ?tx.payment_method,
            "🔔 NOTIFICATION: Withdrawal requested"
        );
    }

    pub async fn transaction_status_changed(&self, tx: &Transaction, previous: &str) {
        if tx.status == "REJECTED" {
            error!(
                transaction_id = %tx.id,
                user_id = %tx.user_id,
                from = %previous,
                to = %tx.status,
                "🔔 NOTIFICATION: Transaction rejected"
            );
        } else {
            info!(
                transaction_id = %tx.id,
                user_id = %tx.user_id,
                from = %previous,
                to = %tx.status,
                "🔔 NOTIFICATION: Transaction status changed"
            );
        }
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}
