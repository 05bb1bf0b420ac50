//! Transaction State Machine
//!
//! Owns withdrawal and topup creation, the transaction status state
//! machine and cancellation. Withdrawals debit the balance up front and
//! refund it when the transaction is rejected; topups are settled later
//! by the payment reconciler.

use crate::database::account_repository::AccountRepository;
use crate::database::error::DatabaseError;
use crate::database::transaction_repository::{Transaction, TransactionRepository};
use crate::error::{AppError, AppResult};
use crate::gateway::{ChargeRequest, CustomerDetails, GatewayError, PaymentGateway, PaymentMethod};
use crate::services::notification::NotificationService;
use bigdecimal::rounding::RoundingMode;
use bigdecimal::ToPrimitive;
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Transaction status state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Processing => "PROCESSING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PENDING" => Some(TransactionStatus::Pending),
            "PROCESSING" => Some(TransactionStatus::Processing),
            "COMPLETED" => Some(TransactionStatus::Completed),
            "REJECTED" => Some(TransactionStatus::Rejected),
            _ => None,
        }
    }

    /// All states reachable from this one
    pub fn valid_transitions(&self) -> Vec<TransactionStatus> {
        match self {
            TransactionStatus::Pending => vec![
                TransactionStatus::Processing,
                TransactionStatus::Completed,
                TransactionStatus::Rejected,
            ],
            TransactionStatus::Processing => {
                vec![TransactionStatus::Completed, TransactionStatus::Rejected]
            }
            // Terminal states admit nothing
            TransactionStatus::Completed => vec![],
            TransactionStatus::Rejected => vec![],
        }
    }

    pub fn can_transition(&self, target: TransactionStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Rejected
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of value flow relative to the user's balance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalInput {
    pub amount: BigDecimal,
    pub payment_method: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopupInput {
    pub amount: BigDecimal,
    pub payment_method: Option<String>,
    pub specific_method: Option<String>,
}

/// A created topup together with the gateway checkout handles
#[derive(Debug, Clone, Serialize)]
pub struct TopupOutcome {
    pub transaction: Transaction,
    pub token: String,
    pub redirect_url: String,
}

pub struct TransactionManager {
    pool: PgPool,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationService,
}

impl TransactionManager {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            pool,
            gateway,
            notifications: NotificationService::new(),
        }
    }

    /// Request a withdrawal: debit the balance and record the transaction
    /// atomically
    pub async fn create_withdrawal(
        &self,
        user_id: Uuid,
        input: WithdrawalInput,
    ) -> AppResult<Transaction> {
        if input.amount <= BigDecimal::from(0) {
            return Err(AppError::invalid_amount(
                input.amount.to_string(),
                "Amount must be greater than zero",
            ));
        }

        let method = PaymentMethod::from_str(&input.payment_method).map_err(|_| {
            AppError::invalid_input(
                "payment_method",
                "Payment method must be E_WALLET or BANK_TRANSFER",
            )
        })?;

        let user = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id.to_string()))?;

        if user.balance < input.amount {
            return Err(AppError::insufficient_funds(
                user.balance.to_string(),
                input.amount.to_string(),
            ));
        }

        let description = input.description.as_deref().unwrap_or("Balance withdrawal");

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        self.accounts
            .debit_balance(&mut tx, user_id, input.amount.clone())
            .await?
            .ok_or_else(|| {
                AppError::insufficient_funds(user.balance.to_string(), input.amount.to_string())
            })?;

        let record = self
            .transactions
            .insert(
                &mut tx,
                user_id,
                TransactionType::Withdrawal.as_str(),
                TransactionStatus::Pending.as_str(),
                input.amount.clone(),
                Some(method.as_str()),
                Some(description),
            )
            .await?;

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            transaction_id = %record.id,
            user_id = %user_id,
            amount = %record.amount,
            "Withdrawal requested"
        );
        self.notifications.withdrawal_requested(&record).await;

        Ok(record)
    }

    /// Start a topup: record the deposit, then create the gateway charge
    ///
    /// The record commits before the gateway call so a webhook for the
    /// charge always finds it. A failed charge marks the record REJECTED.
    pub async fn create_topup(&self, user_id: Uuid, input: TopupInput) -> AppResult<TopupOutcome> {
        if input.amount <= BigDecimal::from(0) {
            return Err(AppError::invalid_amount(
                input.amount.to_string(),
                "Amount must be greater than zero",
            ));
        }

        let method = match input.payment_method.as_deref() {
            Some(raw) => PaymentMethod::from_str(raw).map_err(|_| {
                AppError::invalid_input(
                    "payment_method",
                    "Payment method must be E_WALLET or BANK_TRANSFER",
                )
            })?,
            None => PaymentMethod::EWallet,
        };

        let gross_amount = input
            .amount
            .with_scale_round(0, RoundingMode::Down)
            .to_i64()
            .ok_or_else(|| {
                AppError::invalid_amount(
                    input.amount.to_string(),
                    "Amount exceeds the supported charge range",
                )
            })?;

        let user = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        let record = self
            .transactions
            .insert(
                &mut tx,
                user_id,
                TransactionType::Deposit.as_str(),
                TransactionStatus::Pending.as_str(),
                input.amount.clone(),
                Some(method.as_str()),
                Some("Wallet topup"),
            )
            .await?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        let charge = ChargeRequest {
            order_id: record.id.to_string(),
            gross_amount,
            customer: CustomerDetails {
                first_name: user.name,
                email: Some(user.email),
                phone: user.phone,
            },
            payment_method: method,
            specific_method: input.specific_method,
        };

        match self.gateway.create_charge(&charge).await {
            Ok(response) => {
                let updated = self
                    .transactions
                    .set_payment_reference(record.id, &response.token)
                    .await?;

                info!(
                    transaction_id = %updated.id,
                    user_id = %user_id,
                    gross_amount,
                    "Topup charge created"
                );

                Ok(TopupOutcome {
                    transaction: updated,
                    token: response.token,
                    redirect_url: response.redirect_url,
                })
            }
            Err(e) => {
                error!(
                    transaction_id = %record.id,
                    error = %e,
                    "Gateway charge failed, rejecting topup"
                );
                if let Err(db_err) = self.reject_failed_charge(record.id).await {
                    error!(
                        transaction_id = %record.id,
                        error = %db_err,
                        "Failed to reject topup after gateway error"
                    );
                }
                Err(AppError::from(e))
            }
        }
    }

    /// Move a transaction along the state machine
    ///
    /// Rejecting a withdrawal refunds the debited amount in the same
    /// database transaction as the status change.
    pub async fn update_status(&self, id: Uuid, new_status: &str) -> AppResult<Transaction> {
        let target = TransactionStatus::parse(new_status).ok_or_else(|| {
            AppError::invalid_input(
                "status",
                "Status must be one of PENDING, PROCESSING, COMPLETED, REJECTED",
            )
        })?;

        let record = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", id.to_string()))?;
        let current = parse_transaction_status(&record.status)?;

        if !current.can_transition(target) {
            return Err(AppError::invalid_transition(
                "transaction",
                current.as_str(),
                target.as_str(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let updated = self
            .transactions
            .update_status(&mut tx, id, current.as_str(), target.as_str())
            .await?
            .ok_or_else(|| AppError::conflict("Transaction status changed concurrently"))?;

        if record.transaction_type == TransactionType::Withdrawal.as_str()
            && target == TransactionStatus::Rejected
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
            "Transaction status updated"
        );
        self.notifications
            .transaction_status_changed(&updated, current.as_str())
            .await;

        Ok(updated)
    }

    /// Cancel a pending transaction
    ///
    /// A topup with an open gateway charge is cancelled upstream first; a
    /// charge that already reached a final state is left to the webhook.
    pub async fn cancel(&self, id: Uuid) -> AppResult<Transaction> {
        let record = self
            .transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", id.to_string()))?;
        let current = parse_transaction_status(&record.status)?;

        if current != TransactionStatus::Pending {
            return Err(AppError::invalid_state(
                "transaction",
                current.as_str(),
                "cancel",
            ));
        }

        if record.payment_reference.is_some() {
            match self.gateway.cancel(&record.id.to_string()).await {
                Ok(()) => {}
                Err(GatewayError::AlreadyFinal { order_id }) => {
                    info!(
                        transaction_id = %record.id,
                        order_id = %order_id,
                        "Gateway charge already final, cancelling locally"
                    );
                }
                Err(e) => return Err(AppError::from(e)),
            }
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let updated = self
            .transactions
            .update_status(
                &mut tx,
                id,
                TransactionStatus::Pending.as_str(),
                TransactionStatus::Rejected.as_str(),
            )
            .await?
            .ok_or_else(|| AppError::conflict("Transaction status changed concurrently"))?;

        if record.transaction_type == TransactionType::Withdrawal.as_str() {
            self.accounts
                .credit_balance(&mut tx, record.user_id, record.amount.clone())
                .await?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(transaction_id = %updated.id, "Transaction cancelled");
        self.notifications
            .transaction_status_changed(&updated, TransactionStatus::Pending.as_str())
            .await;

        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Transaction> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction", id.to_string()))
    }

    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<&str>,
        transaction_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Transaction>, i64)> {
        let status = match status {
            Some(raw) => Some(TransactionStatus::parse(raw).ok_or_else(|| {
                AppError::invalid_input(
                    "status",
                    "Status must be one of PENDING, PROCESSING, COMPLETED, REJECTED",
                )
            })?),
            None => None,
        };
        let transaction_type = match transaction_type {
            Some(raw) => Some(TransactionType::parse(raw).ok_or_else(|| {
                AppError::invalid_input("type", "Transaction type must be DEPOSIT or WITHDRAWAL")
            })?),
            None => None,
        };

        let (rows, total) = self
            .transactions
            .list(
                user_id,
                status.map(|s| s.as_str()),
                transaction_type.map(|t| t.as_str()),
                limit,
                offset,
            )
            .await?;
        Ok((rows, total))
    }

    async fn reject_failed_charge(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        // None means a webhook already moved the status; leave it alone
        self.transactions
            .update_status(
                &mut tx,
                id,
                TransactionStatus::Pending.as_str(),
                TransactionStatus::Rejected.as_str(),
            )
            .await?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}

pub(crate) fn parse_transaction_status(raw: &str) -> AppResult<TransactionStatus> {
    TransactionStatus::parse(raw).ok_or_else(|| {
        AppError::new(crate::error::AppErrorKind::Infrastructure(
            crate::error::InfrastructureError::Database {
                message: format!("corrupt transaction status in storage: {}", raw),
                is_retryable: false,
            },
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_reach_every_other_state() {
        let from = TransactionStatus::Pending;
        assert!(from.can_transition(TransactionStatus::Processing));
        assert!(from.can_transition(TransactionStatus::Completed));
        assert!(from.can_transition(TransactionStatus::Rejected));
        assert!(!from.can_transition(TransactionStatus::Pending));
    }

    #[test]
    fn processing_can_only_finish() {
        let from = TransactionStatus::Processing;
        assert!(from.can_transition(TransactionStatus::Completed));
        assert!(from.can_transition(TransactionStatus::Rejected));
        assert!(!from.can_transition(TransactionStatus::Pending));
        assert!(!from.can_transition(TransactionStatus::Processing));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [TransactionStatus::Completed, TransactionStatus::Rejected] {
            assert!(terminal.is_terminal());
            assert!(terminal.valid_transitions().is_empty());
        }
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(
            TransactionStatus::parse(" completed "),
            Some(TransactionStatus::Completed)
        );
        assert_eq!(
            TransactionStatus::parse("Pending"),
            Some(TransactionStatus::Pending)
        );
        assert_eq!(TransactionStatus::parse("CANCELLED"), None);
    }

    #[test]
    fn type_parse_round_trips() {
        for kind in [TransactionType::Deposit, TransactionType::Withdrawal] {
            assert_eq!(TransactionType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionType::parse("deposit"), Some(TransactionType::Deposit));
        assert_eq!(TransactionType::parse("TRANSFER"), None);
    }

    #[test]
    fn display_matches_wire_format() {
        assert_eq!(TransactionStatus::Rejected.to_string(), "REJECTED");
        assert_eq!(TransactionType::Withdrawal.to_string(), "WITHDRAWAL");
    }
}
