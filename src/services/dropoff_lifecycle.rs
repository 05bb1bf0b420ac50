//! Dropoff Lifecycle Manager
//!
//! Owns dropoff creation, the status state machine, cancellation and
//! deletion. Completing a dropoff issues the reward credit and its ledger
//! record in the same database transaction as the status change.

use crate::database::account_repository::AccountRepository;
use crate::database::dropoff_repository::{Dropoff, DropoffRepository};
use crate::database::error::DatabaseError;
use crate::database::transaction_repository::TransactionRepository;
use crate::database::waste_item_repository::WasteItemRepository;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::services::notification::NotificationService;
use crate::services::waste_item_ledger::service_cost;
use bigdecimal::rounding::RoundingMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Dropoff status state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropoffStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
    Cancelled,
}

impl DropoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropoffStatus::Pending => "PENDING",
            DropoffStatus::Processing => "PROCESSING",
            DropoffStatus::Completed => "COMPLETED",
            DropoffStatus::Rejected => "REJECTED",
            DropoffStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PENDING" => Some(DropoffStatus::Pending),
            "PROCESSING" => Some(DropoffStatus::Processing),
            "COMPLETED" => Some(DropoffStatus::Completed),
            "REJECTED" => Some(DropoffStatus::Rejected),
            "CANCELLED" => Some(DropoffStatus::Cancelled),
            _ => None,
        }
    }

    /// All states reachable from this one
    pub fn valid_transitions(&self) -> Vec<DropoffStatus> {
        match self {
            DropoffStatus::Pending => vec![
                DropoffStatus::Processing,
                DropoffStatus::Completed,
                DropoffStatus::Rejected,
                DropoffStatus::Cancelled,
            ],
            DropoffStatus::Processing => vec![DropoffStatus::Completed, DropoffStatus::Rejected],
            // Terminal states admit nothing
            DropoffStatus::Completed => vec![],
            DropoffStatus::Rejected => vec![],
            DropoffStatus::Cancelled => vec![],
        }
    }

    pub fn can_transition(&self, target: DropoffStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DropoffStatus::Completed | DropoffStatus::Rejected | DropoffStatus::Cancelled
        )
    }
}

impl std::fmt::Display for DropoffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the waste reaches the collection point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PickupMethod {
    /// User brings the waste themselves, no service fee
    Dropoff,
    /// Courier collects from the user, fee per kilogram
    Pickup,
}

impl PickupMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickupMethod::Dropoff => "DROPOFF",
            PickupMethod::Pickup => "PICKUP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "DROPOFF" => Some(PickupMethod::Dropoff),
            "PICKUP" => Some(PickupMethod::Pickup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDropoffInput {
    pub pickup_method: Option<String>,
    pub pickup_address: Option<String>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub waste_bank_id: Option<Uuid>,
}

pub struct DropoffLifecycle {
    pool: PgPool,
    accounts: AccountRepository,
    dropoffs: DropoffRepository,
    waste_items: WasteItemRepository,
    transactions: TransactionRepository,
    notifications: NotificationService,
    fee_per_kg: BigDecimal,
}

impl DropoffLifecycle {
    pub fn new(pool: PgPool, fee_per_kg: BigDecimal) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            dropoffs: DropoffRepository::new(pool.clone()),
            waste_items: WasteItemRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            notifications: NotificationService::new(),
            pool,
            fee_per_kg,
        }
    }

    /// Create a dropoff in PENDING with zero totals
    pub async fn create(&self, user_id: Uuid, input: CreateDropoffInput) -> AppResult<Dropoff> {
        self.accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id.to_string()))?;

        let method = match input.pickup_method.as_deref() {
            Some(raw) => PickupMethod::parse(raw).ok_or_else(|| {
                AppError::invalid_input(
                    "pickup_method",
                    "Pickup method must be DROPOFF or PICKUP",
                )
            })?,
            None => PickupMethod::Dropoff,
        };

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        let dropoff = self
            .dropoffs
            .insert(
                &mut tx,
                user_id,
                method.as_str(),
                input.pickup_address.as_deref(),
                input.pickup_date,
                input.notes.as_deref(),
                input.waste_bank_id,
            )
            .await?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            dropoff_id = %dropoff.id,
            user_id = %user_id,
            pickup_method = %dropoff.pickup_method,
            "Dropoff created"
        );

        Ok(dropoff)
    }

    /// Admin status change with completion reward
    ///
    /// On a transition to COMPLETED the owner is credited
    /// `points += total_amount` and `balance += total_amount / 2`, and a
    /// COMPLETED DEPOSIT record is written, all inside the transaction
    /// that swaps the status.
    pub async fn update_status(&self, id: Uuid, new_status: &str) -> AppResult<Dropoff> {
        let target = DropoffStatus::parse(new_status).ok_or_else(|| {
            AppError::invalid_input("status", format!("Unknown dropoff status: {}", new_status))
        })?;

        let dropoff = self
            .dropoffs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Dropoff", id.to_string()))?;
        let current = parse_dropoff_status(&dropoff.status)?;

        if !current.can_transition(target) {
            return Err(AppError::invalid_transition(
                "dropoff",
                current.as_str(),
                target.as_str(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let updated = self
            .dropoffs
            .update_status(&mut tx, id, current.as_str(), target.as_str())
            .await?
            .ok_or_else(|| AppError::conflict("Dropoff status changed concurrently"))?;

        let mut reward = None;
        if target == DropoffStatus::Completed {
            let points = updated.total_amount.clone();
            let balance = (updated.total_amount.clone() / BigDecimal::from(2))
                .with_scale_round(2, RoundingMode::HalfUp);

            self.accounts
                .credit_reward(&mut tx, updated.user_id, points.clone(), balance.clone())
                .await?;
            self.transactions
                .insert(
                    &mut tx,
                    updated.user_id,
                    "DEPOSIT",
                    "COMPLETED",
                    updated.total_amount.clone(),
                    None,
                    Some(&format!("Completed dropoff #{}", updated.id)),
                )
                .await?;
            reward = Some((points, balance));
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            dropoff_id = %updated.id,
            from = %current,
            to = %target,
            "Dropoff status updated"
        );

        self.notifications
            .dropoff_status_changed(&updated, current.as_str())
            .await;
        if let Some((points, balance)) = reward {
            self.notifications
                .dropoff_reward_issued(&updated, &points, &balance)
                .await;
        }

        Ok(updated)
    }

    /// Owner-or-admin cancellation of a PENDING dropoff
    pub async fn cancel(&self, id: Uuid, auth: &AuthContext) -> AppResult<Dropoff> {
        let dropoff = self
            .dropoffs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Dropoff", id.to_string()))?;

        if !auth.can_access(dropoff.user_id) {
            return Err(AppError::unauthorized(
                "You are not authorized to cancel this dropoff",
            ));
        }

        let current = parse_dropoff_status(&dropoff.status)?;
        if current != DropoffStatus::Pending {
            return Err(AppError::invalid_transition(
                "dropoff",
                current.as_str(),
                DropoffStatus::Cancelled.as_str(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        let updated = self
            .dropoffs
            .update_status(
                &mut tx,
                id,
                DropoffStatus::Pending.as_str(),
                DropoffStatus::Cancelled.as_str(),
            )
            .await?
            .ok_or_else(|| AppError::conflict("Dropoff status changed concurrently"))?;
        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        self.notifications
            .dropoff_status_changed(&updated, current.as_str())
            .await;

        Ok(updated)
    }

    /// Admin deletion of a PENDING dropoff
    ///
    /// Service fees already charged for the items are refunded to the
    /// owner's balance before the rows go away. Everything happens under
    /// the dropoff row lock so a concurrent item add cannot slip between
    /// the refund and the delete.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        let locked = match self.dropoffs.lock_pending(&mut tx, id).await? {
            Some(dropoff) => dropoff,
            None => {
                drop(tx);
                return match self.dropoffs.find_by_id(id).await? {
                    Some(dropoff) => Err(AppError::invalid_state(
                        "dropoff",
                        dropoff.status,
                        "delete",
                    )),
                    None => Err(AppError::not_found("Dropoff", id.to_string())),
                };
            }
        };

        let items = self.waste_items.list_by_dropoff_on(&mut tx, id).await?;
        let refund_total = items.iter().fold(BigDecimal::from(0), |acc, item| {
            acc + service_cost(&item.weight, &locked.pickup_method, &self.fee_per_kg)
        });

        if refund_total > BigDecimal::from(0) {
            self.accounts
                .credit_balance(&mut tx, locked.user_id, refund_total.clone())
                .await?;
        }

        self.waste_items.delete_by_dropoff(&mut tx, id).await?;

        let deleted = self.dropoffs.delete_pending(&mut tx, id).await?;
        if !deleted {
            return Err(AppError::conflict("Dropoff status changed concurrently"));
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            dropoff_id = %id,
            user_id = %locked.user_id,
            items = items.len(),
            refund = %refund_total,
            "Dropoff deleted"
        );

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Dropoff> {
        self.dropoffs
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Dropoff", id.to_string()))
    }

    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Dropoff>, i64)> {
        let status_filter = match status {
            Some(raw) => Some(
                DropoffStatus::parse(raw)
                    .ok_or_else(|| {
                        AppError::invalid_input(
                            "status",
                            format!("Unknown dropoff status: {}", raw),
                        )
                    })?
                    .as_str(),
            ),
            None => None,
        };

        let (rows, total) = self
            .dropoffs
            .list(user_id, status_filter, limit, offset)
            .await?;
        Ok((rows, total))
    }
}

pub(crate) fn parse_dropoff_status(raw: &str) -> AppResult<DropoffStatus> {
    DropoffStatus::parse(raw).ok_or_else(|| {
        AppError::new(crate::error::AppErrorKind::Infrastructure(
            crate::error::InfrastructureError::Database {
                message: format!("corrupt dropoff status in storage: {}", raw),
                is_retryable: false,
            },
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_reaches_all_other_states() {
        let from = DropoffStatus::Pending;
        assert!(from.can_transition(DropoffStatus::Processing));
        assert!(from.can_transition(DropoffStatus::Completed));
        assert!(from.can_transition(DropoffStatus::Rejected));
        assert!(from.can_transition(DropoffStatus::Cancelled));
        assert!(!from.can_transition(DropoffStatus::Pending));
    }

    #[test]
    fn processing_cannot_be_cancelled() {
        let from = DropoffStatus::Processing;
        assert!(from.can_transition(DropoffStatus::Completed));
        assert!(from.can_transition(DropoffStatus::Rejected));
        assert!(!from.can_transition(DropoffStatus::Cancelled));
        assert!(!from.can_transition(DropoffStatus::Pending));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for terminal in [
            DropoffStatus::Completed,
            DropoffStatus::Rejected,
            DropoffStatus::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(terminal.valid_transitions().is_empty());
        }
        assert!(!DropoffStatus::Pending.is_terminal());
        assert!(!DropoffStatus::Processing.is_terminal());
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(DropoffStatus::parse("pending"), Some(DropoffStatus::Pending));
        assert_eq!(
            DropoffStatus::parse(" COMPLETED "),
            Some(DropoffStatus::Completed)
        );
        assert_eq!(DropoffStatus::parse("SHIPPED"), None);
    }

    #[test]
    fn pickup_method_parsing() {
        assert_eq!(PickupMethod::parse("pickup"), Some(PickupMethod::Pickup));
        assert_eq!(PickupMethod::parse("DROPOFF"), Some(PickupMethod::Dropoff));
        assert_eq!(PickupMethod::parse("DELIVERY"), None);
    }
}
