//! Waste Item Ledger Engine
//!
//! Owns waste items and every ledger effect of adding, editing and
//! removing them. Each operation is one database transaction; the guarded
//! totals update on the dropoff row goes first so concurrent item
//! operations on the same dropoff serialize behind its row lock.

use crate::database::account_repository::AccountRepository;
use crate::database::dropoff_repository::{Dropoff, DropoffRepository};
use crate::database::error::DatabaseError;
use crate::database::waste_item_repository::{WasteItem, WasteItemRepository};
use crate::database::waste_type_repository::{WasteType, WasteTypeRepository};
use crate::error::{AppError, AppResult};
use crate::services::dropoff_lifecycle::{parse_dropoff_status, DropoffStatus, PickupMethod};
use bigdecimal::rounding::RoundingMode;
use serde::Deserialize;
use sqlx::types::BigDecimal;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Fee charged for collecting `weight` kilograms
///
/// Only the PICKUP method costs anything; the fee is the mathematical
/// ceiling of `weight × fee_per_kg`, so a negative weight delta rounds
/// toward zero magnitude.
pub fn service_cost(weight: &BigDecimal, pickup_method: &str, fee_per_kg: &BigDecimal) -> BigDecimal {
    if pickup_method != PickupMethod::Pickup.as_str() {
        return BigDecimal::from(0);
    }
    (weight * fee_per_kg).with_scale_round(0, RoundingMode::Ceiling)
}

/// How a cost splits across the two currencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebitSplit {
    pub from_points: BigDecimal,
    pub from_balance: BigDecimal,
}

/// Plan a points-first debit against the given funds
///
/// Points absorb as much of the cost as they can; balance pays the rest.
/// Returns `None` when the combined funds cannot cover the cost.
pub fn plan_debit(
    points: &BigDecimal,
    balance: &BigDecimal,
    cost: &BigDecimal,
) -> Option<DebitSplit> {
    if points + balance < *cost {
        return None;
    }
    let from_points = cost.min(points).clone();
    let from_balance = cost - &from_points;
    Some(DebitSplit {
        from_points,
        from_balance,
    })
}

/// Line amount for a weighed item, rounded to currency precision
pub fn item_amount(weight: &BigDecimal, price_per_kg: &BigDecimal) -> BigDecimal {
    (weight * price_per_kg).with_scale_round(2, RoundingMode::HalfUp)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddItemInput {
    pub waste_type_id: Uuid,
    pub weight: BigDecimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemInput {
    pub waste_type_id: Option<Uuid>,
    pub weight: Option<BigDecimal>,
    pub notes: Option<String>,
}

pub struct WasteItemLedger {
    pool: PgPool,
    accounts: AccountRepository,
    dropoffs: DropoffRepository,
    waste_items: WasteItemRepository,
    waste_types: WasteTypeRepository,
    fee_per_kg: BigDecimal,
}

impl WasteItemLedger {
    pub fn new(pool: PgPool, fee_per_kg: BigDecimal) -> Self {
        Self {
            accounts: AccountRepository::new(pool.clone()),
            dropoffs: DropoffRepository::new(pool.clone()),
            waste_items: WasteItemRepository::new(pool.clone()),
            waste_types: WasteTypeRepository::new(pool.clone()),
            pool,
            fee_per_kg,
        }
    }

    /// Add an item: totals, item row and points-first fee debit in one
    /// transaction
    pub async fn add_item(&self, dropoff_id: Uuid, input: AddItemInput) -> AppResult<WasteItem> {
        let dropoff = self.pending_dropoff(dropoff_id, "add waste items").await?;

        if input.weight <= BigDecimal::from(0) {
            return Err(AppError::invalid_input(
                "weight",
                "Weight must be greater than zero",
            ));
        }

        let waste_type = self.active_waste_type(input.waste_type_id).await?;
        let amount = item_amount(&input.weight, &waste_type.price_per_kg);
        let cost = service_cost(&input.weight, &dropoff.pickup_method, &self.fee_per_kg);

        let available = self.check_funds(dropoff.user_id, &cost).await?;

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        self.dropoffs
            .increment_totals(&mut tx, dropoff.id, input.weight.clone(), amount.clone())
            .await?
            .ok_or_else(|| AppError::conflict("Dropoff is no longer accepting item changes"))?;

        let item = self
            .waste_items
            .insert(
                &mut tx,
                dropoff.id,
                waste_type.id,
                input.weight.clone(),
                amount.clone(),
                input.notes.as_deref(),
            )
            .await?;

        if cost > BigDecimal::from(0) {
            self.accounts
                .debit_points_first(&mut tx, dropoff.user_id, cost.clone())
                .await?
                .ok_or_else(|| {
                    AppError::insufficient_funds(available.to_string(), cost.to_string())
                })?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            item_id = %item.id,
            dropoff_id = %dropoff.id,
            weight = %item.weight,
            amount = %item.amount,
            service_cost = %cost,
            "Waste item added"
        );

        Ok(item)
    }

    /// Re-weigh or re-classify an item
    ///
    /// A higher service cost is charged points-first; a lower one is
    /// refunded to balance only.
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<WasteItem> {
        let item = self
            .waste_items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Waste item", item_id.to_string()))?;
        let dropoff = self
            .pending_dropoff(item.dropoff_id, "update waste items")
            .await?;

        let new_weight = match &input.weight {
            Some(weight) => {
                if *weight <= BigDecimal::from(0) {
                    return Err(AppError::invalid_input(
                        "weight",
                        "Weight must be greater than zero",
                    ));
                }
                weight.clone()
            }
            None => item.weight.clone(),
        };

        let new_type_id = input.waste_type_id.unwrap_or(item.waste_type_id);
        let waste_type = if input.waste_type_id.is_some() {
            self.active_waste_type(new_type_id).await?
        } else {
            self.waste_types
                .find_by_id(new_type_id)
                .await?
                .ok_or_else(|| AppError::not_found("Waste type", new_type_id.to_string()))?
        };

        let new_amount = item_amount(&new_weight, &waste_type.price_per_kg);
        let weight_delta = &new_weight - &item.weight;
        let amount_delta = &new_amount - &item.amount;
        let cost_delta = service_cost(&weight_delta, &dropoff.pickup_method, &self.fee_per_kg);

        let available = if cost_delta > BigDecimal::from(0) {
            Some(self.check_funds(dropoff.user_id, &cost_delta).await?)
        } else {
            None
        };

        let notes = input.notes.as_deref().or(item.notes.as_deref());

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        self.dropoffs
            .increment_totals(&mut tx, dropoff.id, weight_delta, amount_delta)
            .await?
            .ok_or_else(|| AppError::conflict("Dropoff is no longer accepting item changes"))?;

        let updated = self
            .waste_items
            .update(&mut tx, item.id, waste_type.id, new_weight, new_amount, notes)
            .await?;

        if cost_delta > BigDecimal::from(0) {
            self.accounts
                .debit_points_first(&mut tx, dropoff.user_id, cost_delta.clone())
                .await?
                .ok_or_else(|| {
                    let shown = available.unwrap_or_else(|| BigDecimal::from(0));
                    AppError::insufficient_funds(shown.to_string(), cost_delta.to_string())
                })?;
        } else if cost_delta < BigDecimal::from(0) {
            self.accounts
                .credit_balance(&mut tx, dropoff.user_id, -cost_delta.clone())
                .await?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            item_id = %updated.id,
            dropoff_id = %dropoff.id,
            weight = %updated.weight,
            amount = %updated.amount,
            cost_delta = %cost_delta,
            "Waste item updated"
        );

        Ok(updated)
    }

    /// Remove an item and refund its service cost to balance
    pub async fn remove_item(&self, item_id: Uuid) -> AppResult<()> {
        let item = self
            .waste_items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Waste item", item_id.to_string()))?;
        let dropoff = self
            .pending_dropoff(item.dropoff_id, "remove waste items")
            .await?;

        let refund = service_cost(&item.weight, &dropoff.pickup_method, &self.fee_per_kg);

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;

        self.dropoffs
            .increment_totals(
                &mut tx,
                dropoff.id,
                -item.weight.clone(),
                -item.amount.clone(),
            )
            .await?
            .ok_or_else(|| AppError::conflict("Dropoff is no longer accepting item changes"))?;

        let deleted = self.waste_items.delete(&mut tx, item.id).await?;
        if !deleted {
            return Err(AppError::conflict("Waste item was removed concurrently"));
        }

        if refund > BigDecimal::from(0) {
            self.accounts
                .credit_balance(&mut tx, dropoff.user_id, refund.clone())
                .await?;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        info!(
            item_id = %item.id,
            dropoff_id = %dropoff.id,
            refund = %refund,
            "Waste item removed"
        );

        Ok(())
    }

    pub async fn get_item(&self, item_id: Uuid) -> AppResult<WasteItem> {
        self.waste_items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Waste item", item_id.to_string()))
    }

    pub async fn list_items(&self, dropoff_id: Uuid) -> AppResult<Vec<WasteItem>> {
        self.dropoffs
            .find_by_id(dropoff_id)
            .await?
            .ok_or_else(|| AppError::not_found("Dropoff", dropoff_id.to_string()))?;
        Ok(self.waste_items.list_by_dropoff(dropoff_id).await?)
    }

    /// Active waste types offered for new items
    pub async fn list_waste_types(&self) -> AppResult<Vec<WasteType>> {
        Ok(self.waste_types.list_active().await?)
    }

    async fn pending_dropoff(&self, dropoff_id: Uuid, operation: &str) -> AppResult<Dropoff> {
        let dropoff = self
            .dropoffs
            .find_by_id(dropoff_id)
            .await?
            .ok_or_else(|| AppError::not_found("Dropoff", dropoff_id.to_string()))?;

        let status = parse_dropoff_status(&dropoff.status)?;
        if status != DropoffStatus::Pending {
            return Err(AppError::invalid_state(
                "dropoff",
                status.as_str(),
                operation,
            ));
        }

        Ok(dropoff)
    }

    async fn active_waste_type(&self, waste_type_id: Uuid) -> AppResult<WasteType> {
        let waste_type = self
            .waste_types
            .find_by_id(waste_type_id)
            .await?
            .ok_or_else(|| AppError::not_found("Waste type", waste_type_id.to_string()))?;

        if !waste_type.is_active {
            return Err(AppError::invalid_input(
                "waste_type_id",
                format!("Waste type '{}' is not active", waste_type.name),
            ));
        }

        Ok(waste_type)
    }

    /// Pre-check the owner's combined funds against a cost
    ///
    /// The guarded debit re-enforces this atomically; the pre-check only
    /// exists to fail fast with the friendly error before any writes.
    async fn check_funds(&self, user_id: Uuid, cost: &BigDecimal) -> AppResult<BigDecimal> {
        let user = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id.to_string()))?;

        let available = &user.points + &user.balance;
        if plan_debit(&user.points, &user.balance, cost).is_none() {
            return Err(AppError::insufficient_funds(
                available.to_string(),
                cost.to_string(),
            ));
        }

        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn pickup_cost_is_ceiled_per_kg() {
        let fee = dec("10000");
        assert_eq!(service_cost(&dec("5"), "PICKUP", &fee), dec("50000"));
        assert_eq!(service_cost(&dec("2.3"), "PICKUP", &fee), dec("23000"));
        assert_eq!(service_cost(&dec("0.001"), "PICKUP", &fee), dec("10"));
    }

    #[test]
    fn fractional_fee_rounds_up() {
        let fee = dec("333");
        // 1.5 * 333 = 499.5 -> 500
        assert_eq!(service_cost(&dec("1.5"), "PICKUP", &fee), dec("500"));
    }

    #[test]
    fn dropoff_method_is_free() {
        let fee = dec("10000");
        assert_eq!(service_cost(&dec("100"), "DROPOFF", &fee), dec("0"));
    }

    #[test]
    fn negative_delta_rounds_toward_zero() {
        let fee = dec("333");
        // -1.5 * 333 = -499.5 -> ceil -> -499
        assert_eq!(service_cost(&dec("-1.5"), "PICKUP", &fee), dec("-499"));
    }

    #[test]
    fn debit_prefers_points() {
        let split = plan_debit(&dec("30000"), &dec("100000"), &dec("20000")).unwrap();
        assert_eq!(split.from_points, dec("20000"));
        assert_eq!(split.from_balance, dec("0"));
    }

    #[test]
    fn debit_spills_into_balance() {
        let split = plan_debit(&dec("5000"), &dec("100000"), &dec("20000")).unwrap();
        assert_eq!(split.from_points, dec("5000"));
        assert_eq!(split.from_balance, dec("15000"));
    }

    #[test]
    fn debit_fails_when_underfunded() {
        assert!(plan_debit(&dec("5000"), &dec("1000"), &dec("20000")).is_none());
    }

    #[test]
    fn debit_with_exact_funds_succeeds() {
        let split = plan_debit(&dec("5000"), &dec("15000"), &dec("20000")).unwrap();
        assert_eq!(split.from_points, dec("5000"));
        assert_eq!(split.from_balance, dec("15000"));
    }

    #[test]
    fn item_amount_uses_currency_precision() {
        assert_eq!(item_amount(&dec("2.5"), &dec("3000")), dec("7500.00"));
        assert_eq!(item_amount(&dec("0.333"), &dec("1000")), dec("333.00"));
        // 1.234 * 1500.55 = 1851.6787 -> 1851.68
        assert_eq!(item_amount(&dec("1.234"), &dec("1500.55")), dec("1851.68"));
    }
}
