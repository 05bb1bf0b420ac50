use crate::database::error::DatabaseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Dropoff entity
///
/// `total_weight` and `total_amount` are running sums maintained by the
/// ledger engine as items are added, updated and removed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Dropoff {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub pickup_method: String,
    pub pickup_address: Option<String>,
    pub pickup_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub total_weight: BigDecimal,
    pub total_amount: BigDecimal,
    pub waste_bank_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for dropoff rows
pub struct DropoffRepository {
    pool: PgPool,
}

impl DropoffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        pickup_method: &str,
        pickup_address: Option<&str>,
        pickup_date: Option<DateTime<Utc>>,
        notes: Option<&str>,
        waste_bank_id: Option<Uuid>,
    ) -> Result<Dropoff, DatabaseError> {
        sqlx::query_as::<_, Dropoff>(
            "INSERT INTO dropoffs
             (user_id, status, pickup_method, pickup_address, pickup_date, notes, waste_bank_id)
             VALUES ($1, 'PENDING', $2, $3, $4, $5, $6)
             RETURNING id, user_id, status, pickup_method, pickup_address, pickup_date,
                       notes, total_weight, total_amount, waste_bank_id, created_at, updated_at",
        )
        .bind(user_id)
        .bind(pickup_method)
        .bind(pickup_address)
        .bind(pickup_date)
        .bind(notes)
        .bind(waste_bank_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Dropoff>, DatabaseError> {
        sqlx::query_as::<_, Dropoff>(
            "SELECT id, user_id, status, pickup_method, pickup_address, pickup_date,
                    notes, total_weight, total_amount, waste_bank_id, created_at, updated_at
             FROM dropoffs
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Page through dropoffs, optionally filtered by owner and status
    ///
    /// Returns the page plus the total row count for the filter.
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Dropoff>, i64), DatabaseError> {
        let rows = sqlx::query_as::<_, Dropoff>(
            "SELECT id, user_id, status, pickup_method, pickup_address, pickup_date,
                    notes, total_weight, total_amount, waste_bank_id, created_at, updated_at
             FROM dropoffs
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)
             FROM dropoffs
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok((rows, total))
    }

    /// Compare-and-swap the status
    ///
    /// Returns `None` when the row is missing or its status no longer
    /// matches `from`, meaning a concurrent writer got there first.
    pub async fn update_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<Option<Dropoff>, DatabaseError> {
        sqlx::query_as::<_, Dropoff>(
            "UPDATE dropoffs
             SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING id, user_id, status, pickup_method, pickup_address, pickup_date,
                       notes, total_weight, total_amount, waste_bank_id, created_at, updated_at",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Adjust the running totals while the dropoff is still PENDING
    ///
    /// The PENDING guard and the row lock this update takes serialize all
    /// concurrent item mutations against status changes. Returns `None`
    /// when the dropoff is missing or no longer PENDING.
    pub async fn increment_totals(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        weight_delta: BigDecimal,
        amount_delta: BigDecimal,
    ) -> Result<Option<Dropoff>, DatabaseError> {
        sqlx::query_as::<_, Dropoff>(
            "UPDATE dropoffs
             SET total_weight = total_weight + $2,
                 total_amount = total_amount + $3,
                 updated_at = NOW()
             WHERE id = $1 AND status = 'PENDING'
             RETURNING id, user_id, status, pickup_method, pickup_address, pickup_date,
                       notes, total_weight, total_amount, waste_bank_id, created_at, updated_at",
        )
        .bind(id)
        .bind(weight_delta)
        .bind(amount_delta)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Take the row lock on a PENDING dropoff without changing it
    ///
    /// Returns `None` when the dropoff is missing or not PENDING.
    pub async fn lock_pending(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Dropoff>, DatabaseError> {
        sqlx::query_as::<_, Dropoff>(
            "UPDATE dropoffs
             SET updated_at = NOW()
             WHERE id = $1 AND status = 'PENDING'
             RETURNING id, user_id, status, pickup_method, pickup_address, pickup_date,
                       notes, total_weight, total_amount, waste_bank_id, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Delete a dropoff, guarded to PENDING
    pub async fn delete_pending(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM dropoffs WHERE id = $1 AND status = 'PENDING'")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }
}
