use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// User account entity carrying the dual-currency ledger
///
/// `balance` is withdrawable money, `points` is the reward currency.
/// Both are guarded non-negative by database check constraints.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub balance: BigDecimal,
    pub points: BigDecimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for user accounts and their ledger fields
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, email, phone, role, balance, points, created_at, updated_at
             FROM users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Credit the withdrawable balance
    pub async fn credit_balance(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        amount: BigDecimal,
    ) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET balance = balance + $2, updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, email, phone, role, balance, points, created_at, updated_at",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Credit both reward currencies in one statement
    pub async fn credit_reward(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        points: BigDecimal,
        balance: BigDecimal,
    ) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET points = points + $2, balance = balance + $3, updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, email, phone, role, balance, points, created_at, updated_at",
        )
        .bind(user_id)
        .bind(points)
        .bind(balance)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Debit the withdrawable balance, guarded against overdraft
    ///
    /// Returns `None` when the balance cannot cover the amount. The guard
    /// and the debit run in one statement so concurrent debits cannot
    /// overdraw the account.
    pub async fn debit_balance(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET balance = balance - $2, updated_at = NOW()
             WHERE id = $1 AND balance >= $2
             RETURNING id, name, email, phone, role, balance, points, created_at, updated_at",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Debit a cost from points first, then balance for the remainder
    ///
    /// Postgres evaluates SET expressions against the old row values, so
    /// both assignments read the pre-update `points`. Returns `None` when
    /// points + balance cannot cover the cost.
    pub async fn debit_points_first(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        cost: BigDecimal,
    ) -> Result<Option<User>, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET points = GREATEST(points - $2, 0),
                 balance = balance - GREATEST($2 - points, 0),
                 updated_at = NOW()
             WHERE id = $1 AND points + balance >= $2
             RETURNING id, name, email, phone, role, balance, points, created_at, updated_at",
        )
        .bind(user_id)
        .bind(cost)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
