use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Payment transaction entity
///
/// `transaction_type` is WITHDRAWAL or DEPOSIT; `payment_reference` holds
/// the gateway token once a deposit charge has been created.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub status: String,
    pub amount: BigDecimal,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Repository for managing transactions
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        transaction_type: &str,
        status: &str,
        amount: BigDecimal,
        payment_method: Option<&str>,
        description: Option<&str>,
    ) -> Result<Transaction, DatabaseError> {
        sqlx::query_as::<_, Transaction>(
            "INSERT INTO transactions
             (user_id, transaction_type, status, amount, payment_method, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, user_id, transaction_type, status, amount, payment_method,
                       payment_reference, description, created_at, updated_at",
        )
        .bind(user_id)
        .bind(transaction_type)
        .bind(status)
        .bind(amount)
        .bind(payment_method)
        .bind(description)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Transaction>, DatabaseError> {
        sqlx::query_as::<_, Transaction>(
            "SELECT id, user_id, transaction_type, status, amount, payment_method,
                    payment_reference, description, created_at, updated_at
             FROM transactions
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Page through transactions, optionally filtered by owner, status
    /// and transaction type
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        status: Option<&str>,
        transaction_type: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64), DatabaseError> {
        let rows = sqlx::query_as::<_, Transaction>(
            "SELECT id, user_id, transaction_type, status, amount, payment_method,
                    payment_reference, description, created_at, updated_at
             FROM transactions
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::text IS NULL OR transaction_type = $3)
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(user_id)
        .bind(status)
        .bind(transaction_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)
             FROM transactions
             WHERE ($1::uuid IS NULL OR user_id = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::text IS NULL OR transaction_type = $3)",
        )
        .bind(user_id)
        .bind(status)
        .bind(transaction_type)
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
    ) -> Result<Option<Transaction>, DatabaseError> {
        sqlx::query_as::<_, Transaction>(
            "UPDATE transactions
             SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING id, user_id, transaction_type, status, amount, payment_method,
                       payment_reference, description, created_at, updated_at",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Attach the gateway payment reference after a charge is created
    pub async fn set_payment_reference(
        &self,
        id: Uuid,
        payment_reference: &str,
    ) -> Result<Transaction, DatabaseError> {
        sqlx::query_as::<_, Transaction>(
            "UPDATE transactions
             SET payment_reference = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING id, user_id, transaction_type, status, amount, payment_method,
                       payment_reference, description, created_at, updated_at",
        )
        .bind(id)
        .bind(payment_reference)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
