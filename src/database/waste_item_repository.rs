use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgConnection, PgPool};
use uuid::Uuid;

/// Waste item line entry within a dropoff
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WasteItem {
    pub id: Uuid,
    pub dropoff_id: Uuid,
    pub waste_type_id: Uuid,
    pub weight: BigDecimal,
    pub amount: BigDecimal,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct WasteItemRepository {
    pool: PgPool,
}

impl WasteItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        dropoff_id: Uuid,
        waste_type_id: Uuid,
        weight: BigDecimal,
        amount: BigDecimal,
        notes: Option<&str>,
    ) -> Result<WasteItem, DatabaseError> {
        sqlx::query_as::<_, WasteItem>(
            "INSERT INTO waste_items (dropoff_id, waste_type_id, weight, amount, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, dropoff_id, waste_type_id, weight, amount, notes,
                       created_at, updated_at",
        )
        .bind(dropoff_id)
        .bind(waste_type_id)
        .bind(weight)
        .bind(amount)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<WasteItem>, DatabaseError> {
        sqlx::query_as::<_, WasteItem>(
            "SELECT id, dropoff_id, waste_type_id, weight, amount, notes, created_at, updated_at
             FROM waste_items
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn list_by_dropoff(&self, dropoff_id: Uuid) -> Result<Vec<WasteItem>, DatabaseError> {
        sqlx::query_as::<_, WasteItem>(
            "SELECT id, dropoff_id, waste_type_id, weight, amount, notes, created_at, updated_at
             FROM waste_items
             WHERE dropoff_id = $1
             ORDER BY created_at ASC",
        )
        .bind(dropoff_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Same listing on an open transaction, for flows that must read items
    /// under the dropoff row lock
    pub async fn list_by_dropoff_on(
        &self,
        conn: &mut PgConnection,
        dropoff_id: Uuid,
    ) -> Result<Vec<WasteItem>, DatabaseError> {
        sqlx::query_as::<_, WasteItem>(
            "SELECT id, dropoff_id, waste_type_id, weight, amount, notes, created_at, updated_at
             FROM waste_items
             WHERE dropoff_id = $1
             ORDER BY created_at ASC",
        )
        .bind(dropoff_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        waste_type_id: Uuid,
        weight: BigDecimal,
        amount: BigDecimal,
        notes: Option<&str>,
    ) -> Result<WasteItem, DatabaseError> {
        sqlx::query_as::<_, WasteItem>(
            "UPDATE waste_items
             SET waste_type_id = $2, weight = $3, amount = $4, notes = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING id, dropoff_id, waste_type_id, weight, amount, notes,
                       created_at, updated_at",
        )
        .bind(id)
        .bind(waste_type_id)
        .bind(weight)
        .bind(amount)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM waste_items WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_dropoff(
        &self,
        conn: &mut PgConnection,
        dropoff_id: Uuid,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM waste_items WHERE dropoff_id = $1")
            .bind(dropoff_id)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected())
    }
}
