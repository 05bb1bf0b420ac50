use crate::database::error::DatabaseError;
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgPool};
use uuid::Uuid;

/// Waste type reference data with per-kilogram pricing
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WasteType {
    pub id: Uuid,
    pub name: String,
    pub price_per_kg: BigDecimal,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub struct WasteTypeRepository {
    pool: PgPool,
}

impl WasteTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<WasteType>, DatabaseError> {
        sqlx::query_as::<_, WasteType>(
            "SELECT id, name, price_per_kg, is_active, created_at, updated_at
             FROM waste_types
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// List waste types currently accepted for new items
    pub async fn list_active(&self) -> Result<Vec<WasteType>, DatabaseError> {
        sqlx::query_as::<_, WasteType>(
            "SELECT id, name, price_per_kg, is_active, created_at, updated_at
             FROM waste_types
             WHERE is_active = TRUE
             ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
