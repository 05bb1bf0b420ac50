use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::middleware::error::success_response;
use crate::services::dropoff_lifecycle::DropoffLifecycle;
use crate::services::waste_item_ledger::{UpdateItemInput, WasteItemLedger};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct WasteItemState {
    pub ledger: Arc<WasteItemLedger>,
    pub lifecycle: Arc<DropoffLifecycle>,
}

/// GET /api/waste-types
pub async fn list_waste_types(
    State(state): State<WasteItemState>,
    _ctx: AuthContext,
) -> AppResult<impl IntoResponse> {
    let waste_types = state.ledger.list_waste_types().await?;
    Ok(success_response(waste_types))
}

/// PATCH /api/waste-items/{id} (owner or admin)
pub async fn update_waste_item(
    State(state): State<WasteItemState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<impl IntoResponse> {
    authorize_item_access(&state, &ctx, id).await?;
    let item = state.ledger.update_item(id, input).await?;
    Ok(success_response(item))
}

/// DELETE /api/waste-items/{id} (owner or admin)
pub async fn remove_waste_item(
    State(state): State<WasteItemState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    authorize_item_access(&state, &ctx, id).await?;
    state.ledger.remove_item(id).await?;
    Ok(success_response(json!({ "id": id, "deleted": true })))
}

/// Resolve the item's parent dropoff and check the caller may act on it
async fn authorize_item_access(
    state: &WasteItemState,
    ctx: &AuthContext,
    item_id: Uuid,
) -> AppResult<()> {
    let item = state.ledger.get_item(item_id).await?;
    let dropoff = state.lifecycle.get(item.dropoff_id).await?;
    if !ctx.can_access(dropoff.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this waste item",
        ));
    }
    Ok(())
}
