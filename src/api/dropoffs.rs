use crate::api::{pagination_meta, PaginationParams};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::middleware::error::{success_response, success_response_with_meta};
use crate::services::dropoff_lifecycle::{CreateDropoffInput, DropoffLifecycle};
use crate::services::waste_item_ledger::{AddItemInput, WasteItemLedger};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct DropoffState {
    pub lifecycle: Arc<DropoffLifecycle>,
    pub ledger: Arc<WasteItemLedger>,
}

#[derive(Debug, Deserialize)]
pub struct DropoffListQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MyDropoffsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDropoffStatusRequest {
    pub status: String,
}

/// POST /api/dropoffs
pub async fn create_dropoff(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Json(input): Json<CreateDropoffInput>,
) -> AppResult<impl IntoResponse> {
    let dropoff = state.lifecycle.create(ctx.user_id, input).await?;
    Ok(success_response(dropoff))
}

/// GET /api/dropoffs (admin)
pub async fn list_dropoffs(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Query(query): Query<DropoffListQuery>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;

    let (page, limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .normalize();

    let (dropoffs, total) = state
        .lifecycle
        .list(query.user_id, query.status.as_deref(), limit, offset)
        .await?;

    Ok(success_response_with_meta(
        dropoffs,
        pagination_meta(page, limit, total),
    ))
}

/// GET /api/dropoffs/me
pub async fn list_my_dropoffs(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Query(query): Query<MyDropoffsQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .normalize();

    let (dropoffs, total) = state
        .lifecycle
        .list(Some(ctx.user_id), query.status.as_deref(), limit, offset)
        .await?;

    Ok(success_response_with_meta(
        dropoffs,
        pagination_meta(page, limit, total),
    ))
}

/// GET /api/dropoffs/{id} (owner or admin)
pub async fn get_dropoff(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let dropoff = state.lifecycle.get(id).await?;
    if !ctx.can_access(dropoff.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this dropoff",
        ));
    }
    Ok(success_response(dropoff))
}

/// PATCH /api/dropoffs/{id}/status (admin)
pub async fn update_dropoff_status(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDropoffStatusRequest>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    info!(dropoff_id = %id, status = %request.status, "Dropoff status update requested");
    let dropoff = state.lifecycle.update_status(id, &request.status).await?;
    Ok(success_response(dropoff))
}

/// POST /api/dropoffs/{id}/cancel (owner or admin)
pub async fn cancel_dropoff(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let dropoff = state.lifecycle.cancel(id, &ctx).await?;
    Ok(success_response(dropoff))
}

/// DELETE /api/dropoffs/{id} (admin)
pub async fn delete_dropoff(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    state.lifecycle.delete(id).await?;
    Ok(success_response(json!({ "id": id, "deleted": true })))
}

/// POST /api/dropoffs/{id}/items (owner or admin)
pub async fn add_waste_item(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(input): Json<AddItemInput>,
) -> AppResult<impl IntoResponse> {
    let dropoff = state.lifecycle.get(id).await?;
    if !ctx.can_access(dropoff.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this dropoff",
        ));
    }
    let item = state.ledger.add_item(id, input).await?;
    Ok(success_response(item))
}

/// GET /api/dropoffs/{id}/items (owner or admin)
pub async fn list_waste_items(
    State(state): State<DropoffState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let dropoff = state.lifecycle.get(id).await?;
    if !ctx.can_access(dropoff.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this dropoff",
        ));
    }
    let items = state.ledger.list_items(id).await?;
    Ok(success_response(items))
}
