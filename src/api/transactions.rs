use crate::api::{pagination_meta, PaginationParams};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::middleware::error::{success_response, success_response_with_meta};
use crate::services::payment_reconciler::PaymentReconciler;
use crate::services::transaction_manager::{TopupInput, TransactionManager, WithdrawalInput};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct TransactionState {
    pub manager: Arc<TransactionManager>,
    pub reconciler: Arc<PaymentReconciler>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub user_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MyTransactionsQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTransactionStatusRequest {
    pub status: String,
}

/// POST /api/transactions/withdraw
pub async fn create_withdrawal(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Json(input): Json<WithdrawalInput>,
) -> AppResult<impl IntoResponse> {
    let transaction = state.manager.create_withdrawal(ctx.user_id, input).await?;
    Ok(success_response(transaction))
}

/// POST /api/transactions/topup
pub async fn create_topup(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Json(input): Json<TopupInput>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.manager.create_topup(ctx.user_id, input).await?;
    Ok(success_response(outcome))
}

/// GET /api/transactions (admin)
pub async fn list_transactions(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;

    let (page, limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .normalize();

    let (transactions, total) = state
        .manager
        .list(
            query.user_id,
            query.status.as_deref(),
            query.transaction_type.as_deref(),
            limit,
            offset,
        )
        .await?;

    Ok(success_response_with_meta(
        transactions,
        pagination_meta(page, limit, total),
    ))
}

/// GET /api/transactions/me
pub async fn list_my_transactions(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Query(query): Query<MyTransactionsQuery>,
) -> AppResult<impl IntoResponse> {
    let (page, limit, offset) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .normalize();

    let (transactions, total) = state
        .manager
        .list(
            Some(ctx.user_id),
            query.status.as_deref(),
            query.transaction_type.as_deref(),
            limit,
            offset,
        )
        .await?;

    Ok(success_response_with_meta(
        transactions,
        pagination_meta(page, limit, total),
    ))
}

/// GET /api/transactions/{id} (owner or admin)
pub async fn get_transaction(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let transaction = state.manager.get(id).await?;
    if !ctx.can_access(transaction.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this transaction",
        ));
    }
    Ok(success_response(transaction))
}

/// PATCH /api/transactions/{id}/status (admin)
pub async fn update_transaction_status(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTransactionStatusRequest>,
) -> AppResult<impl IntoResponse> {
    ctx.require_admin()?;
    info!(transaction_id = %id, status = %request.status, "Transaction status update requested");
    let transaction = state.manager.update_status(id, &request.status).await?;
    Ok(success_response(transaction))
}

/// POST /api/transactions/{id}/cancel (owner or admin)
pub async fn cancel_transaction(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let transaction = state.manager.get(id).await?;
    if !ctx.can_access(transaction.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this transaction",
        ));
    }
    let transaction = state.manager.cancel(id).await?;
    Ok(success_response(transaction))
}

/// GET /api/transactions/{id}/payment-status (owner or admin)
///
/// Polls the gateway for the charge and reconciles the answer before
/// returning both views.
pub async fn get_payment_status(
    State(state): State<TransactionState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let transaction = state.manager.get(id).await?;
    if !ctx.can_access(transaction.user_id) {
        return Err(AppError::unauthorized(
            "You do not have access to this transaction",
        ));
    }
    let outcome = state.reconciler.poll(id).await?;
    Ok(success_response(outcome))
}
