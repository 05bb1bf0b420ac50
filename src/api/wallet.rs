use crate::database::account_repository::AccountRepository;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthContext;
use crate::middleware::error::success_response;
use axum::extract::State;
use axum::response::IntoResponse;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct WalletState {
    pub accounts: Arc<AccountRepository>,
}

/// GET /api/wallet/balance
///
/// Returns the caller's account with both reward currencies.
pub async fn get_balance(
    State(state): State<WalletState>,
    ctx: AuthContext,
) -> AppResult<impl IntoResponse> {
    debug!(user_id = %ctx.user_id, "Balance request");

    let user = state
        .accounts
        .find_by_id(ctx.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User", ctx.user_id.to_string()))?;

    Ok(success_response(user))
}
