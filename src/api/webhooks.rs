use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::gateway::GatewayNotification;
use crate::services::payment_reconciler::PaymentReconciler;

#[derive(Clone)]
pub struct WebhookState {
    pub reconciler: Arc<PaymentReconciler>,
}

/// POST /webhooks/payment
///
/// Gateway settlement notification. Authentication failures are the only
/// non-2xx outcomes after parsing; processing errors still return 200 so
/// the gateway does not retry reports we have already judged.
pub async fn handle_payment_webhook(
    State(state): State<WebhookState>,
    body: String,
) -> impl IntoResponse {
    let notification: GatewayNotification = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(error = %e, "Invalid webhook payload");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    info!(
        order_id = %notification.order_id,
        transaction_status = %notification.transaction_status,
        "Received payment webhook"
    );

    if !state.reconciler.authenticate(&notification) {
        warn!(order_id = %notification.order_id, "Webhook signature verification failed");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    match state
        .reconciler
        .apply(
            &notification.order_id,
            &notification.transaction_status,
            notification.fraud_status.as_deref(),
        )
        .await
    {
        Ok(_) => info!(order_id = %notification.order_id, "Webhook processed successfully"),
        Err(e) => {
            error!(order_id = %notification.order_id, error = %e, "Webhook processing failed")
        }
    }

    (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
}
