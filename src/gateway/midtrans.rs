//! Midtrans Snap client
//!
//! Charges go through the Snap hosted checkout API; status and cancel go
//! through the core v2 API. Both authenticate with the same server key.

use crate::config::GatewayConfig;
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::provider::PaymentGateway;
use crate::gateway::types::{ChargeRequest, ChargeResponse, GatewayStatus};
use crate::gateway::utils::GatewayHttpClient;
use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::info;

pub struct SnapClient {
    http: GatewayHttpClient,
    snap_base_url: String,
    api_base_url: String,
}

impl SnapClient {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let http = GatewayHttpClient::new(
            &config.server_key,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )?;

        Ok(Self {
            http,
            snap_base_url: config.snap_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn charge_url(&self) -> String {
        format!("{}/transactions", self.snap_base_url)
    }

    fn status_url(&self, order_id: &str) -> String {
        format!("{}/{}/status", self.api_base_url, order_id)
    }

    fn cancel_url(&self, order_id: &str) -> String {
        format!("{}/{}/cancel", self.api_base_url, order_id)
    }
}

#[async_trait]
impl PaymentGateway for SnapClient {
    async fn create_charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse> {
        let payload = request.to_snap_payload();

        info!(
            order_id = %request.order_id,
            gross_amount = request.gross_amount,
            payment_method = %request.payment_method,
            "Creating gateway charge"
        );

        self.http
            .request_json::<ChargeResponse>(Method::POST, &self.charge_url(), Some(&payload))
            .await
    }

    async fn fetch_status(&self, order_id: &str) -> GatewayResult<GatewayStatus> {
        let result = self
            .http
            .request_json::<GatewayStatus>(Method::GET, &self.status_url(order_id), None)
            .await;

        match result {
            Err(GatewayError::Upstream { status: 404, .. }) => Err(GatewayError::NotFound {
                order_id: order_id.to_string(),
            }),
            other => other,
        }
    }

    async fn cancel(&self, order_id: &str) -> GatewayResult<()> {
        let result = self
            .http
            .request_json::<serde_json::Value>(Method::POST, &self.cancel_url(order_id), None)
            .await;

        match result {
            Ok(_) => {
                info!(order_id = %order_id, "Gateway charge cancelled");
                Ok(())
            }
            // 412 means the transaction already reached a final state and
            // can no longer be modified
            Err(GatewayError::Upstream { status: 412, .. }) => Err(GatewayError::AlreadyFinal {
                order_id: order_id.to_string(),
            }),
            Err(GatewayError::Upstream { status: 404, .. }) => Err(GatewayError::NotFound {
                order_id: order_id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}
