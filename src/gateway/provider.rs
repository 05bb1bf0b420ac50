use crate::gateway::error::GatewayResult;
use crate::gateway::types::{ChargeRequest, ChargeResponse, GatewayStatus};
use async_trait::async_trait;

/// Operations the payment gateway must support
///
/// Services depend on this trait so the live Snap client can be swapped
/// out in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout charge, returning the token and redirect URL
    async fn create_charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse>;

    /// Fetch the live status of a transaction by its order_id
    async fn fetch_status(&self, order_id: &str) -> GatewayResult<GatewayStatus>;

    /// Cancel a not-yet-settled transaction
    async fn cancel(&self, order_id: &str) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::{CustomerDetails, PaymentMethod};

    struct MockGateway;

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse> {
            Ok(ChargeResponse {
                token: format!("token-{}", request.order_id),
                redirect_url: "https://example.com/redirect".to_string(),
            })
        }

        async fn fetch_status(&self, order_id: &str) -> GatewayResult<GatewayStatus> {
            Ok(GatewayStatus {
                order_id: Some(order_id.to_string()),
                transaction_status: Some("settlement".to_string()),
                ..GatewayStatus::default()
            })
        }

        async fn cancel(&self, _order_id: &str) -> GatewayResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_mock_gateway() {
        let gateway: Box<dyn PaymentGateway> = Box::new(MockGateway);

        let charge = gateway
            .create_charge(&ChargeRequest {
                order_id: "tx-1".to_string(),
                gross_amount: 50000,
                customer: CustomerDetails {
                    first_name: "Budi".to_string(),
                    email: None,
                    phone: None,
                },
                payment_method: PaymentMethod::EWallet,
                specific_method: None,
            })
            .await
            .expect("charge should succeed");
        assert_eq!(charge.token, "token-tx-1");

        let status = gateway
            .fetch_status("tx-1")
            .await
            .expect("status should succeed");
        assert_eq!(status.transaction_status.as_deref(), Some("settlement"));
    }
}
