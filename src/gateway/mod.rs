//! Payment gateway integration: Snap charges, status polling, webhook
//! signature verification

pub mod error;
pub mod midtrans;
pub mod provider;
pub mod signature;
pub mod types;
pub mod utils;

pub use error::{GatewayError, GatewayResult};
pub use midtrans::SnapClient;
pub use provider::PaymentGateway;
pub use signature::{notification_signature, verify_notification_signature};
pub use types::{
    ChargeRequest, ChargeResponse, CustomerDetails, GatewayNotification, GatewayStatus,
    PaymentMethod,
};
