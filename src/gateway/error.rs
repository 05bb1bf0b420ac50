use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Gateway authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Gateway has no transaction with order_id {order_id}")]
    NotFound { order_id: String },

    #[error("Gateway transaction {order_id} is already finalized")]
    AlreadyFinal { order_id: String },

    #[error("Gateway rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("Gateway returned HTTP {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Gateway network error: {message}")]
    Network { message: String },

    #[error("Invalid gateway response: {message}")]
    Serialization { message: String },
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::AuthenticationFailed { .. } => false,
            GatewayError::NotFound { .. } => false,
            GatewayError::AlreadyFinal { .. } => false,
            GatewayError::RateLimited { .. } => true,
            GatewayError::Upstream { retryable, .. } => *retryable,
            GatewayError::Network { .. } => true,
            GatewayError::Serialization { .. } => false,
        }
    }
}

impl From<GatewayError> for crate::error::AppError {
    fn from(err: GatewayError) -> Self {
        use crate::error::{AppError, AppErrorKind, ExternalError};

        match &err {
            GatewayError::NotFound { order_id } => {
                AppError::not_found("Gateway transaction", order_id)
            }
            GatewayError::AlreadyFinal { order_id } => AppError::conflict(format!(
                "Transaction {} is already finalized at the payment gateway",
                order_id
            )),
            GatewayError::AuthenticationFailed { .. } => {
                AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
                    message: "Payment gateway authentication failed. Check gateway credentials"
                        .to_string(),
                    is_retryable: false,
                }))
            }
            _ => AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
                message: err.to_string(),
                is_retryable: err.is_retryable(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn retryable_flags_are_set() {
        assert!(GatewayError::Network {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(!GatewayError::AuthenticationFailed {
            message: "bad key".to_string()
        }
        .is_retryable());
        assert!(GatewayError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
            retryable: true,
        }
        .is_retryable());
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = GatewayError::NotFound {
            order_id: "tx-1".to_string(),
        };
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), 404);
    }

    #[test]
    fn auth_failure_maps_to_502_with_distinct_message() {
        let err = GatewayError::AuthenticationFailed {
            message: "401".to_string(),
        };
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), 502);
        assert!(app_err.user_message().contains("authentication failed"));
    }
}
