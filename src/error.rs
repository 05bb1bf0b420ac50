//! Unified error handling for the TrashValue backend
//!
//! This module provides a single error system with HTTP status mapping,
//! user-friendly messages, and structured error codes for client handling.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic client handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    #[serde(rename = "INVALID_STATE_TRANSITION")]
    InvalidStateTransition,
    #[serde(rename = "INSUFFICIENT_FUNDS")]
    InsufficientFunds,
    #[serde(rename = "CONFLICT")]
    Conflict,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502, 504)
    #[serde(rename = "PAYMENT_GATEWAY_ERROR")]
    PaymentGatewayError,
    #[serde(rename = "EXTERNAL_SERVICE_TIMEOUT")]
    ExternalServiceTimeout,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Entity with the given id doesn't exist
    NotFound { resource: String, id: String },
    /// Caller lacks ownership or the required role
    Unauthorized { message: String },
    /// The status change is absent from the entity's transition table
    InvalidStateTransition {
        entity: String,
        from: String,
        to: String,
    },
    /// The operation is not allowed while the entity is in this state
    InvalidState {
        entity: String,
        state: String,
        operation: String,
    },
    /// Combined points + balance cannot cover the debit
    InsufficientFunds { available: String, required: String },
    /// Lost a compare-and-swap to a concurrent writer
    Conflict { message: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (payment gateway)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Payment gateway rejected or failed the call
    PaymentGateway { message: String, is_retryable: bool },
    /// External service timeout
    Timeout { service: String, timeout_secs: u64 },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Field value failed validation
    InvalidInput { field: String, message: String },
    /// Required field missing
    MissingField { field: String },
    /// Invalid amount (format or value)
    InvalidAmount { amount: String, reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::Unauthorized {
            message: message.into(),
        }))
    }

    pub fn invalid_transition(
        entity: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::InvalidStateTransition {
            entity: entity.into(),
            from: from.into(),
            to: to.into(),
        }))
    }

    pub fn invalid_state(
        entity: impl Into<String>,
        state: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::InvalidState {
            entity: entity.into(),
            state: state.into(),
            operation: operation.into(),
        }))
    }

    pub fn insufficient_funds(available: impl Into<String>, required: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::InsufficientFunds {
            available: available.into(),
            required: required.into(),
        }))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Domain(DomainError::Conflict {
            message: message.into(),
        }))
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }))
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::MissingField {
            field: field.into(),
        }))
    }

    pub fn invalid_amount(amount: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Validation(ValidationError::InvalidAmount {
            amount: amount.into(),
            reason: reason.into(),
        }))
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::NotFound { .. } => 404,
                DomainError::Unauthorized { .. } => 403,
                DomainError::InvalidStateTransition { .. } => 422, // Unprocessable Entity
                DomainError::InvalidState { .. } => 422,
                DomainError::InsufficientFunds { .. } => 422,
                DomainError::Conflict { .. } => 409,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => 500,
                InfrastructureError::Configuration { .. } => 500,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => 502, // Bad Gateway
                ExternalError::Timeout { .. } => 504,        // Gateway Timeout
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::NotFound { .. } => ErrorCode::NotFound,
                DomainError::Unauthorized { .. } => ErrorCode::Unauthorized,
                DomainError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
                DomainError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
                DomainError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
                DomainError::Conflict { .. } => ErrorCode::Conflict,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { .. } => ErrorCode::PaymentGatewayError,
                ExternalError::Timeout { .. } => ErrorCode::ExternalServiceTimeout,
            },
            AppErrorKind::Validation(_) => ErrorCode::InvalidInput,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::NotFound { resource, id } => {
                    format!("{} '{}' not found", resource, id)
                }
                DomainError::Unauthorized { message } => message.clone(),
                DomainError::InvalidStateTransition { entity, from, to } => {
                    format!("Cannot transition {} from {} to {}", entity, from, to)
                }
                DomainError::InvalidState {
                    entity,
                    state,
                    operation,
                } => {
                    format!("Cannot {} while {} is {}", operation, entity, state)
                }
                DomainError::InsufficientFunds {
                    available,
                    required,
                } => {
                    format!(
                        "Insufficient funds. Available: {}, Required: {}",
                        available, required
                    )
                }
                DomainError::Conflict { message } => message.clone(),
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway {
                    message,
                    is_retryable,
                } => {
                    if *is_retryable {
                        "Payment gateway is temporarily unavailable. Please try again".to_string()
                    } else {
                        format!("Payment error: {}", message)
                    }
                }
                ExternalError::Timeout {
                    service,
                    timeout_secs,
                } => {
                    format!(
                        "{} request timed out after {} seconds. Please try again",
                        service, timeout_secs
                    )
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidInput { field, message } => {
                    format!("Invalid {}: {}", field, message)
                }
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::PaymentGateway { is_retryable, .. } => *is_retryable,
                ExternalError::Timeout { .. } => true,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// Conversions from specific error types
// Note: From<DatabaseError> is implemented in database/error.rs and
// From<GatewayError> in gateway/error.rs to avoid circular dependencies

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = AppError::not_found("Dropoff", "d2f1a868-1c5e-4de1-9e8f-000000000001");

        assert_eq!(error.status_code(), 404);
        assert_eq!(error.error_code(), ErrorCode::NotFound);
        assert!(error.user_message().contains("not found"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_insufficient_funds_error() {
        let error = AppError::insufficient_funds("500", "50000");

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::InsufficientFunds);
        assert!(error.user_message().contains("Insufficient funds"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_invalid_transition_error() {
        let error = AppError::invalid_transition("dropoff", "COMPLETED", "PENDING");

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::InvalidStateTransition);
        assert!(error.user_message().contains("COMPLETED"));
    }

    #[test]
    fn test_invalid_state_error() {
        let error = AppError::invalid_state("dropoff", "COMPLETED", "add waste items");

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::InvalidStateTransition);
        assert!(error.user_message().contains("add waste items"));
    }

    #[test]
    fn test_gateway_error_retryable() {
        let error = AppError::new(AppErrorKind::External(ExternalError::PaymentGateway {
            message: "upstream 503".to_string(),
            is_retryable: true,
        }));

        assert_eq!(error.status_code(), 502);
        assert_eq!(error.error_code(), ErrorCode::PaymentGatewayError);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::invalid_amount("-100", "Amount must be greater than zero");

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.error_code(), ErrorCode::InvalidInput);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_external_timeout_error() {
        let error = AppError::new(AppErrorKind::External(ExternalError::Timeout {
            service: "payment gateway".to_string(),
            timeout_secs: 30,
        }));

        assert_eq!(error.status_code(), 504);
        assert_eq!(error.error_code(), ErrorCode::ExternalServiceTimeout);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_request_id_attachment() {
        let error = AppError::conflict("Transaction status changed concurrently")
            .with_request_id("req-123")
            .with_context("manual status update");

        assert_eq!(error.status_code(), 409);
        assert_eq!(error.request_id.as_deref(), Some("req-123"));
        assert!(error.context.is_some());
    }
}
