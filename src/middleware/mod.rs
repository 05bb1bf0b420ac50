//! HTTP middleware: identity extraction, error formatting, request logging

pub mod auth;
pub mod error;
pub mod logging;

pub use auth::{AuthContext, Role};
pub use error::{success_response, success_response_with_meta, ErrorResponse};
