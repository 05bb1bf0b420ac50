//! Request identity extraction
//!
//! Authentication lives upstream; the identity layer forwards the caller as
//! `x-user-id` and `x-user-role` headers. Handlers take an [`AuthContext`]
//! extractor and enforce ownership or role from it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value.to_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Caller identity attached to every /api request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::unauthorized("Admin role required"))
        }
    }

    /// Owners and admins may read or act on an owned resource
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing x-user-id header"))?;

        let user_id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::unauthorized("Invalid x-user-id header"))?;

        let raw_role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing x-user-role header"))?;

        let role = Role::parse(raw_role)
            .ok_or_else(|| AppError::unauthorized("Invalid x-user-role header"))?;

        Ok(AuthContext { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/test");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("USER"), Some(Role::User));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_ownership_check() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let user_ctx = AuthContext {
            user_id: owner,
            role: Role::User,
        };
        assert!(user_ctx.can_access(owner));
        assert!(!user_ctx.can_access(other));

        let admin_ctx = AuthContext {
            user_id: other,
            role: Role::Admin,
        };
        assert!(admin_ctx.can_access(owner));
        assert!(admin_ctx.require_admin().is_ok());
        assert!(user_ctx.require_admin().is_err());
    }

    #[tokio::test]
    async fn test_extracts_identity_headers() {
        let user_id = Uuid::new_v4();
        let mut parts = parts_with_headers(&[
            (USER_ID_HEADER, user_id.to_string().as_str()),
            (USER_ROLE_HEADER, "ADMIN"),
        ]);

        let ctx = AuthContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_rejects_missing_headers() {
        let mut parts = parts_with_headers(&[]);
        let err = AuthContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_rejects_malformed_user_id() {
        let mut parts = parts_with_headers(&[
            (USER_ID_HEADER, "not-a-uuid"),
            (USER_ROLE_HEADER, "USER"),
        ]);
        let err = AuthContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
