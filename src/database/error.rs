//! Database error types and sqlx error classification

use std::fmt;

/// Classified database error kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    /// No row matched the query
    NotFound,
    /// Unique constraint violation (Postgres 23505)
    UniqueViolation { constraint: String },
    /// Foreign key violation (Postgres 23503)
    ForeignKeyViolation { constraint: String },
    /// Check constraint violation (Postgres 23514)
    CheckViolation { constraint: String },
    /// Could not reach or authenticate with the database
    ConnectionFailure,
    /// Pool or statement timeout
    Timeout,
    /// Anything sqlx reports that we do not classify
    Unknown { message: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
    pub context: Option<String>,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Classify a raw sqlx error into a [`DatabaseErrorKind`]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound,
            sqlx::Error::Database(db_err) => {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseErrorKind::UniqueViolation { constraint },
                    Some("23503") => DatabaseErrorKind::ForeignKeyViolation { constraint },
                    Some("23514") => DatabaseErrorKind::CheckViolation { constraint },
                    _ => DatabaseErrorKind::Unknown {
                        message: db_err.to_string(),
                    },
                }
            }
            sqlx::Error::PoolTimedOut => DatabaseErrorKind::Timeout,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => DatabaseErrorKind::ConnectionFailure,
            other => DatabaseErrorKind::Unknown {
                message: other.to_string(),
            },
        };

        Self::new(kind)
    }

    /// Retryable errors are transient infrastructure failures
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            DatabaseErrorKind::ConnectionFailure | DatabaseErrorKind::Timeout
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == DatabaseErrorKind::NotFound
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DatabaseErrorKind::NotFound => write!(f, "Row not found"),
            DatabaseErrorKind::UniqueViolation { constraint } => {
                write!(f, "Unique constraint violated: {}", constraint)
            }
            DatabaseErrorKind::ForeignKeyViolation { constraint } => {
                write!(f, "Foreign key constraint violated: {}", constraint)
            }
            DatabaseErrorKind::CheckViolation { constraint } => {
                write!(f, "Check constraint violated: {}", constraint)
            }
            DatabaseErrorKind::ConnectionFailure => write!(f, "Database connection failure"),
            DatabaseErrorKind::Timeout => write!(f, "Database operation timed out"),
            DatabaseErrorKind::Unknown { message } => write!(f, "Database error: {}", message),
        }?;

        if let Some(context) = &self.context {
            write!(f, " ({})", context)?;
        }

        Ok(())
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for crate::error::AppError {
    fn from(err: DatabaseError) -> Self {
        use crate::error::{AppError, AppErrorKind, InfrastructureError};

        match &err.kind {
            DatabaseErrorKind::UniqueViolation { constraint } => {
                AppError::conflict(format!("Duplicate value violates '{}'", constraint))
            }
            _ => AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
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
    fn test_row_not_found_classification() {
        let err = DatabaseError::from_sqlx(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err = DatabaseError::from_sqlx(sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, DatabaseErrorKind::Timeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = DatabaseError::new(DatabaseErrorKind::UniqueViolation {
            constraint: "users_email_key".to_string(),
        });
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), 409);
    }

    #[test]
    fn test_connection_failure_maps_to_retryable_500() {
        let err = DatabaseError::new(DatabaseErrorKind::ConnectionFailure);
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), 500);
        assert!(app_err.is_retryable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = DatabaseError::new(DatabaseErrorKind::NotFound).with_context("find dropoff");
        assert!(err.to_string().contains("find dropoff"));
    }
}
