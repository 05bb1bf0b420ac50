//! Health probes for the service and its dependencies

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

use crate::database::error::DatabaseError;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Aggregated health report returned by the probes
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    fn healthy() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Record one component and escalate the overall state to match
    fn record(&mut self, name: &str, component: ComponentHealth) {
        match component.status {
            ComponentState::Down => self.status = HealthState::Unhealthy,
            ComponentState::Warning if self.status == HealthState::Healthy => {
                self.status = HealthState::Degraded;
            }
            _ => {}
        }
        self.checks.insert(name.to_string(), component);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Runs the dependency checks behind the health endpoints
#[derive(Clone)]
pub struct HealthChecker {
    db_pool: Option<sqlx::PgPool>,
}

impl HealthChecker {
    pub fn new(db_pool: Option<sqlx::PgPool>) -> Self {
        Self { db_pool }
    }

    pub async fn check_health(&self) -> HealthStatus {
        let mut report = HealthStatus::healthy();

        let database = match self.db_pool.as_ref() {
            Some(pool) => match timeout(DB_CHECK_TIMEOUT, timed_db_check(pool)).await {
                Ok(Ok(elapsed_ms)) => {
                    info!("Database health check: OK ({}ms)", elapsed_ms);
                    ComponentHealth {
                        status: ComponentState::Up,
                        response_time_ms: Some(elapsed_ms),
                        details: None,
                    }
                }
                Ok(Err(e)) => {
                    error!("Database health check failed: {}", e);
                    ComponentHealth {
                        status: ComponentState::Down,
                        response_time_ms: None,
                        details: Some(e.to_string()),
                    }
                }
                Err(_) => {
                    error!("Database health check timed out");
                    ComponentHealth {
                        status: ComponentState::Down,
                        response_time_ms: None,
                        details: Some("Timeout".to_string()),
                    }
                }
            },
            None => ComponentHealth {
                status: ComponentState::Warning,
                response_time_ms: None,
                details: Some("Not configured".to_string()),
            },
        };

        report.record("database", database);
        report
    }
}

async fn timed_db_check(pool: &sqlx::PgPool) -> Result<u128, DatabaseError> {
    let start = Instant::now();
    crate::database::health_check(pool).await?;
    Ok(start.elapsed().as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up() -> ComponentHealth {
        ComponentHealth {
            status: ComponentState::Up,
            response_time_ms: Some(3),
            details: None,
        }
    }

    fn down(details: &str) -> ComponentHealth {
        ComponentHealth {
            status: ComponentState::Down,
            response_time_ms: None,
            details: Some(details.to_string()),
        }
    }

    fn warning(details: &str) -> ComponentHealth {
        ComponentHealth {
            status: ComponentState::Warning,
            response_time_ms: None,
            details: Some(details.to_string()),
        }
    }

    #[test]
    fn components_escalate_the_overall_state() {
        let mut report = HealthStatus::healthy();
        assert!(report.is_healthy());

        report.record("database", up());
        assert_eq!(report.status, HealthState::Healthy);

        report.record("cache", warning("Not configured"));
        assert_eq!(report.status, HealthState::Degraded);

        report.record("gateway", down("Connection refused"));
        assert_eq!(report.status, HealthState::Unhealthy);

        // A later warning never downgrades an unhealthy report
        report.record("queue", warning("Slow"));
        assert_eq!(report.status, HealthState::Unhealthy);
        assert_eq!(report.checks.len(), 4);
    }

    #[tokio::test]
    async fn missing_database_reports_degraded() {
        let checker = HealthChecker::new(None);
        let report = checker.check_health().await;

        assert_eq!(report.status, HealthState::Degraded);
        assert!(report.checks.contains_key("database"));
        assert!(!report.is_healthy());
        assert!(report.timestamp <= chrono::Utc::now());
    }
}
