use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use trashvalue_backend::api;
use trashvalue_backend::config::{AppConfig, ServerConfig};
use trashvalue_backend::database::account_repository::AccountRepository;
use trashvalue_backend::database::init_pool_from_config;
use trashvalue_backend::gateway::{PaymentGateway, SnapClient};
use trashvalue_backend::health::{HealthChecker, HealthState, HealthStatus};
use trashvalue_backend::logging::init_tracing;
use trashvalue_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use trashvalue_backend::services::{
    DropoffLifecycle, PaymentReconciler, TransactionManager, WasteItemLedger,
};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize advanced tracing
    init_tracing();

    dotenv().ok();
    let skip_externals = std::env::var("SKIP_EXTERNALS")
        .unwrap_or_else(|_| "false".to_string())
        .to_lowercase()
        == "true";

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "🚀 Starting TrashValue backend service"
    );

    // Load configuration
    let config = if skip_externals {
        info!("⏭️  Skipping full configuration (SKIP_EXTERNALS=true)");
        None
    } else {
        let config = AppConfig::from_env().map_err(|e| {
            error!("❌ Failed to load configuration: {}", e);
            e
        })?;
        config.validate()?;
        info!(
            host = %config.server.host,
            port = config.server.port,
            "Server configuration loaded"
        );
        Some(config)
    };

    let server_config = match &config {
        Some(config) => config.server.clone(),
        None => ServerConfig::from_env()?,
    };

    // Initialize database connection pool
    let db_pool = match &config {
        Some(config) => {
            info!("📊 Initializing database connection pool...");
            let pool = init_pool_from_config(&config.database).await.map_err(|e| {
                error!("Failed to initialize database pool: {}", e);
                e
            })?;
            info!(
                max_connections = config.database.max_connections,
                "✅ Database connection pool initialized"
            );
            Some(pool)
        }
        None => {
            info!("⏭️  Skipping database initialization (SKIP_EXTERNALS=true)");
            None
        }
    };

    // Initialize health checker
    info!("🏥 Initializing health checker...");
    let health_checker = HealthChecker::new(db_pool.clone());
    info!("✅ Health checker initialized");

    // Build the API routers when the backing services are available
    let api_routes = if let (Some(pool), Some(config)) = (db_pool.clone(), config.as_ref()) {
        info!("🛣️  Setting up application routes...");

        let snap_client = SnapClient::new(&config.gateway).map_err(|e| {
            error!("❌ Failed to initialize payment gateway client: {}", e);
            e
        })?;
        let gateway: Arc<dyn PaymentGateway> = Arc::new(snap_client);
        info!(
            snap_base_url = %config.gateway.snap_base_url,
            api_base_url = %config.gateway.api_base_url,
            "✅ Payment gateway client initialized"
        );

        let fee_per_kg = config.rewards.pickup_fee_per_kg.clone();
        let lifecycle = Arc::new(DropoffLifecycle::new(pool.clone(), fee_per_kg.clone()));
        let ledger = Arc::new(WasteItemLedger::new(pool.clone(), fee_per_kg));
        let manager = Arc::new(TransactionManager::new(pool.clone(), gateway.clone()));
        let reconciler = Arc::new(PaymentReconciler::new(
            pool.clone(),
            gateway.clone(),
            config.gateway.server_key.clone(),
        ));
        let accounts = Arc::new(AccountRepository::new(pool.clone()));

        let wallet_routes = Router::new()
            .route("/api/wallet/balance", get(api::wallet::get_balance))
            .with_state(api::wallet::WalletState { accounts });

        let dropoff_routes = Router::new()
            .route(
                "/api/dropoffs",
                post(api::dropoffs::create_dropoff).get(api::dropoffs::list_dropoffs),
            )
            .route("/api/dropoffs/me", get(api::dropoffs::list_my_dropoffs))
            .route(
                "/api/dropoffs/{id}",
                get(api::dropoffs::get_dropoff).delete(api::dropoffs::delete_dropoff),
            )
            .route(
                "/api/dropoffs/{id}/status",
                patch(api::dropoffs::update_dropoff_status),
            )
            .route(
                "/api/dropoffs/{id}/cancel",
                post(api::dropoffs::cancel_dropoff),
            )
            .route(
                "/api/dropoffs/{id}/items",
                post(api::dropoffs::add_waste_item).get(api::dropoffs::list_waste_items),
            )
            .with_state(api::dropoffs::DropoffState {
                lifecycle: lifecycle.clone(),
                ledger: ledger.clone(),
            });

        let waste_item_routes = Router::new()
            .route("/api/waste-types", get(api::waste_items::list_waste_types))
            .route(
                "/api/waste-items/{id}",
                patch(api::waste_items::update_waste_item)
                    .delete(api::waste_items::remove_waste_item),
            )
            .with_state(api::waste_items::WasteItemState { ledger, lifecycle });

        let transaction_routes = Router::new()
            .route("/api/transactions", get(api::transactions::list_transactions))
            .route(
                "/api/transactions/withdraw",
                post(api::transactions::create_withdrawal),
            )
            .route(
                "/api/transactions/topup",
                post(api::transactions::create_topup),
            )
            .route(
                "/api/transactions/me",
                get(api::transactions::list_my_transactions),
            )
            .route(
                "/api/transactions/{id}",
                get(api::transactions::get_transaction),
            )
            .route(
                "/api/transactions/{id}/status",
                patch(api::transactions::update_transaction_status),
            )
            .route(
                "/api/transactions/{id}/cancel",
                post(api::transactions::cancel_transaction),
            )
            .route(
                "/api/transactions/{id}/payment-status",
                get(api::transactions::get_payment_status),
            )
            .with_state(api::transactions::TransactionState {
                manager,
                reconciler: reconciler.clone(),
            });

        let webhook_routes = Router::new()
            .route(
                "/webhooks/payment",
                post(api::webhooks::handle_payment_webhook),
            )
            .with_state(api::webhooks::WebhookState { reconciler });

        Router::new()
            .merge(wallet_routes)
            .merge(dropoff_routes)
            .merge(waste_item_routes)
            .merge(transaction_routes)
            .merge(webhook_routes)
    } else {
        info!("⏭️  Skipping API routes (no database)");
        Router::new()
    };

    let core_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .with_state(AppState { health_checker });

    // Create the application router with logging middleware
    let app = core_routes.merge(api_routes).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    info!("✅ Routes configured");

    // Run the server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    // Print a prominent banner with server information
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║                                                              ║");
    println!("║        🚀 TRASHVALUE BACKEND SERVER IS RUNNING 🚀            ║");
    println!("║                                                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║                                                              ║");
    println!(
        "║  🌐 Server Address:  http://{}                    ║",
        addr
    );
    println!("║                                                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  📡 AVAILABLE ENDPOINTS:                                     ║");
    println!("║                                                              ║");
    println!("║  GET  /                          - Root endpoint             ║");
    println!("║  GET  /health                    - Health check              ║");
    println!("║  GET  /health/ready              - Readiness probe           ║");
    println!("║  GET  /health/live               - Liveness probe            ║");
    println!("║  GET  /api/wallet/balance        - Caller's balances         ║");
    println!("║  GET  /api/waste-types           - Active waste types        ║");
    println!("║  POST /api/dropoffs              - Create a dropoff          ║");
    println!("║  POST /api/transactions/topup    - Start a wallet topup      ║");
    println!("║  POST /api/transactions/withdraw - Request a withdrawal      ║");
    println!("║  POST /webhooks/payment          - Gateway notifications     ║");
    println!("║                                                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║                                                              ║");
    println!("║  💡 Try it out:                                              ║");
    println!(
        "║     curl http://{}/health                        ║",
        addr
    );
    println!("║                                                              ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    info!(
        address = %addr,
        "🚀 Server listening on http://{}",
        addr
    );
    info!("✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

// Application state
#[derive(Clone)]
struct AppState {
    health_checker: HealthChecker,
}

// Handlers
async fn root() -> &'static str {
    info!("📍 Root endpoint accessed");
    "Welcome to TrashValue Backend API"
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    info!("🏥 Health check requested");
    let health_status = state.health_checker.check_health().await;

    // Return 503 if any component is unhealthy
    if matches!(health_status.status, HealthState::Unhealthy) {
        error!("❌ Health check failed - service unhealthy");
        Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        info!("✅ Health check passed");
        Ok(Json(health_status))
    }
}

/// Readiness probe - checks if the service is ready to accept traffic
async fn readiness(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    info!("🔍 Readiness probe requested");
    // Readiness checks all dependencies
    let result = health(axum::extract::State(state)).await;
    if result.is_ok() {
        info!("✅ Readiness check passed");
    } else {
        error!("❌ Readiness check failed");
    }
    result
}

/// Liveness probe - checks if the service is alive (basic check)
async fn liveness() -> Result<&'static str, (axum::http::StatusCode, String)> {
    info!("💓 Liveness probe requested");
    Ok("OK")
}
