//! StockHub Server — multi-tenant notification delivery backend
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use stockhub_core::config::AppConfig;
use stockhub_core::error::AppError;
use stockhub_database::repositories::NotificationRepository;
use stockhub_realtime::bridge::{MemoryBus, NotificationBus, RedisBus};
use stockhub_realtime::metrics::EngineMetrics;
use stockhub_realtime::RealtimeEngine;
use stockhub_service::{DeliveryService, NotificationQueryService, NotificationStore};
use stockhub_worker::jobs::ExpiryCleanupJob;
use stockhub_worker::WorkerScheduler;

#[tokio::main]
async fn main() {
    let env = std::env::var("STOCKHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting StockHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = stockhub_database::DatabasePool::connect(&config.database).await?;
    stockhub_database::migration::run_migrations(db.pool()).await?;

    let notification_repo = Arc::new(NotificationRepository::new(db.pool().clone()));

    // ── Step 2: Message bus + realtime engine ────────────────────
    let metrics = Arc::new(EngineMetrics::new());

    let (bus, memory_bus): (Arc<dyn NotificationBus>, Option<Arc<MemoryBus>>) =
        if config.bus.enabled {
            let bus = RedisBus::connect(&config.bus, metrics.clone()).await?;
            (Arc::new(bus), None)
        } else {
            tracing::info!("External bus disabled, using in-memory fan-out");
            let bus = Arc::new(MemoryBus::new(config.realtime.channel_buffer_size));
            (bus.clone(), Some(bus))
        };

    let engine = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        bus.clone(),
        metrics,
    ));

    let subscriber_handle = match &memory_bus {
        Some(memory_bus) => {
            memory_bus.spawn_subscriber(engine.router(), engine.shutdown_receiver())
        }
        None => RedisBus::spawn_subscriber(
            config.bus.clone(),
            engine.router(),
            engine.shutdown_receiver(),
        ),
    };
    let sweep_handle = engine.spawn_sweep();

    // ── Step 3: Services ─────────────────────────────────────────
    let store: Arc<dyn NotificationStore> = notification_repo.clone();
    let delivery = Arc::new(DeliveryService::new(
        store.clone(),
        bus,
        engine.registry().clone(),
        engine.origin(),
        config.notifications.default_expiry(),
    ));
    let queries = Arc::new(NotificationQueryService::new(store));

    // ── Step 4: Maintenance scheduler ────────────────────────────
    let mut scheduler = WorkerScheduler::start(
        ExpiryCleanupJob::new(notification_repo.clone()),
        &config.notifications.cleanup_cron,
    )
    .await?;

    // ── Step 5: HTTP server ──────────────────────────────────────
    let app_state = stockhub_api::AppState {
        config: Arc::new(config.clone()),
        db: db.clone(),
        engine: engine.clone(),
        delivery,
        queries,
    };

    let app = stockhub_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("StockHub server listening on {addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Stop background tasks ────────────────────────────
    engine.shutdown();
    scheduler.shutdown().await;

    let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
    let _ = tokio::time::timeout(grace, subscriber_handle).await;
    let _ = tokio::time::timeout(grace, sweep_handle).await;

    db.close().await;

    tracing::info!("StockHub server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
