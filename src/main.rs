mod app_state;
mod auth;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::queue::BookingQueue;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing gatepass server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "bookings_enqueued_total",
        "Total booking jobs accepted by the API"
    );
    metrics::describe_counter!(
        "bookings_confirmed_total",
        "Total booking jobs that issued a pass"
    );
    metrics::describe_counter!(
        "bookings_failed_total",
        "Total booking jobs that reached a terminal failure, by reason"
    );
    metrics::describe_counter!(
        "checkin_scans_total",
        "Total gate transitions applied, by action"
    );
    metrics::describe_gauge!(
        "booking_queue_depth",
        "Current number of waiting jobs in the booking queue"
    );
    metrics::describe_histogram!(
        "booking_transaction_seconds",
        "Time to run one seat-reservation transaction"
    );

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize Redis booking queue
    tracing::info!("Connecting to Redis booking queue");
    let queue = BookingQueue::new(&config.redis_url).expect("Failed to initialize booking queue");

    // Create shared application state
    let state = AppState::new(db_pool, queue, &config.jwt_secret);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/bookings", post(routes::booking::submit_booking))
        .route(
            "/api/v1/bookings/{event_id}",
            get(routes::booking::booking_status),
        )
        .route("/api/v1/checkin", post(routes::checkin::checkin))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // 64 KB limit

    tracing::info!("Starting gatepass on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
