use gatepass::{
    config::AppConfig,
    db,
    services::queue::BookingQueue,
    services::worker,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL_MS: u64 = 1000; // 1 second
const REAPER_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting booking worker");

    // Scrape endpoint for the worker-side counters (confirmed/failed jobs,
    // queue depth, transaction timing)
    PrometheusBuilder::new()
        .install()
        .expect("Failed to install Prometheus metrics exporter");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Initialize queue
    tracing::info!("Connecting to Redis booking queue");
    let queue = Arc::new(
        BookingQueue::new(&config.redis_url).expect("Failed to initialize booking queue"),
    );

    // Stall reaper and job garbage collection run alongside the main loop
    {
        let pool = db_pool.clone();
        let queue = queue.clone();
        let config = config.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(REAPER_INTERVAL_SECS)).await;
                if let Err(e) = worker::reap_once(&pool, &queue, &config).await {
                    tracing::error!(error = %e, "Stall reaper pass failed");
                }
            }
        });
    }

    tracing::info!("Worker ready, starting job processing loop");

    loop {
        match worker::process_next_booking(&db_pool, &queue, &config).await {
            Ok(true) => {
                tracing::debug!("Job processed, checking for next job");
            }
            Ok(false) => {
                tracing::trace!("No jobs available, sleeping");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Error processing job, will retry");
                sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        }
    }
}
