use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "gatepass:bookings";
const PROCESSING_KEY: &str = "gatepass:bookings:processing";

/// Booking work item serialized into Redis. The job row in PostgreSQL holds
/// the lifecycle state; this payload is only what a worker needs to run the
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedBooking {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
}

/// Redis-backed durable booking queue. Claimed items move to a processing
/// list (RPOPLPUSH) so they survive a worker crash until the stall reaper
/// requeues or fails them.
pub struct BookingQueue {
    client: redis::Client,
}

impl BookingQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    /// Enqueue a booking job.
    pub async fn enqueue(&self, job: &QueuedBooking) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Claim the next job for processing (move to the processing list).
    pub async fn dequeue(&self) -> Result<Option<QueuedBooking>, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let result: Option<String> = conn
            .rpoplpush(QUEUE_KEY, PROCESSING_KEY)
            .await
            .map_err(QueueError::Redis)?;

        match result {
            Some(payload) => {
                let job: QueuedBooking =
                    serde_json::from_str(&payload).map_err(QueueError::Serialize)?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Drop a job from the processing list once it reached a terminal state.
    pub async fn complete(&self, job: &QueuedBooking) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Move a claimed job back to the waiting list (retry or stall recovery).
    /// Idempotent: any copies already on either list are removed first, so
    /// a reaper pass that crashed mid-way and re-drives the same job never
    /// leaves duplicate payloads behind.
    pub async fn requeue(&self, job: &QueuedBooking) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let payload = serde_json::to_string(job).map_err(QueueError::Serialize)?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 0, &payload)
            .await
            .map_err(QueueError::Redis)?;
        conn.lrem::<_, _, ()>(QUEUE_KEY, 0, &payload)
            .await
            .map_err(QueueError::Redis)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(QueueError::Redis)?;
        Ok(())
    }

    /// Get the current queue depth (waiting jobs).
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(QueueError::Redis)?;
        let depth: u64 = conn.llen(QUEUE_KEY).await.map_err(QueueError::Redis)?;
        Ok(depth)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
