//! Booking worker: drains the queue and runs the reservation transaction.
//!
//! Definitive business failures (sold out, duplicate booking, missing event)
//! are terminal immediately; only storage errors are retried, with bounded
//! exponential backoff. A claimed job that reports no progress within the
//! stall timeout is requeued once by the reaper, then failed.

use chrono::Utc;
use sqlx::PgPool;
use std::time::Duration;

use crate::config::AppConfig;
use crate::db::ledger::{self, BookingOutcome};
use crate::db::queries;
use crate::models::job::JobState;
use crate::services::queue::{BookingQueue, QueueError, QueuedBooking};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Process the next job from the queue.
/// Returns Ok(true) if a job was processed, Ok(false) if no job available.
pub async fn process_next_booking(
    pool: &PgPool,
    queue: &BookingQueue,
    config: &AppConfig,
) -> Result<bool, WorkerError> {
    let job = match queue.dequeue().await? {
        Some(j) => j,
        None => return Ok(false), // No job available
    };

    match queries::get_job(pool, job.job_id).await? {
        None => {
            // Row already garbage-collected; drop the stray payload
            queue.complete(&job).await?;
            return Ok(true);
        }
        Some(row) => {
            // Leftover payload from a crash after the row was finished
            if row.state.is_terminal() {
                queue.complete(&job).await?;
                return Ok(true);
            }
            // Retry hold-off not yet elapsed: park the payload back at the
            // head of the waiting list. Older items still drain from the
            // tail first, so one deferred job never blocks the queue.
            if row.not_before.is_some_and(|t| t > Utc::now()) {
                queue.requeue(&job).await?;
                return Ok(false);
            }
        }
    }

    tracing::info!(
        job_id = %job.job_id,
        user_id = %job.user_id,
        event_id = %job.event_id,
        "Processing booking job"
    );

    // Record the claim; the reaper keys stall detection off this timestamp
    if let Err(e) = queries::claim_job(pool, job.job_id).await {
        tracing::error!(job_id = %job.job_id, error = %e, "Failed to claim job");
        let _ = queue.requeue(&job).await;
        return Err(e.into());
    }

    let start = std::time::Instant::now();
    match ledger::book(pool, job.user_id, job.event_id).await {
        Ok(BookingOutcome::Confirmed(pass)) => {
            metrics::histogram!("booking_transaction_seconds")
                .record(start.elapsed().as_secs_f64());
            queries::complete_job(pool, job.job_id, pass.id).await?;
            queue.complete(&job).await?;

            metrics::counter!("bookings_confirmed_total").increment(1);
            tracing::info!(
                job_id = %job.job_id,
                pass_id = %pass.id,
                event_id = %job.event_id,
                "Booking confirmed"
            );
            Ok(true)
        }
        Ok(outcome) => {
            // Definitive business failure: the outcome will not change on a
            // second attempt, so the retry loop is short-circuited.
            let reason = outcome.failure_reason().unwrap_or("unknown failure");
            queries::fail_job(pool, job.job_id, reason).await?;
            queue.complete(&job).await?;

            metrics::counter!("bookings_failed_total", "reason" => reason).increment(1);
            tracing::info!(
                job_id = %job.job_id,
                user_id = %job.user_id,
                event_id = %job.event_id,
                reason,
                "Booking failed"
            );
            Ok(true)
        }
        Err(e) => {
            // Transient storage failure: bounded retries with backoff
            tracing::error!(job_id = %job.job_id, error = %e, "Booking transaction error");

            let attempt = queries::increment_attempt(pool, job.job_id).await?;

            if attempt >= config.worker_max_attempts {
                queries::fail_job(pool, job.job_id, "storage failure").await?;
                queue.complete(&job).await?;

                metrics::counter!("bookings_failed_total", "reason" => "storage failure")
                    .increment(1);
                tracing::warn!(
                    job_id = %job.job_id,
                    attempt,
                    "Job failed after max attempts"
                );
            } else {
                // The hold-off lives on the job row, not in a sleep here, so
                // the worker moves straight on to the next queued booking.
                let delay = backoff_delay(config.worker_backoff_ms, attempt);
                queries::defer_job(pool, job.job_id, delay.as_secs_f64()).await?;
                queue.requeue(&job).await?;

                tracing::info!(
                    job_id = %job.job_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Job re-queued for retry"
                );
            }

            Ok(true)
        }
    }
}

/// One maintenance pass: requeue jobs that stalled once, fail jobs that
/// stalled twice, garbage-collect terminal rows, refresh the depth gauge.
pub async fn reap_once(
    pool: &PgPool,
    queue: &BookingQueue,
    config: &AppConfig,
) -> Result<(), WorkerError> {
    let stalled = queries::find_stalled_jobs(pool, config.stall_timeout_secs).await?;

    for job in stalled {
        // A stalled row was already counted by an earlier pass that died
        // before re-driving it; only active rows get a fresh increment.
        let stall_count = match job.state {
            JobState::Stalled => job.stall_count,
            _ => match queries::mark_stalled(pool, job.id).await? {
                Some(n) => n,
                // Finished between the scan and the update; leave it be
                None => continue,
            },
        };

        let payload = QueuedBooking {
            job_id: job.id,
            user_id: job.user_id,
            event_id: job.event_id,
        };

        // Queue first, row second: a crash in between leaves the row
        // stalled, and the next sweep repeats both steps. requeue() is
        // idempotent, so the payload never duplicates.
        if stall_count <= 1 {
            // First stall: give the job one more chance
            queue.requeue(&payload).await?;
            queries::requeue_job(pool, job.id).await?;

            tracing::warn!(job_id = %job.id, "Stalled job re-queued");
        } else {
            // Second stall: terminal, no infinite reprocessing
            queue.complete(&payload).await?;
            queries::fail_job(pool, job.id, "stalled").await?;

            metrics::counter!("bookings_failed_total", "reason" => "stalled").increment(1);
            tracing::warn!(job_id = %job.id, "Job failed after repeated stalls");
        }
    }

    let removed = queries::delete_finished_jobs(pool, config.job_retention_secs).await?;
    if removed > 0 {
        tracing::debug!(removed, "Garbage-collected finished booking jobs");
    }

    if let Ok(depth) = queue.queue_depth().await {
        metrics::gauge!("booking_queue_depth").set(depth as f64);
    }

    Ok(())
}

/// Exponential backoff: base, 2x base, 4x base, ...
pub fn backoff_delay(base_ms: u64, attempt: i32) -> Duration {
    let shift = attempt.saturating_sub(1).clamp(0, 16) as u32;
    Duration::from_millis(base_ms.saturating_mul(1 << shift))
}
