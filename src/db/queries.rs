//! booking_jobs persistence. Job rows back status polling and the stall
//! reaper; the Redis queue carries the work items themselves.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::job::{BookingJob, JobState};

/// Insert a new booking job in the waiting state.
pub async fn create_job(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<BookingJob, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO booking_jobs (user_id, event_id)
        VALUES ($1, $2)
        RETURNING id, user_id, event_id, state, attempt, stall_count,
                  failure_reason, pass_id, enqueued_at, claimed_at, not_before,
                  finished_at
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by id.
pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<BookingJob>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, event_id, state, attempt, stall_count,
               failure_reason, pass_id, enqueued_at, claimed_at, not_before,
               finished_at
        FROM booking_jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| job_from_row(&r)).transpose()
}

/// Most recent job for a (user, event) pair, for status polling.
pub async fn get_latest_job(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<Option<BookingJob>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, event_id, state, attempt, stall_count,
               failure_reason, pass_id, enqueued_at, claimed_at, not_before,
               finished_at
        FROM booking_jobs
        WHERE user_id = $1 AND event_id = $2
        ORDER BY enqueued_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| job_from_row(&r)).transpose()
}

/// Mark a job claimed by a worker. The claim timestamp drives stall detection.
pub async fn claim_job(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'active', claimed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a successful booking: terminal state plus the issued pass id.
pub async fn complete_job(pool: &PgPool, job_id: Uuid, pass_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'completed', pass_id = $2, finished_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(pass_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Record a terminal failure with its reason.
pub async fn fail_job(pool: &PgPool, job_id: Uuid, reason: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'failed', failure_reason = $2, finished_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

/// Put a job back in the waiting state with no hold-off (stall recovery).
pub async fn requeue_job(pool: &PgPool, job_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'waiting', claimed_at = NULL, not_before = NULL
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Put a job back in the waiting state with a retry hold-off. The worker
/// skips deferred jobs until `not_before` passes, so the backoff never
/// parks a worker on a sleep.
pub async fn defer_job(
    pool: &PgPool,
    job_id: Uuid,
    delay_secs: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'waiting', claimed_at = NULL,
            not_before = NOW() + make_interval(secs => $2)
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(delay_secs)
    .execute(pool)
    .await?;
    Ok(())
}

/// Increment the attempt counter after a transient failure.
pub async fn increment_attempt(pool: &PgPool, job_id: Uuid) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE booking_jobs
        SET attempt = attempt + 1
        WHERE id = $1
        RETURNING attempt
        "#,
    )
    .bind(job_id)
    .fetch_one(pool)
    .await?;

    row.try_get("attempt")
}

/// Claimed jobs with no progress for longer than the stall timeout, plus
/// stalled rows left behind by a reaper pass that died before re-driving
/// them; those would otherwise read as pending forever.
pub async fn find_stalled_jobs(
    pool: &PgPool,
    stall_timeout_secs: u64,
) -> Result<Vec<BookingJob>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, event_id, state, attempt, stall_count,
               failure_reason, pass_id, enqueued_at, claimed_at, not_before,
               finished_at
        FROM booking_jobs
        WHERE (state = 'active' AND claimed_at < NOW() - make_interval(secs => $1))
           OR state = 'stalled'
        ORDER BY enqueued_at ASC
        "#,
    )
    .bind(stall_timeout_secs as f64)
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Flag a job as stalled, returning how many times it has stalled so far.
/// The reaper requeues on the first stall and fails the job on the second.
/// Guarded on the active state: a worker may finish the job between the
/// stall scan and this update, and a finished row must stay finished.
/// Returns None when the job was no longer active.
pub async fn mark_stalled(pool: &PgPool, job_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE booking_jobs
        SET state = 'stalled', stall_count = stall_count + 1, claimed_at = NULL
        WHERE id = $1 AND state = 'active'
        RETURNING stall_count
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| r.try_get("stall_count")).transpose()
}

/// Garbage-collect terminal job rows past the retention window.
pub async fn delete_finished_jobs(
    pool: &PgPool,
    retention_secs: u64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM booking_jobs
        WHERE state IN ('completed', 'failed')
          AND finished_at < NOW() - make_interval(secs => $1)
        "#,
    )
    .bind(retention_secs as f64)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

fn job_from_row(row: &PgRow) -> Result<BookingJob, sqlx::Error> {
    let state_str: String = row.try_get("state")?;
    let state: JobState = state_str
        .parse()
        .map_err(|e: strum::ParseError| sqlx::Error::Decode(Box::new(e)))?;

    Ok(BookingJob {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        event_id: row.try_get("event_id")?,
        state,
        attempt: row.try_get("attempt")?,
        stall_count: row.try_get("stall_count")?,
        failure_reason: row.try_get("failure_reason")?,
        pass_id: row.try_get("pass_id")?,
        enqueued_at: row.try_get("enqueued_at")?,
        claimed_at: row.try_get("claimed_at")?,
        not_before: row.try_get("not_before")?,
        finished_at: row.try_get("finished_at")?,
    })
}
