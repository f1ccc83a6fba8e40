use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::db::{ledger, queries};
use crate::models::booking::{
    BookingAccepted, BookingRequest, BookingStatus, BookingStatusResponse,
};
use crate::models::job::JobState;
use crate::services::queue::QueuedBooking;

/// POST /api/v1/bookings — accept a booking request.
///
/// Only records the job and enqueues it; the seat reservation itself runs in
/// the worker, so this handler never blocks on ledger contention and never
/// surfaces ledger errors. Clients poll the status endpoint for the outcome.
pub async fn submit_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingAccepted>), StatusCode> {
    let job = queries::create_job(&state.db, user.user_id, req.event_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create booking job");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let queued = QueuedBooking {
        job_id: job.id,
        user_id: user.user_id,
        event_id: req.event_id,
    };

    if let Err(e) = state.queue.enqueue(&queued).await {
        tracing::error!(job_id = %job.id, error = %e, "Failed to enqueue booking job");
        // Best effort: do not leave the row reading as forever pending.
        let _ = queries::fail_job(&state.db, job.id, "queue unavailable").await;
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    metrics::counter!("bookings_enqueued_total").increment(1);

    tracing::info!(
        job_id = %job.id,
        user_id = %user.user_id,
        event_id = %req.event_id,
        "Booking job accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(BookingAccepted {
            job_id: job.id,
            status: "accepted".to_string(),
        }),
    ))
}

/// GET /api/v1/bookings/{event_id} — booking status for the calling user.
///
/// First match wins: a live pass answers confirmed no matter what the job
/// table says; otherwise the latest job decides pending or failed.
pub async fn booking_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<BookingStatusResponse>, StatusCode> {
    let pass = ledger::get_live_pass(&state.db, user.user_id, event_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to query pass ledger");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let job = queries::get_latest_job(&state.db, user.user_id, event_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to query booking jobs");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let status = BookingStatus::classify(pass.as_ref().map(|p| p.status), job.as_ref());

    let pass_id = match status {
        BookingStatus::Confirmed => pass.map(|p| p.id),
        _ => None,
    };
    let reason = match status {
        BookingStatus::Failed => job
            .as_ref()
            .filter(|j| j.state == JobState::Failed)
            .and_then(|j| j.failure_reason.clone()),
        _ => None,
    };

    Ok(Json(BookingStatusResponse {
        event_id,
        status,
        pass_id,
        reason,
    }))
}
