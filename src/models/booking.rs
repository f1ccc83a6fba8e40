use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{BookingJob, JobState};
use crate::models::pass::PassStatus;

/// Request to book a seat at an event.
#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub event_id: Uuid,
}

/// Acknowledgment returned by the booking endpoint. The reservation itself
/// runs asynchronously; clients poll the status endpoint for the outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingAccepted {
    pub job_id: Uuid,
    pub status: String,
}

/// Client-facing booking status, derived from the pass ledger and the
/// job table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    NotFound,
    Pending,
    Confirmed,
    Failed,
}

impl BookingStatus {
    /// Classify a (user, event) pair. First match wins: a live pass means
    /// the booking committed regardless of what the job table says; an
    /// in-flight job means the outcome is not decided yet; a failed job
    /// carries the definitive reason; anything else was never booked.
    pub fn classify(pass_status: Option<PassStatus>, job: Option<&BookingJob>) -> Self {
        if let Some(status) = pass_status {
            if matches!(status, PassStatus::Active | PassStatus::Confirmed) {
                return BookingStatus::Confirmed;
            }
        }
        match job {
            Some(job) if job.state.is_in_flight() => BookingStatus::Pending,
            Some(job) if job.state == JobState::Failed => BookingStatus::Failed,
            _ => BookingStatus::NotFound,
        }
    }
}

/// Response for the booking status endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookingStatusResponse {
    pub event_id: Uuid,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(state: JobState) -> BookingJob {
        BookingJob {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            state,
            attempt: 0,
            stall_count: 0,
            failure_reason: None,
            pass_id: None,
            enqueued_at: Utc::now(),
            claimed_at: None,
            not_before: None,
            finished_at: None,
        }
    }

    #[test]
    fn live_pass_wins_over_job_state() {
        let failed = job(JobState::Failed);
        assert_eq!(
            BookingStatus::classify(Some(PassStatus::Active), Some(&failed)),
            BookingStatus::Confirmed
        );
        assert_eq!(
            BookingStatus::classify(Some(PassStatus::Confirmed), None),
            BookingStatus::Confirmed
        );
    }

    #[test]
    fn expired_pass_does_not_confirm() {
        assert_eq!(
            BookingStatus::classify(Some(PassStatus::Expired), None),
            BookingStatus::NotFound
        );
        let waiting = job(JobState::Waiting);
        assert_eq!(
            BookingStatus::classify(Some(PassStatus::Expired), Some(&waiting)),
            BookingStatus::Pending
        );
    }

    #[test]
    fn in_flight_job_is_pending() {
        for state in [JobState::Waiting, JobState::Active, JobState::Stalled] {
            let j = job(state);
            assert_eq!(BookingStatus::classify(None, Some(&j)), BookingStatus::Pending);
        }
    }

    #[test]
    fn failed_job_is_failed() {
        let j = job(JobState::Failed);
        assert_eq!(BookingStatus::classify(None, Some(&j)), BookingStatus::Failed);
    }

    #[test]
    fn completed_job_without_pass_is_not_found() {
        // After the retention window deletes the pass-backed job row the
        // pass alone answers; a completed job with no visible pass reads
        // as not found rather than lying about confirmation.
        let j = job(JobState::Completed);
        assert_eq!(BookingStatus::classify(None, Some(&j)), BookingStatus::NotFound);
    }

    #[test]
    fn nothing_is_not_found() {
        assert_eq!(BookingStatus::classify(None, None), BookingStatus::NotFound);
    }
}
