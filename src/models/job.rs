use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State of a booking job in the async queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
    Stalled,
}

impl JobState {
    /// A job in flight; status polling reports these as `pending`.
    /// A stalled job is still in flight until the reaper fails it.
    pub fn is_in_flight(self) -> bool {
        matches!(self, JobState::Waiting | JobState::Active | JobState::Stalled)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A booking job row. Created when a booking request is accepted, driven
/// through its lifecycle by the worker, retained briefly after reaching a
/// terminal state for status polling, then garbage-collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub state: JobState,
    pub attempt: i32,
    pub stall_count: i32,
    pub failure_reason: Option<String>,
    pub pass_id: Option<Uuid>,
    pub enqueued_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    /// Earliest time the job may be picked up again; carries retry backoff
    /// without parking a worker on a sleep.
    pub not_before: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
