use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an issued pass.
///
/// At most one pass per (user, event) may be in a live status
/// (`pending`, `active` or `confirmed`); `expired` passes do not block
/// rebooking. Enforced by a partial unique index in the pass ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PassStatus {
    Pending,
    Active,
    Confirmed,
    Expired,
}

/// A ticket issued by the booking worker inside the reservation transaction.
/// Scan fields are mutated only by the check-in gate afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pass {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub status: PassStatus,
    pub is_scanned: bool,
    pub is_inside: bool,
    pub time_scanned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
