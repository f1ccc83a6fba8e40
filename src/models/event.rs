use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event record. Metadata is owned by the event catalog; this subsystem
/// only mutates `registration_count`, and only through the seat ledger's
/// conditional update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub mode: EventMode,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub description: String,
    pub is_live: bool,
    pub total_seats: i32,
    pub registration_count: i32,
}

impl Event {
    pub fn remaining_seats(&self) -> i32 {
        self.total_seats - self.registration_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventMode {
    Offline,
    Online,
}
