use serde::Serialize;

pub mod booking;
pub mod checkin;
pub mod health;
pub mod metrics;

/// Error payload shared by the API routes.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
