use jsonwebtoken::DecodingKey;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::queue::BookingQueue;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<BookingQueue>,
    pub jwt_key: DecodingKey,
}

impl AppState {
    pub fn new(db: PgPool, queue: BookingQueue, jwt_secret: &str) -> Self {
        Self {
            db,
            queue: Arc::new(queue),
            jwt_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }
}
