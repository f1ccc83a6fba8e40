//! Seat ledger and pass ledger.
//!
//! The seat check-and-increment is a single conditional UPDATE evaluated by
//! PostgreSQL, so concurrent bookings for the same event can never both pass
//! the capacity check. Pass issuance runs in the same transaction, so a
//! reservation without a pass (or the reverse) is never visible outside it.

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::models::event::{Event, EventMode};
use crate::models::pass::{Pass, PassStatus};

/// Outcome of the seat ledger's conditional increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    NoCapacity,
    EventNotFound,
}

/// Outcome of pass issuance against the uniqueness constraint.
#[derive(Debug)]
pub enum IssueOutcome {
    Issued(Pass),
    AlreadyBooked,
}

/// Terminal outcome of one booking transaction.
#[derive(Debug)]
pub enum BookingOutcome {
    Confirmed(Pass),
    SoldOut,
    DuplicateBooking,
    EventNotFound,
}

impl BookingOutcome {
    /// Reason string recorded on the job row for definitive failures.
    pub fn failure_reason(&self) -> Option<&'static str> {
        match self {
            BookingOutcome::Confirmed(_) => None,
            BookingOutcome::SoldOut => Some("sold out"),
            BookingOutcome::DuplicateBooking => Some("duplicate booking"),
            BookingOutcome::EventNotFound => Some("event not found"),
        }
    }
}

/// Increment the registration count iff a seat remains. Check and increment
/// are one indivisible statement; zero rows affected means either the event
/// is full or it does not exist, disambiguated with a follow-up read.
pub async fn reserve_seat(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> Result<ReserveOutcome, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE events
        SET registration_count = registration_count + 1
        WHERE id = $1 AND registration_count < total_seats
        "#,
    )
    .bind(event_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(ReserveOutcome::Reserved);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Ok(ReserveOutcome::NoCapacity)
    } else {
        Ok(ReserveOutcome::EventNotFound)
    }
}

/// Compensating action for a reservation whose pass issuance failed.
pub async fn release_seat(conn: &mut PgConnection, event_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE events
        SET registration_count = registration_count - 1
        WHERE id = $1 AND registration_count > 0
        "#,
    )
    .bind(event_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Insert a pass for (user, event). `ON CONFLICT DO NOTHING` against the
/// partial unique index keeps the transaction healthy on the duplicate
/// branch so the caller can still run the seat compensation.
pub async fn issue_pass(
    conn: &mut PgConnection,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<IssueOutcome, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO passes (user_id, event_id, status)
        VALUES ($1, $2, 'active')
        ON CONFLICT (user_id, event_id)
            WHERE status IN ('pending', 'active', 'confirmed')
            DO NOTHING
        RETURNING id, user_id, event_id, status, is_scanned, is_inside,
                  time_scanned, created_at
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(r) => Ok(IssueOutcome::Issued(pass_from_row(&r)?)),
        None => Ok(IssueOutcome::AlreadyBooked),
    }
}

/// Execute one booking transaction: reserve a seat, then issue the pass,
/// committing both together or neither. The reservation here is the sole
/// capacity gate; no other step re-checks seats.
pub async fn book(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<BookingOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    match reserve_seat(&mut tx, event_id).await? {
        ReserveOutcome::EventNotFound => {
            tx.rollback().await?;
            return Ok(BookingOutcome::EventNotFound);
        }
        ReserveOutcome::NoCapacity => {
            tx.rollback().await?;
            return Ok(BookingOutcome::SoldOut);
        }
        ReserveOutcome::Reserved => {}
    }

    match issue_pass(&mut tx, user_id, event_id).await? {
        IssueOutcome::Issued(pass) => {
            tx.commit().await?;
            Ok(BookingOutcome::Confirmed(pass))
        }
        IssueOutcome::AlreadyBooked => {
            // Undo the reservation before aborting.
            release_seat(&mut tx, event_id).await?;
            tx.rollback().await?;
            Ok(BookingOutcome::DuplicateBooking)
        }
    }
}

/// Read the event record the seat ledger mutates. The capacity fields come
/// from the same row the conditional update targets, never a copy.
pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Option<Event>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, name, mode, location, start_time, description, is_live,
               total_seats, registration_count
        FROM events
        WHERE id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        let mode_str: String = r.try_get("mode")?;
        let mode: EventMode = mode_str
            .parse()
            .map_err(|e: strum::ParseError| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Event {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            mode,
            location: r.try_get("location")?,
            start_time: r.try_get("start_time")?,
            description: r.try_get("description")?,
            is_live: r.try_get("is_live")?,
            total_seats: r.try_get("total_seats")?,
            registration_count: r.try_get("registration_count")?,
        })
    })
    .transpose()
}

/// Get a pass by id (for the check-in gate).
pub async fn get_pass(pool: &PgPool, pass_id: Uuid) -> Result<Option<Pass>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, event_id, status, is_scanned, is_inside,
               time_scanned, created_at
        FROM passes
        WHERE id = $1
        "#,
    )
    .bind(pass_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| pass_from_row(&r)).transpose()
}

/// Get the live pass for (user, event), if any. The partial unique index
/// guarantees at most one.
pub async fn get_live_pass(
    pool: &PgPool,
    user_id: Uuid,
    event_id: Uuid,
) -> Result<Option<Pass>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, event_id, status, is_scanned, is_inside,
               time_scanned, created_at
        FROM passes
        WHERE user_id = $1 AND event_id = $2
          AND status IN ('pending', 'active', 'confirmed')
        "#,
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| pass_from_row(&r)).transpose()
}

pub(crate) fn pass_from_row(row: &PgRow) -> Result<Pass, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status: PassStatus = status_str
        .parse()
        .map_err(|e: strum::ParseError| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Pass {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        event_id: row.try_get("event_id")?,
        status,
        is_scanned: row.try_get("is_scanned")?,
        is_inside: row.try_get("is_inside")?,
        time_scanned: row.try_get("time_scanned")?,
        created_at: row.try_get("created_at")?,
    })
}
