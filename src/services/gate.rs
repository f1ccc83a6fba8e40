//! Check-in gate: the per-pass enter/exit state machine.
//!
//! A pass starts outside. `enter` is allowed only from outside and stamps the
//! scan fields; `exit` only from inside. Wrong-state attempts are rejected as
//! conflicts, never silently ignored, since a replayed or double scan is a
//! signal the venue staff need to see. The gate never touches the seat
//! ledger; capacity was committed at booking time.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::ledger;
use crate::models::pass::Pass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GateAction {
    Enter,
    Exit,
}

impl GateAction {
    /// Whether this action is legal from the given side of the gate.
    pub fn permitted_from(self, is_inside: bool) -> bool {
        match self {
            GateAction::Enter => !is_inside,
            GateAction::Exit => is_inside,
        }
    }

    /// Conflict message when the action is attempted from the wrong state.
    pub fn rejection(self) -> &'static str {
        match self {
            GateAction::Enter => "pass is already inside the venue",
            GateAction::Exit => "pass is not inside the venue",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("pass not found")]
    PassNotFound,

    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Apply a gate action to a pass. The state guard lives in the UPDATE's
/// WHERE clause, so two replayed scans racing each other cannot both win.
pub async fn scan(pool: &PgPool, pass_id: Uuid, action: GateAction) -> Result<Pass, GateError> {
    let row = match action {
        GateAction::Enter => {
            sqlx::query(
                r#"
                UPDATE passes
                SET is_inside = TRUE, is_scanned = TRUE, time_scanned = NOW()
                WHERE id = $1 AND is_inside = FALSE
                RETURNING id, user_id, event_id, status, is_scanned, is_inside,
                          time_scanned, created_at
                "#,
            )
            .bind(pass_id)
            .fetch_optional(pool)
            .await?
        }
        GateAction::Exit => {
            sqlx::query(
                r#"
                UPDATE passes
                SET is_inside = FALSE
                WHERE id = $1 AND is_inside = TRUE
                RETURNING id, user_id, event_id, status, is_scanned, is_inside,
                          time_scanned, created_at
                "#,
            )
            .bind(pass_id)
            .fetch_optional(pool)
            .await?
        }
    };

    if let Some(row) = row {
        return Ok(ledger::pass_from_row(&row)?);
    }

    // No row updated: either the pass is on the wrong side of the gate or
    // it does not exist at all.
    match ledger::get_pass(pool, pass_id).await? {
        Some(_) => Err(GateError::InvalidTransition(action.rejection())),
        None => Err(GateError::PassNotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_only_from_outside() {
        assert!(GateAction::Enter.permitted_from(false));
        assert!(!GateAction::Enter.permitted_from(true));
    }

    #[test]
    fn exit_only_from_inside() {
        assert!(GateAction::Exit.permitted_from(true));
        assert!(!GateAction::Exit.permitted_from(false));
    }

    #[test]
    fn rejection_messages_name_the_state() {
        assert_eq!(
            GateAction::Enter.rejection(),
            "pass is already inside the venue"
        );
        assert_eq!(GateAction::Exit.rejection(), "pass is not inside the venue");
    }

    #[test]
    fn actions_parse_from_wire_form() {
        assert_eq!("enter".parse::<GateAction>().unwrap(), GateAction::Enter);
        assert_eq!("exit".parse::<GateAction>().unwrap(), GateAction::Exit);
        assert!("reenter".parse::<GateAction>().is_err());
    }
}
