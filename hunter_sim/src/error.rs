// Error types of the simulation.
//
// `MoveError` is a rejected move: the containing transaction (and any block
// including it) is invalid, but nothing was mutated. `StepError` wraps move
// rejections for a whole block and adds the two failures that are not the
// input's fault: a treasure amount that cannot be split among the harvest
// areas, and broken internal invariants (coin conservation). The latter are
// fatal: the computed state must not be accepted.

use crate::types::{Amount, PlayerId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    #[error("invalid player name {0:?}")]
    InvalidPlayerName(String),
    #[error("malformed move JSON: {0}")]
    Json(String),
    #[error("move must be a JSON object")]
    NotAnObject,
    #[error("unrecognized field {0:?}")]
    UnknownField(String),
    #[error("field {0:?} has the wrong type")]
    WrongType(String),
    #[error("invalid team color {0}")]
    InvalidColor(i64),
    #[error("invalid character index {0:?}")]
    InvalidCharacterIndex(String),
    #[error("invalid waypoints: {0}")]
    InvalidWaypoints(&'static str),
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
    #[error("spawn move for existing player {0}")]
    SpawnForExistingPlayer(PlayerId),
    #[error("player {0} does not exist")]
    UnknownPlayer(PlayerId),
    #[error("game fee {paid} is below the required {required}")]
    InsufficientFee { paid: Amount, required: Amount },
    #[error("character {0} cannot get waypoints and destruct in one move")]
    WaypointsWithDestruct(u32),
}

impl From<serde_json::Error> for MoveError {
    fn from(e: serde_json::Error) -> Self {
        MoveError::Json(e.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("invalid move of {player}: {source}")]
    InvalidMove {
        player: PlayerId,
        #[source]
        source: MoveError,
    },
    #[error("more than one move for player {0}")]
    DuplicateMove(PlayerId),
    #[error("treasure {0} cannot be split exactly among the harvest areas")]
    TreasureSplit(Amount),
    #[error("coin balance mismatch: {money_in} in, {money_out} out")]
    BalanceMismatch { money_in: Amount, money_out: Amount },
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl StepError {
    /// Whether this failure indicates a bug in the engine rather than bad
    /// input. Fatal errors must stop block processing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StepError::BalanceMismatch { .. } | StepError::InvariantViolation(_)
        )
    }
}
