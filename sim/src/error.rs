//! Errors returned by host-facing commands.
//!
//! The per-tick simulation itself never fails; only commands the host issues
//! between ticks (placement, phase changes, configuration) can be refused.

use crate::battle::BattleStatus;
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("command not allowed while the battle is {actual:?} (expected {expected:?})")]
    WrongPhase {
        expected: BattleStatus,
        actual: BattleStatus,
    },

    #[error("position ({x}, {y}) is outside the placement zone")]
    OutsidePlacementZone { x: f32, y: f32 },

    #[error("not enough gold: need {needed}, have {available}")]
    InsufficientGold { needed: u32, available: u32 },

    #[error("a unit already occupies the cell at ({x}, {y})")]
    PlaceOccupied { x: f32, y: f32 },

    #[error("unit kind {0} is not available on this level")]
    KindLocked(&'static str),

    #[error("level index {0} does not exist")]
    UnknownLevel(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
