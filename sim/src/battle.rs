//! Battle phase state and results.
//!
//! A battle starts in [`BattleStatus::Prepare`], where the player places
//! units. `fight()` moves it to [`BattleStatus::Fight`]; the end-condition
//! system moves it to [`BattleStatus::Ended`] and publishes a
//! [`BattleReport`]. Only `restart` leaves Ended.

use crate::timer::Timer;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleStatus {
    #[default]
    Prepare,
    Fight,
    Ended,
}

/// Outcome from Alpha's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleResult {
    Win,
    Loss,
    #[default]
    Tie,
}

impl BattleResult {
    /// Both sides gone is a tie, only Bravo gone is a win, anything else a loss.
    pub fn decide(alpha_alive: usize, bravo_alive: usize) -> Self {
        match (alpha_alive, bravo_alive) {
            (0, 0) => BattleResult::Tie,
            (_, 0) => BattleResult::Win,
            _ => BattleResult::Loss,
        }
    }
}

/// Kills scored by each side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kills {
    pub alpha: u32,
    pub bravo: u32,
}

/// Published once when the battle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReport {
    pub result: BattleResult,
    pub team_a_count: u32,
    pub team_b_count: u32,
    pub team_a_cost: u32,
    pub team_b_cost: u32,
    pub kills: Kills,
    pub team_a_begin_count: u32,
    pub team_b_begin_count: u32,
}

/// Phase, timers and bookkeeping of the current battle.
#[derive(Resource, Debug, Clone, Default)]
pub struct Battle {
    pub status: BattleStatus,
    pub level: Option<usize>,
    /// Gold left for placing Alpha units.
    pub gold: u32,
    /// Hard time limit of the fight.
    pub level_timer: Timer,
    /// Armed once when a side is wiped out.
    pub grace_timer: Timer,
    pub kills: Kills,
    pub team_a_cost: u32,
    pub team_b_cost: u32,
    pub team_a_begin_count: u32,
    pub team_b_begin_count: u32,
    pub report: Option<BattleReport>,
    /// Ticks until the host should show the summary screen.
    pub summary_countdown: Option<u32>,
    pub summary_due: bool,
}

impl Battle {
    pub fn is_preparing(&self) -> bool {
        self.status == BattleStatus::Prepare
    }

    pub fn is_fighting(&self) -> bool {
        self.status == BattleStatus::Fight
    }

    /// Back to a fresh Prepare phase, dropping every pending countdown.
    pub fn reset(&mut self) {
        let level = self.level;
        *self = Battle {
            level,
            ..Battle::default()
        };
    }
}
