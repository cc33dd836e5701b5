//! Battle end-condition system.
//!
//! ## Data Access
//! - Reads: Team, SimClock, SimConfig
//! - Writes: Battle, Unit (winner flag)
//!
//! Runs last in the tick, after dead entities are gone. During a fight it
//! watches both sides: once either is empty it arms the grace timer and sets
//! every survivor celebrating. The battle ends when the grace timer or the
//! level timer runs out. After the end it counts down to the summary screen.

use crate::battle::{Battle, BattleReport, BattleResult, BattleStatus};
use crate::components::*;
use crate::config::SimConfig;
use crate::systems::clock::SimClock;
use bevy_ecs::prelude::*;

/// Live units per side.
pub fn count_teams<'a>(teams: impl Iterator<Item = &'a Team>) -> (usize, usize) {
    teams.fold((0, 0), |(alpha, bravo), team| match team {
        Team::Alpha => (alpha + 1, bravo),
        Team::Bravo => (alpha, bravo + 1),
        Team::None => (alpha, bravo),
    })
}

pub fn battle_end_system(
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    mut battle: ResMut<Battle>,
    mut units: Query<(&Team, &mut Unit), Without<Destroyed>>,
) {
    let now = clock.time;
    match battle.status {
        BattleStatus::Prepare => {}
        BattleStatus::Fight => {
            let (alpha, bravo) = count_teams(units.iter().map(|(team, _)| team));

            if (alpha == 0 || bravo == 0) && !battle.grace_timer.is_set() {
                battle.grace_timer.set(now, config.grace_delay);
                for (_, mut unit) in units.iter_mut() {
                    unit.winner = true;
                }
                log::info!("side wiped out (alpha {}, bravo {}), result in {}s", alpha, bravo, config.grace_delay);
            }

            if battle.grace_timer.elapsed(now) || battle.level_timer.elapsed(now) {
                let report = BattleReport {
                    result: BattleResult::decide(alpha, bravo),
                    team_a_count: alpha as u32,
                    team_b_count: bravo as u32,
                    team_a_cost: battle.team_a_cost,
                    team_b_cost: battle.team_b_cost,
                    kills: battle.kills,
                    team_a_begin_count: battle.team_a_begin_count,
                    team_b_begin_count: battle.team_b_begin_count,
                };
                log::info!(
                    "battle ended: {:?} ({} vs {}, kills {}/{})",
                    report.result,
                    alpha,
                    bravo,
                    report.kills.alpha,
                    report.kills.bravo
                );
                battle.status = BattleStatus::Ended;
                battle.report = Some(report);
                battle.summary_countdown = Some(config.ticks_for(config.summary_delay));
            }
        }
        BattleStatus::Ended => match battle.summary_countdown {
            Some(0) | Some(1) => {
                battle.summary_countdown = None;
                battle.summary_due = true;
            }
            Some(n) => battle.summary_countdown = Some(n - 1),
            None => {}
        },
    }
}
