//! Targeting - picks an enemy position for idle units.
//!
//! ## Data Access
//! - Reads: Team, Position, Body, Unit (roster pass)
//! - Writes: Unit (target, target_ttl)
//!
//! Only units without a target whose attack cooldown is not running are
//! considered. The eligible list is shuffled and capped each tick so a large
//! army spreads its scans over several ticks.

use crate::battle::Battle;
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::math::Vec2;
use crate::systems::clock::SimClock;
use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// Picks the position to chase from `roster`, or `None`.
///
/// Most kinds take the nearest hostile within `vision`. Units that prefer far
/// targets take the farthest hostile within `reach` instead.
pub fn pick_target(
    team: Team,
    position: Vec2,
    vision: f32,
    prefer_far: bool,
    reach: f32,
    roster: &[(Team, Vec2)],
) -> Option<Vec2> {
    let hostiles = roster
        .iter()
        .filter(|(other, _)| team.is_hostile_to(*other))
        .map(|(_, pos)| (*pos, position.distance(*pos)));

    if prefer_far {
        hostiles
            .filter(|(_, d)| *d < reach)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(pos, _)| pos)
    } else {
        hostiles
            .filter(|(_, d)| *d < vision)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(pos, _)| pos)
    }
}

pub fn targeting_system(
    battle: Res<Battle>,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    mut rng: ResMut<SimRng>,
    mut units: Query<(Entity, &EntityId, &Team, &Position, &Body, &mut Unit), Without<Destroyed>>,
) {
    if battle.is_preparing() {
        return;
    }
    let now = clock.time;

    let roster: Vec<(Team, Vec2)> = units.iter().map(|(_, _, team, pos, _, _)| (*team, pos.0)).collect();

    let mut eligible: Vec<(EntityId, Entity)> = units
        .iter()
        .filter(|(_, _, _, _, _, unit)| unit.target.is_none() && !unit.attack_cooldown.active(now))
        .map(|(entity, id, ..)| (*id, entity))
        .collect();
    eligible.sort_unstable_by_key(|(id, _)| *id);
    eligible.shuffle(&mut rng.0);
    eligible.truncate(config.targeting_cap);

    let (lo, hi) = config.target_memory_ms;
    for (_, entity) in eligible {
        let Ok((_, _, team, pos, body, mut unit)) = units.get_mut(entity) else {
            continue;
        };
        let reach = body.radius() * unit.kind.data().shoot_range_factor;
        let found = pick_target(
            *team,
            pos.0,
            unit.vision_range,
            unit.kind.prefers_far_targets(),
            reach,
            &roster,
        );
        match found {
            Some(target) => {
                let memory_ms = if hi > lo { rng.0.gen_range(lo..hi) } else { lo };
                unit.target = Some(target);
                unit.target_ttl = config.ticks_for(memory_ms / 1000.0).max(1);
            }
            None => unit.clear_target(),
        }
    }
}
