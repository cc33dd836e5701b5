//! Destruction system - removes dead or spent entities.
//!
//! ## Data Access
//! - Reads: Team, Position, Body, Health, Unit, Destroyed
//! - Writes: Battle (kill tally), EventBuffer
//! - Despawns: every entity with zero health or a `Destroyed` marker
//!
//! A unit reaching zero health fires its death callback exactly once: the
//! kill is tallied for the opposing side and cosmetic events are raised.
//! A dying Artillery piece also fires a last volley of cannonballs around
//! itself.

use crate::battle::Battle;
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::math::Vec2;
use crate::unit_data::{shoot_cannonball, ShotRequest, UnitKind};
use crate::world::{CosmeticEvent, EventBuffer};
use bevy_ecs::prelude::*;
use rand::Rng;

/// Death barrage cannonballs land within this distance of the dead gun.
const BARRAGE_SPREAD: f32 = 60.0;

pub fn destruction_system(
    config: Res<SimConfig>,
    mut battle: ResMut<Battle>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut events: ResMut<EventBuffer>,
    mut commands: Commands,
    query: Query<(Entity, &EntityId, &Team, &Position, &Health, Option<&Unit>, Has<Destroyed>)>,
) {
    let mut dying: Vec<_> = query
        .iter()
        .filter(|(_, _, _, _, health, _, destroyed)| *destroyed || !health.is_alive())
        .collect();
    dying.sort_unstable_by_key(|(_, id, ..)| **id);

    for (entity, _, team, pos, _, unit, destroyed) in dying {
        if let (Some(unit), false) = (unit, destroyed) {
            on_unit_death(
                *team,
                pos.0,
                unit,
                &config,
                &mut battle,
                &mut rng,
                &mut ids,
                &mut events,
                &mut commands,
            );
        }
        commands.entity(entity).despawn();
    }
}

#[allow(clippy::too_many_arguments)]
fn on_unit_death(
    team: Team,
    pos: Vec2,
    unit: &Unit,
    config: &SimConfig,
    battle: &mut Battle,
    rng: &mut SimRng,
    ids: &mut IdAllocator,
    events: &mut EventBuffer,
    commands: &mut Commands,
) {
    match team {
        Team::Alpha => battle.kills.bravo += 1,
        Team::Bravo => {
            battle.kills.alpha += 1;
            events.push(CosmeticEvent::KillLabel {
                x: pos.x,
                y: pos.y,
                text: "+1".to_string(),
            });
        }
        Team::None => {}
    }
    events.push(CosmeticEvent::Blood { x: pos.x, y: pos.y });
    log::debug!("{:?} {} fell at ({:.0}, {:.0})", team, unit.kind.name(), pos.x, pos.y);

    if unit.kind == UnitKind::Artillery {
        let data = unit.kind.data();
        let shells = rng.0.gen_range(2..4);
        for _ in 0..shells {
            let offset = Vec2::new(
                rng.0.gen_range(-BARRAGE_SPREAD..BARRAGE_SPREAD),
                rng.0.gen_range(-BARRAGE_SPREAD..BARRAGE_SPREAD),
            );
            let shot = ShotRequest {
                origin: pos,
                target: pos + offset,
                damage: data.shoot_damage,
                speed: data.projectile_speed,
                size_factor: config.size_factor,
            };
            let launch = shoot_cannonball(&shot, rng);
            commands.spawn(launch.into_bundle(ids.next_id(), team, None));
        }
    }
}
