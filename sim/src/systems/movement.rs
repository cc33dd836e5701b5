//! Unit control - animation, steering and attack/shoot triggers.
//!
//! ## Data Access
//! - Reads: Team, Position, Body
//! - Writes: Velocity, Acceleration, Height, Unit
//! - Spawns: projectiles through the kind's `on_shoot` hook
//!
//! While the battle is in Prepare, units only play their idle animation.

use crate::battle::Battle;
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::math::Vec2;
use crate::systems::clock::SimClock;
use crate::unit_data::{ShotRequest, UnitBehaviors, UnitKind};
use crate::world::{CosmeticEvent, EventBuffer};
use bevy_ecs::prelude::*;
use rand::Rng;

/// Targets closer than this count as reached.
const ARRIVAL_DISTANCE: f32 = 4.0;

/// Shots need the target beyond this multiple of the raw shoot range factor.
const MIN_SHOOT_FACTOR: f32 = 0.3;

/// Top speed for a unit of `kind` with the given radius.
pub fn max_speed(kind: UnitKind, radius: f32, slowed: bool) -> f32 {
    let speed = radius * kind.data().speed_factor;
    if slowed {
        speed / 1000.0
    } else if kind.is_ranged_mover() {
        speed / 100.0
    } else {
        speed / 200.0
    }
}

/// Whether `distance` lies inside the kind's shoot band.
pub fn in_shoot_band(kind: UnitKind, radius: f32, distance: f32) -> bool {
    let data = kind.data();
    data.can_shoot()
        && distance > data.shoot_range_factor * MIN_SHOOT_FACTOR
        && distance < radius * data.shoot_range_factor
}

pub fn unit_control_system(
    battle: Res<Battle>,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    behaviors: Res<UnitBehaviors>,
    mut rng: ResMut<SimRng>,
    mut ids: ResMut<IdAllocator>,
    mut events: ResMut<EventBuffer>,
    mut commands: Commands,
    mut units: Query<
        (
            Entity,
            &Team,
            &Position,
            &Body,
            &mut Velocity,
            &mut Acceleration,
            &mut Height,
            &mut Unit,
        ),
        Without<Destroyed>,
    >,
) {
    if battle.is_preparing() {
        for (.., mut unit) in units.iter_mut() {
            unit.anim.advance();
        }
        return;
    }
    let now = clock.time;

    for (entity, team, pos, body, mut vel, mut acc, mut height, mut unit) in units.iter_mut() {
        let kind = unit.kind;
        let data = kind.data();
        let radius = body.radius();

        unit.anim.advance();

        if unit.winner && height.z == 0.0 && rng.0.gen::<f32>() > 0.5 {
            height.vz += body.size.y / 8.0;
        }
        height.vz -= config.gravity;
        height.z = (height.z + height.vz).max(0.0);
        if height.z < 1.0 {
            height.vz = 0.0;
        }

        let in_band = unit
            .target
            .is_some_and(|t| in_shoot_band(kind, radius, pos.distance(t)));
        let slowed = in_band && kind.slows_in_range();
        unit.max_speed = max_speed(kind, radius, slowed);
        if slowed {
            vel.0 *= 0.5;
            acc.0 *= 0.5;
        }

        if let Some(target) = unit.target {
            let distance = pos.distance(target);
            unit.heading = pos.heading_to(target);
            acc.0 += Vec2::from_angle(unit.heading, unit.max_speed.min(distance));
            if distance < ARRIVAL_DISTANCE {
                unit.clear_target();
            }
        }

        let behavior = behaviors.get(kind);
        if let Some(target) = unit.target {
            if pos.distance(target) < radius * data.attack_range_factor && !unit.attack_cooldown.active(now) {
                (behavior.on_attack)(&mut unit, data, now);
            }
        }

        let Some(shoot) = behavior.on_shoot else {
            continue;
        };
        let Some(target) = unit.target else {
            continue;
        };
        if !in_band || unit.shoot_cooldown.active(now) {
            continue;
        }
        let shot = ShotRequest {
            origin: pos.0,
            target,
            damage: data.shoot_damage,
            speed: data.projectile_speed,
            size_factor: config.size_factor,
        };
        let launch = shoot(&shot, &mut rng);
        commands.spawn(launch.into_bundle(ids.next_id(), *team, Some(entity)));
        unit.shoot_cooldown.set(now, data.shoot_cooldown);
        events.push(CosmeticEvent::ArrowShot { x: pos.x, y: pos.y });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattleStatus;

    fn setup_world(status: BattleStatus) -> World {
        let mut world = World::new();
        world.insert_resource(Battle {
            status,
            ..Default::default()
        });
        let mut clock = SimClock::new(1.0 / 60.0);
        clock.advance();
        world.insert_resource(clock);
        world.insert_resource(SimConfig::default());
        world.insert_resource(UnitBehaviors::default());
        world.insert_resource(SimRng::from_seed(5));
        world.insert_resource(IdAllocator::default());
        world.insert_resource(EventBuffer::default());
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems(unit_control_system);
        schedule.run(world);
    }

    fn spawn(world: &mut World, kind: UnitKind, target: Option<Vec2>) -> Entity {
        let mut bundle = UnitBundle::new(EntityId(0), kind, Team::Alpha, Vec2::new(100.0, 100.0), 1.0, 0.0);
        bundle.unit.target = target;
        world.spawn(bundle).id()
    }

    #[test]
    fn test_steers_toward_target() {
        let mut world = setup_world(BattleStatus::Fight);
        let troop = spawn(&mut world, UnitKind::Troop, Some(Vec2::new(300.0, 100.0)));

        run(&mut world);

        let acc = world.get::<Acceleration>(troop).unwrap();
        assert!(acc.x > 0.0);
        assert!(acc.y.abs() < 1e-4);
        let unit = world.get::<Unit>(troop).unwrap();
        assert!((unit.max_speed - 28.284271 / 200.0).abs() < 1e-4);
    }

    #[test]
    fn test_close_target_triggers_attack() {
        let mut world = setup_world(BattleStatus::Fight);
        let troop = spawn(&mut world, UnitKind::Troop, Some(Vec2::new(130.0, 100.0)));

        run(&mut world);

        let unit = world.get::<Unit>(troop).unwrap();
        assert!(unit.anim.is_attacking());
        assert!(unit.attack_cooldown.is_set());
    }

    #[test]
    fn test_reaching_target_clears_it() {
        let mut world = setup_world(BattleStatus::Fight);
        let troop = spawn(&mut world, UnitKind::Troop, Some(Vec2::new(102.0, 100.0)));

        run(&mut world);

        assert!(world.get::<Unit>(troop).unwrap().target.is_none());
    }

    #[test]
    fn test_archer_shoots_inside_band() {
        let mut world = setup_world(BattleStatus::Fight);
        // Shoot range is 10 radii, about 283 units.
        let archer = spawn(&mut world, UnitKind::Archer, Some(Vec2::new(300.0, 100.0)));

        run(&mut world);

        let mut arrows = world.query::<(&Projectile, &Team)>();
        let fired: Vec<_> = arrows.iter(&world).collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0.kind, ProjectileKind::Arrow);
        assert_eq!(fired[0].0.owner, Some(archer));
        assert_eq!(*fired[0].1, Team::Alpha);
        let unit = world.get::<Unit>(archer).unwrap();
        assert!(unit.shoot_cooldown.active(0.3));
        assert!((unit.max_speed - 28.284271 * 0.2 / 1000.0).abs() < 1e-5);
    }

    #[test]
    fn test_archer_out_of_band_holds_fire() {
        let mut world = setup_world(BattleStatus::Fight);
        spawn(&mut world, UnitKind::Archer, Some(Vec2::new(700.0, 100.0)));

        run(&mut world);

        let mut arrows = world.query::<&Projectile>();
        assert_eq!(arrows.iter(&world).count(), 0);
    }

    #[test]
    fn test_prepare_only_animates() {
        let mut world = setup_world(BattleStatus::Prepare);
        let troop = spawn(&mut world, UnitKind::Troop, Some(Vec2::new(130.0, 100.0)));

        run(&mut world);

        let unit = world.get::<Unit>(troop).unwrap();
        assert_eq!(unit.anim, AnimPhase::Idle { frame: 1 });
        assert_eq!(world.get::<Acceleration>(troop).unwrap().0, Vec2::ZERO);
    }

    #[test]
    fn test_winner_hops_and_lands() {
        let mut world = setup_world(BattleStatus::Ended);
        let troop = spawn(&mut world, UnitKind::Troop, None);
        world.get_mut::<Unit>(troop).unwrap().winner = true;

        let mut peak: f32 = 0.0;
        for _ in 0..200 {
            run(&mut world);
            peak = peak.max(world.get::<Height>(troop).unwrap().z);
        }
        assert!(peak > 0.0);
        assert!(world.get::<Height>(troop).unwrap().z >= 0.0);
    }
}
