//! Collision & combat resolver.
//!
//! ## Data Access
//! - Reads: Quadtree, EntityId, Team, Body, Projectile
//! - Writes: Position, Velocity, Acceleration, Health, Armor, Unit, Blast
//!
//! Units are processed one at a time in ascending [`EntityId`] order. For
//! each unit the quadtree yields candidates; every overlapping candidate is
//! resolved against it:
//!
//! 1. **Separation** (unit vs unit) - pushes the pair apart and damps both.
//! 2. **Melee** - a hostile unit in its attack window hurts the processed unit
//!    unless the processed unit is still stunned.
//! 3. **Projectiles** - a hostile arrow hits once and breaks; an explosion
//!    hurts every unit it overlaps, friend or foe.
//!
//! All damage is scaled by the level's damage factor.
//!
//! Kill credit is applied after each pair so the shooter can be borrowed
//! mutably. After its pairs, the unit integrates: acceleration into velocity,
//! drag, edge bounce and snap-back, then velocity into position.

use crate::battle::Battle;
use crate::components::*;
use crate::config::{SimConfig, SplashPolicy};
use crate::math::{Rect, Vec2};
use crate::spatial::{Circle, Quadtree};
use crate::systems::clock::SimClock;
use crate::unit_data::UnitKind;
use crate::world::{CosmeticEvent, EventBuffer};
use bevy_ecs::prelude::*;

/// Stun after any non-lethal hit, in seconds.
const HIT_STUN: f32 = 0.2;
/// Stun after a lethal melee hit.
const KILL_STUN: f32 = 1.0;

const TESTUDO_PUSH: f32 = 0.3;
const SHOVE: f32 = 0.1;
const DAMPING: f32 = 0.99;

type BodyData = (
    Entity,
    &'static EntityId,
    &'static Team,
    &'static mut Position,
    &'static mut Velocity,
    &'static mut Acceleration,
    &'static Body,
    &'static mut Health,
    &'static mut Armor,
    Option<&'static mut Unit>,
    Option<&'static Projectile>,
    Option<&'static mut Blast>,
);

/// Who gets credit for a kill made by a projectile.
struct KillCredit {
    owner: Entity,
    friendly: bool,
}

/// Velocity and position update for one unit after its pairs are resolved.
pub fn integrate(
    pos: &mut Vec2,
    vel: &mut Vec2,
    acc: &mut Vec2,
    size: Vec2,
    bounds: &Rect,
    drag: f32,
    restitution: f32,
) {
    *vel += *acc;
    *vel *= drag;

    let radius = size.length();
    let predicted = *pos + *vel;
    if predicted.x + radius > bounds.right() || predicted.x <= bounds.left() {
        vel.x *= -restitution;
    }
    if predicted.y + radius > bounds.bottom() || predicted.y <= bounds.top() {
        vel.y *= -restitution;
    }

    // Each edge is checked on its own; a body overlapping both opposite
    // edges gets both pushes and stays put.
    if pos.x + size.x > bounds.right() {
        pos.x -= size.x / 2.0;
        *vel = Vec2::ZERO;
    }
    if pos.x - size.x < bounds.left() {
        pos.x += size.x / 2.0;
        *vel = Vec2::ZERO;
    }
    if pos.y + size.y > bounds.bottom() {
        pos.y -= size.y / 2.0;
        *vel = Vec2::ZERO;
    }
    if pos.y - size.y < bounds.top() {
        pos.y += size.y / 2.0;
        *vel = Vec2::ZERO;
    }

    *pos += *vel;
    *acc = Vec2::ZERO;
}

pub fn collision_system(
    battle: Res<Battle>,
    clock: Res<SimClock>,
    config: Res<SimConfig>,
    tree: Res<Quadtree>,
    mut events: ResMut<EventBuffer>,
    mut bodies: Query<BodyData, Without<Destroyed>>,
) {
    if battle.is_preparing() {
        return;
    }
    let now = clock.time;
    let damage_factor = config.damage_factor();

    let mut order: Vec<(EntityId, Entity)> = bodies
        .iter()
        .filter(|item| item.9.is_some())
        .map(|item| (*item.1, item.0))
        .collect();
    order.sort_unstable_by_key(|(id, _)| *id);

    for (_, entity) in order {
        let Ok((_, _, _, pos, vel, _, body, ..)) = bodies.get(entity) else {
            continue;
        };
        let (position, predicted, radius) = (pos.0, pos.0 + vel.0, body.radius());

        for other in tree.retrieve(&Circle::new(position, radius)) {
            if other == entity {
                continue;
            }
            let credit = {
                let Ok([me, them]) = bodies.get_many_mut([entity, other]) else {
                    continue;
                };
                let (_, _, &my_team, mut my_pos, mut my_vel, mut my_acc, _, mut my_health, mut my_armor, my_unit, _, _) = me;
                let (_, _, &their_team, mut their_pos, mut their_vel, mut their_acc, their_body, mut their_health, _, their_unit, their_projectile, their_blast) = them;
                let Some(mut my_unit) = my_unit else {
                    continue;
                };
                if their_projectile.is_some_and(|p| p.kind == ProjectileKind::CannonBall) {
                    continue;
                }

                let separation = predicted - (their_pos.0 + their_vel.0);
                let distance = separation.length();
                let overlap = radius + their_body.radius() - distance;
                if distance == 0.0 || overlap <= 0.0 {
                    continue;
                }
                let hostile = my_team.is_hostile_to(their_team);

                if let Some(mut their_unit) = their_unit {
                    let correction = separation * (overlap / (2.0 * distance));
                    if their_unit.kind == UnitKind::Testudo {
                        my_pos.0 += correction * TESTUDO_PUSH;
                        my_vel.0 *= 0.5;
                        my_acc.0 = Vec2::ZERO;
                    } else {
                        their_pos.0 -= correction * SHOVE;
                        my_vel.0 *= DAMPING;
                        my_acc.0 *= DAMPING;
                    }
                    their_vel.0 *= DAMPING;
                    their_acc.0 *= DAMPING;

                    if hostile && their_unit.anim.is_attacking() && !my_unit.stun.active(now) {
                        let damage = their_unit.kind.data().attack_damage * damage_factor;
                        if apply_layered_damage(&mut my_health, &mut my_armor, damage) {
                            their_unit.kill_count += 1;
                            my_unit.stun.set(now, KILL_STUN);
                        } else {
                            my_unit.stun.set(now, HIT_STUN);
                        }
                        events.push(CosmeticEvent::Hit { x: position.x, y: position.y });
                    }
                    None
                } else if let Some(projectile) = their_projectile {
                    let killed = match projectile.kind {
                        ProjectileKind::Arrow => {
                            if !hostile || !their_health.is_alive() {
                                continue;
                            }
                            their_health.kill();
                            apply_layered_damage(&mut my_health, &mut my_armor, projectile.damage * damage_factor)
                        }
                        ProjectileKind::Explosion => {
                            if let (SplashPolicy::OncePerTarget, Some(mut blast)) = (config.splash_policy, their_blast) {
                                if blast.hits.contains(&entity) {
                                    continue;
                                }
                                blast.hits.push(entity);
                            }
                            apply_direct_damage(&mut my_health, projectile.damage * damage_factor)
                        }
                        ProjectileKind::CannonBall => continue,
                    };
                    my_unit.stun.set(now, HIT_STUN);
                    events.push(CosmeticEvent::Hit { x: position.x, y: position.y });
                    if killed {
                        projectile.owner.map(|owner| KillCredit {
                            owner,
                            friendly: !hostile,
                        })
                    } else {
                        None
                    }
                } else {
                    None
                }
            };

            if let Some(KillCredit { owner, friendly }) = credit {
                if let Ok((.., Some(mut shooter), _, _)) = bodies.get_mut(owner) {
                    if friendly {
                        shooter.friend_kill_count += 1;
                    } else {
                        shooter.kill_count += 1;
                    }
                }
            }
        }

        if let Ok((_, _, _, mut pos, mut vel, mut acc, body, ..)) = bodies.get_mut(entity) {
            integrate(
                &mut pos.0,
                &mut vel.0,
                &mut acc.0,
                body.size,
                &config.bounds,
                config.drag,
                config.restitution,
            );
        }
    }
}
