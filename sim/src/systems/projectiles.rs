//! Ballistic projectiles and explosions.
//!
//! ## Data Access
//! - Reads: Ballistic, Blast, Projectile, Team
//! - Writes: Position, Velocity, Acceleration, Height (flight), Body (blast growth)
//!
//! Arrows and cannonballs fly straight at a fixed ground point while their
//! height follows a half-sine arc. They land, and are destroyed, on the tick
//! the travelled distance reaches the launch distance. A cannonball leaves an
//! explosion behind that grows by a fixed factor every tick until it passes
//! its range.

use crate::components::*;
use crate::config::SimConfig;
use crate::math::Vec2;
use crate::world::{CosmeticEvent, EventBuffer};
use bevy_ecs::prelude::*;
use std::f32::consts::PI;

/// Everything needed to put a projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub kind: ProjectileKind,
    pub origin: Vec2,
    pub target: Vec2,
    pub speed: f32,
    pub peak: f32,
    pub damage: f32,
    /// Side of the square body.
    pub side: f32,
    pub blast: Option<BlastSpec>,
}

impl Launch {
    /// Launch speed is delivered as the first tick's acceleration.
    pub fn into_bundle(self, id: EntityId, team: Team, owner: Option<Entity>) -> (BodyBundle, Projectile, Ballistic) {
        let mut body = BodyBundle::new(id, team, self.origin, Body::square(self.side), 1.0, 0.0);
        body.acceleration = Acceleration((self.target - self.origin).normalize() * self.speed);
        (
            body,
            Projectile {
                kind: self.kind,
                owner,
                damage: self.damage,
            },
            Ballistic {
                start: self.origin,
                target: self.target,
                total_distance: self.origin.distance(self.target),
                peak_height: self.peak,
                blast: self.blast,
            },
        )
    }
}

pub fn explosion_bundle(
    id: EntityId,
    team: Team,
    owner: Option<Entity>,
    at: Vec2,
    spec: BlastSpec,
    damage: f32,
) -> (BodyBundle, Projectile, Blast) {
    (
        BodyBundle::new(id, team, at, Body::with_radius(spec.start_radius), 1.0, 0.0),
        Projectile {
            kind: ProjectileKind::Explosion,
            owner,
            damage,
        },
        Blast::new(spec.max_range),
    )
}

/// Height on a half-sine arc at flight `progress` in `[0, 1]`.
pub fn arc_height(peak: f32, progress: f32) -> f32 {
    if progress >= 1.0 {
        0.0
    } else {
        (peak * (-PI / 2.0 + PI * progress).cos()).max(0.0)
    }
}

pub fn projectile_flight_system(
    config: Res<SimConfig>,
    mut ids: ResMut<IdAllocator>,
    mut events: ResMut<EventBuffer>,
    mut commands: Commands,
    mut flights: Query<
        (
            Entity,
            &Team,
            &Projectile,
            &Ballistic,
            &mut Position,
            &mut Velocity,
            &mut Acceleration,
            &mut Height,
        ),
        Without<Destroyed>,
    >,
) {
    for (entity, team, projectile, ballistic, mut pos, mut vel, mut acc, mut height) in flights.iter_mut() {
        vel.0 += acc.0;
        pos.0 += vel.0;
        acc.0 = Vec2::ZERO;

        let progress = ballistic.progress(pos.0);
        height.z = arc_height(ballistic.peak_height, progress);

        if progress >= 1.0 {
            commands.entity(entity).insert(Destroyed);
            if let Some(spec) = ballistic.blast {
                log::debug!("cannonball landed at ({:.1}, {:.1})", pos.x, pos.y);
                commands.spawn(explosion_bundle(
                    ids.next_id(),
                    *team,
                    projectile.owner,
                    pos.0,
                    spec,
                    projectile.damage,
                ));
                events.push(CosmeticEvent::Explosion {
                    x: pos.x,
                    y: pos.y,
                    radius: spec.start_radius,
                });
            }
        } else if !config.bounds.contains(pos.0) {
            commands.entity(entity).insert(Destroyed);
        }
    }
}

/// Grows every explosion and retires those past their range.
pub fn blast_growth_system(
    mut commands: Commands,
    mut blasts: Query<(Entity, &mut Body, &Blast), Without<Destroyed>>,
) {
    for (entity, mut body, blast) in blasts.iter_mut() {
        body.size *= blast.growth;
        if body.radius() > blast.max_range {
            commands.entity(entity).insert(Destroyed);
        }
    }
}
