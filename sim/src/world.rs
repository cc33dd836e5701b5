//! Snapshot types and the per-tick cosmetic event buffer.
//!
//! The `Snapshot` struct provides a serializable view of the simulation state
//! that a renderer consumes between ticks.

use crate::battle::{Battle, BattleReport, BattleStatus};
use crate::components::*;
use crate::systems::clock::SimClock;
use crate::unit_data::UnitKind;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Visual-only happenings the host may render. Never fed back into the sim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CosmeticEvent {
    Blood { x: f32, y: f32 },
    Hit { x: f32, y: f32 },
    ArrowShot { x: f32, y: f32 },
    Explosion { x: f32, y: f32, radius: f32 },
    KillLabel { x: f32, y: f32, text: String },
}

/// Cosmetic events raised during the current tick. Cleared at tick start.
#[derive(Resource, Debug, Default)]
pub struct EventBuffer {
    pub events: Vec<CosmeticEvent>,
}

impl EventBuffer {
    pub fn push(&mut self, event: CosmeticEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// What a snapshot entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Unit(UnitKind),
    Projectile(ProjectileKind),
}

impl EntityKind {
    /// Flat numeric id: unit kinds 0-5, projectiles from 10.
    pub fn id(self) -> u8 {
        match self {
            EntityKind::Unit(kind) => kind.id(),
            EntityKind::Projectile(kind) => 10 + kind.id(),
        }
    }
}

/// Snapshot of a single entity for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: u32,
    pub kind: EntityKind,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub radius: f32,
    pub health_pct: f32,
    pub armor_pct: f32,
    pub facing: f32,
    pub anim: Option<AnimPhase>,
}

/// Complete simulation state after a tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub status: BattleStatus,
    pub gold: u32,
    /// Live entities in ascending id order.
    pub entities: Vec<EntitySnapshot>,
    /// Cosmetic events raised by the last tick.
    pub events: Vec<CosmeticEvent>,
    /// Present once the battle has ended.
    pub report: Option<BattleReport>,
    pub summary_due: bool,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World) -> Self {
        let mut query = world.query_filtered::<(
            &EntityId,
            &Team,
            &Position,
            &Velocity,
            &Body,
            &Height,
            &Health,
            &Armor,
            Option<&Unit>,
            Option<&Projectile>,
        ), Without<Destroyed>>();

        let mut entities: Vec<EntitySnapshot> = query
            .iter(world)
            .filter_map(|(id, team, pos, vel, body, height, health, armor, unit, projectile)| {
                let kind = match (unit, projectile) {
                    (Some(unit), _) => EntityKind::Unit(unit.kind),
                    (None, Some(projectile)) => EntityKind::Projectile(projectile.kind),
                    (None, None) => return None,
                };
                Some(EntitySnapshot {
                    id: id.0,
                    kind,
                    team: *team,
                    x: pos.x,
                    y: pos.y,
                    z: height.z,
                    radius: body.radius(),
                    health_pct: health.fraction(),
                    armor_pct: armor.fraction(),
                    facing: unit.map_or_else(|| vel.heading(), |u| u.heading),
                    anim: unit.map(|u| u.anim),
                })
            })
            .collect();
        entities.sort_unstable_by_key(|e| e.id);

        let (tick, time) = world
            .get_resource::<SimClock>()
            .map_or((0, 0.0), |clock| (clock.tick, clock.time));
        let events = world
            .get_resource::<EventBuffer>()
            .map(|buffer| buffer.events.clone())
            .unwrap_or_default();
        let (status, gold, report, summary_due) = world
            .get_resource::<Battle>()
            .map_or((BattleStatus::Prepare, 0, None, false), |battle| {
                (battle.status, battle.gold, battle.report, battle.summary_due)
            });

        Self {
            tick,
            time,
            status,
            gold,
            entities,
            events,
            report,
            summary_due,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn count(&self, team: Team) -> usize {
        self.entities
            .iter()
            .filter(|e| e.team == team && matches!(e.kind, EntityKind::Unit(_)))
            .count()
    }
}
