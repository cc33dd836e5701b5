//! Static per-kind unit stats and the behavior hook table.
//!
//! Every unit kind shares one movement, targeting and collision pipeline.
//! What differs between kinds is data ([`UnitData`]) plus two strategy hooks
//! ([`UnitBehavior`]): what happens when a melee attack triggers and what a
//! ranged unit fires.

use crate::components::{AnimPhase, BlastSpec, ProjectileKind, Unit};
use crate::config::SimRng;
use crate::math::Vec2;
use crate::systems::projectiles::Launch;
use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Side of a unit's square body before level scaling.
pub const UNIT_SIDE: f32 = 20.0;
pub const ARROW_SIDE: f32 = 4.0;
pub const CANNONBALL_SIDE: f32 = 8.0;
pub const ARROW_PEAK: f32 = 50.0;
pub const CANNONBALL_PEAK: (f32, f32) = (50.0, 300.0);
/// Explosion range at size factor 1.
pub const BLAST_RANGE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Troop,
    Testudo,
    Archer,
    Knight,
    Artillery,
    Cavalry,
}

/// Stats shared by every unit of a kind. Range values are factors of the
/// unit radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    pub cost: u32,
    pub health: f32,
    pub armor: f32,
    pub speed_factor: f32,
    pub attack_range_factor: f32,
    pub attack_damage: f32,
    pub attack_cooldown: f32,
    pub shoot_range_factor: f32,
    pub shoot_cooldown: f32,
    pub shoot_damage: f32,
    pub projectile_speed: f32,
}

impl UnitData {
    pub const ZEROED: UnitData = UnitData {
        cost: 0,
        health: 0.0,
        armor: 0.0,
        speed_factor: 0.0,
        attack_range_factor: 0.0,
        attack_damage: 0.0,
        attack_cooldown: 0.0,
        shoot_range_factor: 0.0,
        shoot_cooldown: 0.0,
        shoot_damage: 0.0,
        projectile_speed: 0.0,
    };

    const fn melee(cost: u32, armor: f32, speed: f32, cooldown: f32, damage: f32, range: f32) -> Self {
        UnitData {
            cost,
            health: 100.0,
            armor,
            speed_factor: speed,
            attack_range_factor: range,
            attack_damage: damage,
            attack_cooldown: cooldown,
            ..Self::ZEROED
        }
    }

    pub fn can_shoot(&self) -> bool {
        self.shoot_range_factor > 0.0
    }
}

const TROOP: UnitData = UnitData::melee(100, 30.0, 1.0, 0.6, 30.0, 2.0);
const TESTUDO: UnitData = UnitData::melee(80, 200.0, 0.1, 1.0, 20.0, 1.0);
const KNIGHT: UnitData = UnitData::melee(250, 150.0, 0.8, 1.0, 80.0, 3.0);
const CAVALRY: UnitData = UnitData::melee(1300, 180.0, 1.8, 0.5, 200.0, 15.0);
const ARCHER: UnitData = UnitData {
    shoot_range_factor: 10.0,
    shoot_cooldown: 0.5,
    shoot_damage: 30.0,
    projectile_speed: 14.0,
    ..UnitData::melee(120, 20.0, 0.2, 0.3, 50.0, 14.0)
};
const ARTILLERY: UnitData = UnitData {
    shoot_range_factor: 20.0,
    shoot_cooldown: 2.5,
    shoot_damage: 1000.0,
    projectile_speed: 10.0,
    ..UnitData::melee(1500, 40.0, 0.2, 1.0, 20.0, 15.0)
};

impl UnitKind {
    pub const ALL: [UnitKind; 6] = [
        UnitKind::Troop,
        UnitKind::Testudo,
        UnitKind::Archer,
        UnitKind::Knight,
        UnitKind::Artillery,
        UnitKind::Cavalry,
    ];

    pub fn id(self) -> u8 {
        match self {
            UnitKind::Troop => 0,
            UnitKind::Testudo => 1,
            UnitKind::Archer => 2,
            UnitKind::Knight => 3,
            UnitKind::Artillery => 4,
            UnitKind::Cavalry => 5,
        }
    }

    pub fn from_id(id: u8) -> Option<UnitKind> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            UnitKind::Troop => "Troop",
            UnitKind::Testudo => "Testudo",
            UnitKind::Archer => "Archer",
            UnitKind::Knight => "Knight",
            UnitKind::Artillery => "Artillery",
            UnitKind::Cavalry => "Cavalry",
        }
    }

    pub fn data(self) -> &'static UnitData {
        match self {
            UnitKind::Troop => &TROOP,
            UnitKind::Testudo => &TESTUDO,
            UnitKind::Archer => &ARCHER,
            UnitKind::Knight => &KNIGHT,
            UnitKind::Artillery => &ARTILLERY,
            UnitKind::Cavalry => &CAVALRY,
        }
    }

    pub fn base_side(self) -> f32 {
        UNIT_SIDE
    }

    /// Ranged movers use the faster `/100` speed profile.
    pub fn is_ranged_mover(self) -> bool {
        matches!(self, UnitKind::Archer | UnitKind::Artillery | UnitKind::Cavalry)
    }

    /// Kinds that crawl once their target is inside the shoot band.
    pub fn slows_in_range(self) -> bool {
        matches!(self, UnitKind::Archer | UnitKind::Artillery)
    }

    /// Artillery targets the farthest enemy it can reach instead of the nearest.
    pub fn prefers_far_targets(self) -> bool {
        matches!(self, UnitKind::Artillery)
    }
}

/// Stats lookup by raw kind id. Unknown ids yield a zeroed record.
pub fn unit_data_by_id(id: u8) -> &'static UnitData {
    UnitKind::from_id(id).map_or(&UnitData::ZEROED, UnitKind::data)
}

// ============================================================================
// BEHAVIOR HOOKS
// ============================================================================

/// Inputs a ranged hook needs to aim a shot.
#[derive(Debug, Clone, Copy)]
pub struct ShotRequest {
    pub origin: Vec2,
    pub target: Vec2,
    pub damage: f32,
    pub speed: f32,
    pub size_factor: f32,
}

pub type AttackHook = fn(&mut Unit, &UnitData, f32);
pub type ShootHook = fn(&ShotRequest, &mut SimRng) -> Launch;

#[derive(Debug, Clone, Copy)]
pub struct UnitBehavior {
    pub on_attack: AttackHook,
    pub on_shoot: Option<ShootHook>,
}

/// Enters the attack animation window and re-arms the attack cooldown.
pub fn melee_attack(unit: &mut Unit, data: &UnitData, now: f32) {
    unit.anim = AnimPhase::Attack { frame: 0 };
    unit.attack_cooldown.set(now, data.attack_cooldown);
}

pub fn shoot_arrow(shot: &ShotRequest, _rng: &mut SimRng) -> Launch {
    Launch {
        kind: ProjectileKind::Arrow,
        origin: shot.origin,
        target: shot.target,
        speed: shot.speed,
        peak: ARROW_PEAK,
        damage: shot.damage,
        side: ARROW_SIDE * shot.size_factor,
        blast: None,
    }
}

pub fn shoot_cannonball(shot: &ShotRequest, rng: &mut SimRng) -> Launch {
    Launch {
        kind: ProjectileKind::CannonBall,
        origin: shot.origin,
        target: shot.target,
        speed: shot.speed,
        peak: rng.0.gen_range(CANNONBALL_PEAK.0..CANNONBALL_PEAK.1),
        damage: shot.damage,
        side: CANNONBALL_SIDE * shot.size_factor,
        blast: Some(BlastSpec {
            start_radius: Vec2::splat(UNIT_SIDE * shot.size_factor).length(),
            max_range: BLAST_RANGE / shot.size_factor,
        }),
    }
}

/// Hook table keyed by [`UnitKind`]. Hosts may swap entries before a fight.
#[derive(Resource, Debug, Clone)]
pub struct UnitBehaviors {
    table: [UnitBehavior; 6],
}

impl Default for UnitBehaviors {
    fn default() -> Self {
        let melee = UnitBehavior {
            on_attack: melee_attack,
            on_shoot: None,
        };
        let mut table = [melee; 6];
        table[UnitKind::Archer.id() as usize].on_shoot = Some(shoot_arrow);
        table[UnitKind::Artillery.id() as usize].on_shoot = Some(shoot_cannonball);
        Self { table }
    }
}

impl UnitBehaviors {
    pub fn get(&self, kind: UnitKind) -> &UnitBehavior {
        &self.table[kind.id() as usize]
    }

    pub fn set(&mut self, kind: UnitKind, behavior: UnitBehavior) {
        self.table[kind.id() as usize] = behavior;
    }
}
