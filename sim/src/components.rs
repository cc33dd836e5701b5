//! ECS Components for the Battle Commander simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use crate::math::Vec2;
use crate::timer::Timer;
use crate::unit_data::UnitKind;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Position on the battlefield (y grows downwards, Alpha deploys at the bottom).
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Per-tick acceleration; reset to zero after integration.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration(pub Vec2);

macro_rules! vec_newtype {
    ($($name:ident),*) => {$(
        impl $name {
            pub fn new(x: f32, y: f32) -> Self {
                Self(Vec2::new(x, y))
            }
        }

        impl Deref for $name {
            type Target = Vec2;
            fn deref(&self) -> &Vec2 {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Vec2 {
                &mut self.0
            }
        }
    )*};
}

vec_newtype!(Position, Velocity, Acceleration);

/// Collision body. The radius is the length of the size vector.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub size: Vec2,
}

impl Body {
    pub fn square(side: f32) -> Self {
        Self { size: Vec2::splat(side) }
    }

    /// Square body whose diagonal equals `radius`.
    pub fn with_radius(radius: f32) -> Self {
        Self::square(radius / std::f32::consts::SQRT_2)
    }

    pub fn radius(&self) -> f32 {
        self.size.length()
    }
}

/// Height above the ground and vertical speed. Purely visual except for
/// ballistic projectiles, which land when `z` returns to 0.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Height {
    pub z: f32,
    pub vz: f32,
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable spawn-order id. Pairwise resolution walks units in ascending id.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Side an entity fights for.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    #[default]
    None,
    Alpha,
    Bravo,
}

impl Team {
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != other
    }

    /// Alpha and Bravo are the only scoring sides.
    pub fn is_combatant(self) -> bool {
        matches!(self, Team::Alpha | Team::Bravo)
    }

    pub fn id(self) -> u8 {
        match self {
            Team::None => 0,
            Team::Alpha => 1,
            Team::Bravo => 2,
        }
    }
}

/// Allocates [`EntityId`]s in spawn order.
#[derive(Resource, Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }

    pub fn kill(&mut self) {
        self.current = 0.0;
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Absorbs damage before health does.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    pub current: f32,
    pub max: f32,
}

impl Armor {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }
}

/// Armor-first damage: health only drops once armor is already gone when
/// the hit lands. Returns true if this hit took the target from alive to dead.
pub fn apply_layered_damage(health: &mut Health, armor: &mut Armor, amount: f32) -> bool {
    let was_alive = health.is_alive();
    if armor.current <= 0.0 {
        health.damage(amount);
    }
    armor.damage(amount);
    was_alive && !health.is_alive()
}

/// Damage that ignores armor entirely. Same return contract as
/// [`apply_layered_damage`].
pub fn apply_direct_damage(health: &mut Health, amount: f32) -> bool {
    let was_alive = health.is_alive();
    health.damage(amount);
    was_alive && !health.is_alive()
}

// ============================================================================
// UNIT COMPONENTS
// ============================================================================

const IDLE_FRAMES: u32 = 20;
const ATTACK_FRAMES: u32 = 16;

/// Animation phase. Melee damage is only dealt while the attacker is in
/// its attack window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimPhase {
    Idle { frame: u32 },
    Attack { frame: u32 },
}

impl Default for AnimPhase {
    fn default() -> Self {
        AnimPhase::Idle { frame: 0 }
    }
}

impl AnimPhase {
    /// Idle loops; attack plays once and falls back to idle on its last frame.
    pub fn advance(&mut self) {
        *self = match *self {
            AnimPhase::Idle { frame } => AnimPhase::Idle {
                frame: (frame + 1) % IDLE_FRAMES,
            },
            AnimPhase::Attack { frame } if frame + 1 >= ATTACK_FRAMES - 1 => {
                AnimPhase::Idle { frame: 0 }
            }
            AnimPhase::Attack { frame } => AnimPhase::Attack { frame: frame + 1 },
        };
    }

    pub fn is_attacking(&self) -> bool {
        matches!(self, AnimPhase::Attack { .. })
    }

    pub fn frame(&self) -> u32 {
        match *self {
            AnimPhase::Idle { frame } | AnimPhase::Attack { frame } => frame,
        }
    }
}

/// A combat unit. Static stats live in the [`UnitKind`] table; this holds
/// the per-unit state.
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub kind: UnitKind,
    /// Copied position of the chosen enemy, if any.
    pub target: Option<Vec2>,
    /// Ticks left before the target is forgotten. Zero means no pending expiry.
    pub target_ttl: u32,
    pub vision_range: f32,
    pub heading: f32,
    pub max_speed: f32,
    pub attack_cooldown: Timer,
    pub shoot_cooldown: Timer,
    pub stun: Timer,
    pub anim: AnimPhase,
    pub kill_count: u32,
    pub friend_kill_count: u32,
    /// Set once the enemy side is wiped out; winners hop in place.
    pub winner: bool,
}

impl Unit {
    pub fn new(kind: UnitKind, now: f32) -> Self {
        Self {
            kind,
            target: None,
            target_ttl: 0,
            vision_range: 0.0,
            heading: 0.0,
            max_speed: 0.0,
            attack_cooldown: Timer::default(),
            shoot_cooldown: Timer::default(),
            stun: Timer::started(now, 0.0),
            anim: AnimPhase::default(),
            kill_count: 0,
            friend_kill_count: 0,
            winner: false,
        }
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.target_ttl = 0;
    }
}

// ============================================================================
// PROJECTILE COMPONENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    Arrow,
    CannonBall,
    Explosion,
}

impl ProjectileKind {
    pub fn id(self) -> u8 {
        match self {
            ProjectileKind::Arrow => 0,
            ProjectileKind::CannonBall => 1,
            ProjectileKind::Explosion => 2,
        }
    }
}

/// Anything fired or detonated by a unit.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub kind: ProjectileKind,
    /// Unit credited with kills. `None` once the shooter is gone or for
    /// death barrages.
    pub owner: Option<Entity>,
    pub damage: f32,
}

/// Parameters of the explosion a cannonball leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlastSpec {
    pub start_radius: f32,
    pub max_range: f32,
}

/// Arc flight towards a fixed ground point.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Ballistic {
    pub start: Vec2,
    pub target: Vec2,
    pub total_distance: f32,
    pub peak_height: f32,
    /// Explosion spawned on landing.
    pub blast: Option<BlastSpec>,
}

impl Ballistic {
    /// Share of the flight already covered from `position`, in `[0, 1]`.
    pub fn progress(&self, position: Vec2) -> f32 {
        if self.total_distance <= 0.0 {
            return 1.0;
        }
        (position.distance(self.start) / self.total_distance).min(1.0)
    }
}

/// A growing blast.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Blast {
    pub max_range: f32,
    pub growth: f32,
    /// Units already hit; only consulted under [`crate::config::SplashPolicy::OncePerTarget`].
    pub hits: Vec<Entity>,
}

impl Blast {
    pub fn new(max_range: f32) -> Self {
        Self {
            max_range,
            growth: 1.1,
            hits: Vec::new(),
        }
    }
}

/// Marks an entity whose destruction has been processed this tick.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Destroyed;

// ============================================================================
// BUNDLES
// ============================================================================

/// Components shared by every simulated body.
#[derive(Bundle, Clone)]
pub struct BodyBundle {
    pub id: EntityId,
    pub team: Team,
    pub position: Position,
    pub velocity: Velocity,
    pub acceleration: Acceleration,
    pub body: Body,
    pub height: Height,
    pub health: Health,
    pub armor: Armor,
}

impl BodyBundle {
    pub fn new(id: EntityId, team: Team, position: Vec2, body: Body, health: f32, armor: f32) -> Self {
        Self {
            id,
            team,
            position: Position(position),
            velocity: Velocity::default(),
            acceleration: Acceleration::default(),
            body,
            height: Height::default(),
            health: Health::new(health),
            armor: Armor::new(armor),
        }
    }
}

/// Everything a freshly placed unit needs.
#[derive(Bundle, Clone)]
pub struct UnitBundle {
    pub body: BodyBundle,
    pub unit: Unit,
}

impl UnitBundle {
    /// Unit of `kind` at `position`, scaled by the level size factor.
    pub fn new(id: EntityId, kind: UnitKind, team: Team, position: Vec2, size_factor: f32, now: f32) -> Self {
        let data = kind.data();
        Self {
            body: BodyBundle::new(
                id,
                team,
                position,
                Body::square(kind.base_side() * size_factor),
                data.health,
                data.armor,
            ),
            unit: Unit::new(kind, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armor_absorbs_first() {
        let mut health = Health::new(100.0);
        let mut armor = Armor::new(30.0);

        apply_layered_damage(&mut health, &mut armor, 20.0);
        assert_eq!(armor.current, 10.0);
        assert_eq!(health.current, 100.0);

        // Armor still up when this hit lands, so health is untouched.
        apply_layered_damage(&mut health, &mut armor, 50.0);
        assert_eq!(armor.current, 0.0);
        assert_eq!(health.current, 100.0);

        apply_layered_damage(&mut health, &mut armor, 50.0);
        assert_eq!(health.current, 50.0);
    }

    #[test]
    fn test_layered_damage_reports_kill_once() {
        let mut health = Health::new(10.0);
        let mut armor = Armor::new(0.0);
        assert!(apply_layered_damage(&mut health, &mut armor, 15.0));
        assert_eq!(health.current, 0.0);
        assert!(!apply_layered_damage(&mut health, &mut armor, 15.0));
    }

    #[test]
    fn test_direct_damage_ignores_armor() {
        let mut health = Health::new(100.0);
        assert!(!apply_direct_damage(&mut health, 40.0));
        assert_eq!(health.current, 60.0);
        assert!(apply_direct_damage(&mut health, 1000.0));
        assert_eq!(health.current, 0.0);
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut health = Health::new(50.0);
        health.damage(-20.0);
        assert_eq!(health.current, 50.0);
        let mut armor = Armor::new(5.0);
        armor.damage(100.0);
        assert_eq!(armor.current, 0.0);
    }

    #[test]
    fn test_attack_animation_returns_to_idle() {
        let mut anim = AnimPhase::Attack { frame: 0 };
        let mut attacking_ticks = 0;
        while anim.is_attacking() {
            anim.advance();
            attacking_ticks += 1;
        }
        assert_eq!(attacking_ticks, ATTACK_FRAMES - 1);
        assert_eq!(anim, AnimPhase::Idle { frame: 0 });
    }

    #[test]
    fn test_idle_animation_loops() {
        let mut anim = AnimPhase::Idle { frame: IDLE_FRAMES - 1 };
        anim.advance();
        assert_eq!(anim.frame(), 0);
    }

    #[test]
    fn test_body_radius_is_size_length() {
        let body = Body::square(20.0);
        assert!((body.radius() - 28.284271).abs() < 1e-3);
        assert!((Body::with_radius(5.0).radius() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_hostility() {
        assert!(Team::Alpha.is_hostile_to(Team::Bravo));
        assert!(!Team::Bravo.is_hostile_to(Team::Bravo));
        assert!(!Team::None.is_combatant());
    }
}
