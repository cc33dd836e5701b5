//! Campaign level table and enemy army layout.
//!
//! Each level fixes the Bravo army (count, kind or a random mix), the size
//! factor every unit is scaled by, and whether the host should draw fog.
//! The player's starting gold is the Bravo army's cost times the difficulty
//! multiplier.

use crate::config::SimRng;
use crate::error::{SimError, SimResult};
use crate::math::{Rect, Vec2};
use crate::unit_data::{UnitKind, UNIT_SIDE};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn gold_multiplier(self) -> f32 {
        match self {
            Difficulty::Easy => 1.5,
            Difficulty::Medium => 1.25,
            Difficulty::Hard => 1.0,
        }
    }

    /// Starting gold against an army worth `enemy_cost`.
    pub fn starting_gold(self, enemy_cost: u32) -> u32 {
        (enemy_cost as f32 * self.gold_multiplier()).floor() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub enemy_count: usize,
    /// `None` spawns a random Troop/Archer/Knight mix.
    pub enemy_kind: Option<UnitKind>,
    pub size_factor: f32,
    pub fog: bool,
}

const fn level(enemy_count: usize, enemy_kind: Option<UnitKind>, size_factor: f32, fog: bool) -> LevelSpec {
    LevelSpec {
        enemy_count,
        enemy_kind,
        size_factor,
        fog,
    }
}

pub const LEVELS: [LevelSpec; 13] = [
    level(10, Some(UnitKind::Troop), 2.0, false),
    level(50, Some(UnitKind::Archer), 1.5, false),
    level(100, Some(UnitKind::Knight), 1.5, false),
    level(20, Some(UnitKind::Artillery), 1.5, false),
    level(30, Some(UnitKind::Cavalry), 1.2, true),
    level(100, None, 1.5, true),
    level(120, None, 1.3, true),
    level(140, None, 1.2, true),
    level(180, None, 1.1, true),
    level(200, None, 1.0, true),
    level(240, None, 0.9, true),
    level(300, None, 0.8, true),
    level(500, None, 0.7, false),
];

/// Kinds a mixed army draws from.
const MIXED_KINDS: [UnitKind; 3] = [UnitKind::Troop, UnitKind::Archer, UnitKind::Knight];

/// Artillery batteries stand further apart.
const ARTILLERY_LEVEL: usize = 3;
const ARTILLERY_SPACING: f32 = 2.5;

/// Scatter distance range for mixed armies, before size scaling.
const SCATTER: (i32, i32) = (20, 500);

pub fn level_spec(index: usize) -> SimResult<&'static LevelSpec> {
    LEVELS.get(index).ok_or(SimError::UnknownLevel(index))
}

/// Whether the player may field `kind` on level `index`.
pub fn is_kind_unlocked(index: usize, kind: UnitKind) -> bool {
    match kind {
        UnitKind::Troop | UnitKind::Testudo | UnitKind::Archer => true,
        UnitKind::Knight | UnitKind::Artillery => index > 0,
        UnitKind::Cavalry => index > 1,
    }
}

pub fn player_kinds(index: usize) -> Vec<UnitKind> {
    UnitKind::ALL
        .into_iter()
        .filter(|kind| is_kind_unlocked(index, *kind))
        .collect()
}

/// Where Bravo's army gathers: centred, a fifth of the way down.
pub fn enemy_origin(bounds: &Rect) -> Vec2 {
    Vec2::new(bounds.x + bounds.width / 2.0, bounds.y + bounds.height * 0.2)
}

/// Lays out `count` units in rows of `sqrt(count)`, centred on `origin`.
pub fn formation(count: usize, origin: Vec2, cell: f32) -> Vec<Vec2> {
    let side = (count as f32).sqrt();
    let start_x = -(side * cell) / 2.0;
    let (mut row, mut col) = (0u32, 0u32);
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        points.push(origin + Vec2::new(start_x + col as f32 * cell, row as f32 * cell));
        col += 1;
        if col as f32 >= side {
            col = 0;
            row += 1;
        }
    }
    points
}

/// Spawn list for level `index`'s Bravo army.
pub fn enemy_army(index: usize, bounds: &Rect, rng: &mut SimRng) -> SimResult<Vec<(UnitKind, Vec2)>> {
    let spec = level_spec(index)?;
    let origin = enemy_origin(bounds);
    let sf = spec.size_factor;

    let army = match spec.enemy_kind {
        Some(kind) => {
            let spacing = if index == ARTILLERY_LEVEL { ARTILLERY_SPACING } else { 1.0 };
            formation(spec.enemy_count, origin, kind.base_side() * sf * spacing)
                .into_iter()
                .map(|pos| (kind, pos))
                .collect()
        }
        None => {
            let unit_radius = Vec2::splat(UNIT_SIDE * sf).length();
            let anchor = origin + Vec2::splat(unit_radius * sf);
            let mut offset = Vec2::ZERO;
            let mut army = Vec::with_capacity(spec.enemy_count);
            for _ in 0..spec.enemy_count {
                let kind = MIXED_KINDS[rng.0.gen_range(0..MIXED_KINDS.len())];
                army.push((kind, anchor + offset));
                let dir = Vec2::new(rng.0.gen_range(-1.0..1.0), rng.0.gen_range(-1.0..1.0));
                offset = dir * (rng.0.gen_range(SCATTER.0..SCATTER.1) as f32 * sf);
            }
            army
        }
    };
    Ok(army)
}

/// Total cost of a spawn list.
pub fn army_cost(army: &[(UnitKind, Vec2)]) -> u32 {
    army.iter().map(|(kind, _)| kind.data().cost).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(LEVELS.len(), 13);
        assert_eq!(LEVELS[0].enemy_kind, Some(UnitKind::Troop));
        assert_eq!(LEVELS[4].enemy_kind, Some(UnitKind::Cavalry));
        assert!(LEVELS[4].fog);
        assert!(!LEVELS[12].fog);
        assert_eq!(LEVELS[12].enemy_count, 500);
        assert!(matches!(level_spec(13), Err(SimError::UnknownLevel(13))));
    }

    #[test]
    fn test_unlocks_grow_with_level() {
        assert_eq!(player_kinds(0), vec![UnitKind::Troop, UnitKind::Testudo, UnitKind::Archer]);
        assert_eq!(player_kinds(1).len(), 5);
        assert!(!is_kind_unlocked(1, UnitKind::Cavalry));
        assert_eq!(player_kinds(2).len(), 6);
    }

    #[test]
    fn test_difficulty_gold() {
        assert_eq!(Difficulty::Easy.starting_gold(1000), 1500);
        assert_eq!(Difficulty::Medium.starting_gold(1000), 1250);
        assert_eq!(Difficulty::Hard.starting_gold(1000), 1000);
        assert_eq!(Difficulty::Medium.starting_gold(101), 126);
    }

    #[test]
    fn test_formation_rows() {
        let points = formation(9, Vec2::new(100.0, 50.0), 10.0);
        assert_eq!(points.len(), 9);
        assert_eq!(points[0], Vec2::new(85.0, 50.0));
        assert_eq!(points[2], Vec2::new(105.0, 50.0));
        assert_eq!(points[3], Vec2::new(85.0, 60.0));
        assert_eq!(points[8], Vec2::new(105.0, 70.0));
    }

    #[test]
    fn test_first_level_army() {
        let bounds = Rect::new(0.0, 0.0, 1280.0, 800.0);
        let mut rng = SimRng::from_seed(3);
        let army = enemy_army(0, &bounds, &mut rng).unwrap();
        assert_eq!(army.len(), 10);
        assert!(army.iter().all(|(kind, _)| *kind == UnitKind::Troop));
        assert_eq!(army_cost(&army), 1000);
        // Whole army sits in Bravo's half.
        assert!(army.iter().all(|(_, pos)| pos.y < bounds.height / 2.0));
    }

    #[test]
    fn test_mixed_army_is_seeded() {
        let bounds = Rect::new(0.0, 0.0, 1280.0, 800.0);
        let a = enemy_army(5, &bounds, &mut SimRng::from_seed(9)).unwrap();
        let b = enemy_army(5, &bounds, &mut SimRng::from_seed(9)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
        assert!(a.iter().all(|(kind, _)| MIXED_KINDS.contains(kind)));
    }
}
