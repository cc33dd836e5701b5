//! Placement geometry for the preparation phase.
//!
//! Placement snaps to a square grid whose cell is the floored radius of the
//! unit being placed. A cell already holding an Alpha unit is occupied. The
//! [`Brush`] decides whether one cell or a 3x3 block is filled, and how far
//! a removal reaches.

use crate::config::SimConfig;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};

/// Pointer state sampled by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub x: f32,
    pub y: f32,
    pub left: bool,
    pub right: bool,
}

impl PointerInput {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Brush {
    #[default]
    Single,
    /// The centre cell and its eight neighbours.
    Cluster,
}

impl Brush {
    /// Removal radius in unit radii.
    pub fn removal_factor(self) -> f32 {
        match self {
            Brush::Single => 1.0,
            Brush::Cluster => 2.0,
        }
    }
}

/// Alpha's half of the field, above the control bar.
pub fn in_placement_zone(config: &SimConfig, pos: Vec2) -> bool {
    let bounds = &config.bounds;
    pos.y > bounds.y + bounds.height / 2.0 && pos.y < bounds.bottom() - config.control_bar_height
}

/// Grid cell side for a unit of the given radius.
pub fn grid_cell(radius: f32) -> f32 {
    radius.floor().max(1.0)
}

pub fn snap(pos: Vec2, cell: f32) -> Vec2 {
    Vec2::new(cell * (pos.x / cell).floor(), cell * (pos.y / cell).floor())
}

/// Snapped points a brush stroke at `pos` covers, centre first.
pub fn brush_points(pos: Vec2, cell: f32, brush: Brush) -> Vec<Vec2> {
    let centre = snap(pos, cell);
    let mut points = vec![centre];
    if brush == Brush::Cluster {
        for delta in [Vec2::new(cell, 0.0), Vec2::new(cell, cell)] {
            for quarter in 0..4 {
                let turned = delta.rotate(quarter as f32 * std::f32::consts::FRAC_PI_2);
                points.push(snap(centre + turned + Vec2::splat(cell / 2.0), cell));
            }
        }
    }
    points
}

/// True when no position in `occupied` snaps to the same cell as `point`.
pub fn is_cell_free(point: Vec2, cell: f32, occupied: &[Vec2]) -> bool {
    let target = snap(point, cell);
    occupied.iter().all(|pos| snap(*pos, cell) != target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_is_lower_half_above_bar() {
        let config = SimConfig::default(); // 1280x800, bar 120
        assert!(in_placement_zone(&config, Vec2::new(100.0, 500.0)));
        assert!(!in_placement_zone(&config, Vec2::new(100.0, 400.0)));
        assert!(!in_placement_zone(&config, Vec2::new(100.0, 300.0)));
        assert!(!in_placement_zone(&config, Vec2::new(100.0, 680.0)));
        assert!(in_placement_zone(&config, Vec2::new(100.0, 679.0)));
    }

    #[test]
    fn test_snap_floors_to_cell() {
        assert_eq!(snap(Vec2::new(59.0, 61.0), 28.0), Vec2::new(56.0, 56.0));
        assert_eq!(grid_cell(28.28), 28.0);
        assert_eq!(grid_cell(0.3), 1.0);
    }

    #[test]
    fn test_cluster_covers_neighbours() {
        let single = brush_points(Vec2::new(100.0, 500.0), 28.0, Brush::Single);
        assert_eq!(single, vec![Vec2::new(84.0, 476.0)]);

        let cluster = brush_points(Vec2::new(100.0, 500.0), 28.0, Brush::Cluster);
        assert_eq!(cluster.len(), 9);
        assert_eq!(cluster[0], single[0]);
        for dx in [-28.0, 0.0, 28.0] {
            for dy in [-28.0, 0.0, 28.0] {
                assert!(cluster.contains(&(single[0] + Vec2::new(dx, dy))), "missing {dx},{dy}");
            }
        }
    }

    #[test]
    fn test_occupied_cell() {
        let occupied = [Vec2::new(60.0, 60.0)];
        assert!(!is_cell_free(Vec2::new(57.0, 83.0), 28.0, &occupied));
        assert!(is_cell_free(Vec2::new(90.0, 60.0), 28.0, &occupied));
    }

    #[test]
    fn test_cluster_removes_wider() {
        assert_eq!(Brush::Cluster.removal_factor(), 2.0 * Brush::Single.removal_factor());
    }
}
