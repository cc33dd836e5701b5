//! Spatial partitioning for collision candidate queries.
//!
//! A region quadtree over the playfield. Leaves store [`Entity`] handles plus
//! the circle they were inserted with; the ECS world owns the actual data.
//! A circle lands in every quadrant it overlaps, so one entity may sit in
//! several leaves and `retrieve` de-duplicates.
//!
//! The tree is rebuilt from scratch every tick by [`quadtree_rebuild_system`].

use crate::battle::{Battle, BattleStatus};
use crate::components::*;
use crate::math::{Rect, Vec2};
use bevy_ecs::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn overlaps(&self, other: &Circle) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) < reach * reach
    }
}

#[derive(Debug)]
struct Node {
    bounds: Rect,
    level: u32,
    objects: Vec<(Entity, Circle)>,
    /// Order: top-right, top-left, bottom-left, bottom-right.
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: Rect, level: u32) -> Self {
        Self {
            bounds,
            level,
            objects: Vec::new(),
            children: None,
        }
    }

    fn split(&mut self) {
        let Rect { x, y, width, height } = self.bounds;
        let (w, h) = (width / 2.0, height / 2.0);
        let level = self.level + 1;
        self.children = Some(Box::new([
            Node::new(Rect::new(x + w, y, w, h), level),
            Node::new(Rect::new(x, y, w, h), level),
            Node::new(Rect::new(x, y + h, w, h), level),
            Node::new(Rect::new(x + w, y + h, w, h), level),
        ]));
    }

    fn insert(&mut self, entity: Entity, circle: Circle, max_objects: usize, max_levels: u32) {
        if let Some(children) = self.children.as_mut() {
            if !Self::insert_into_children(children, entity, circle, max_objects, max_levels) {
                // Outside every quadrant; keep it here so retrieve still sees it.
                self.objects.push((entity, circle));
            }
            return;
        }

        self.objects.push((entity, circle));
        if self.objects.len() > max_objects && self.level < max_levels {
            self.split();
            let objects = std::mem::take(&mut self.objects);
            for (entity, circle) in objects {
                self.insert(entity, circle, max_objects, max_levels);
            }
        }
    }

    fn insert_into_children(
        children: &mut [Node; 4],
        entity: Entity,
        circle: Circle,
        max_objects: usize,
        max_levels: u32,
    ) -> bool {
        let mut placed = false;
        for child in children.iter_mut() {
            if child.bounds.intersects_circle(circle.center, circle.radius) {
                child.insert(entity, circle, max_objects, max_levels);
                placed = true;
            }
        }
        placed
    }

    fn retrieve(&self, circle: &Circle, out: &mut Vec<(Entity, Circle)>) {
        out.extend_from_slice(&self.objects);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects_circle(circle.center, circle.radius) {
                    child.retrieve(circle, out);
                }
            }
        }
    }

    fn depth(&self) -> u32 {
        match self.children.as_ref() {
            Some(children) => children.iter().map(Node::depth).max().unwrap_or(self.level),
            None => self.level,
        }
    }
}

/// Quadtree over the playfield, rebuilt every tick.
#[derive(Resource, Debug)]
pub struct Quadtree {
    root: Node,
    max_objects: usize,
    max_levels: u32,
    len: usize,
}

impl Quadtree {
    pub fn new(bounds: Rect, max_objects: usize, max_levels: u32) -> Self {
        Self {
            root: Node::new(bounds, 0),
            max_objects: max_objects.max(1),
            max_levels,
            len: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }

    /// Resets to a single empty leaf.
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.bounds, 0);
        self.len = 0;
    }

    /// Inserts `entity` into every quadrant its circle overlaps. Circles
    /// without a positive radius are rejected.
    pub fn insert(&mut self, entity: Entity, circle: Circle) -> bool {
        if !(circle.radius > 0.0) {
            return false;
        }
        self.root.insert(entity, circle, self.max_objects, self.max_levels);
        self.len += 1;
        true
    }

    /// Candidates sharing a quadrant with `circle`, de-duplicated in
    /// first-seen order. May contain entities that do not actually overlap.
    pub fn retrieve(&self, circle: &Circle) -> Vec<Entity> {
        let mut found = Vec::new();
        self.root.retrieve(circle, &mut found);
        let mut seen = HashSet::with_capacity(found.len());
        found
            .into_iter()
            .filter_map(|(entity, _)| seen.insert(entity).then_some(entity))
            .collect()
    }

    /// Entities whose inserted circle truly overlaps a circle of `radius`
    /// around `point`.
    pub fn query_radius(&self, point: Vec2, radius: f32) -> Vec<Entity> {
        let probe = Circle::new(point, radius);
        let mut found = Vec::new();
        self.root.retrieve(&probe, &mut found);
        let mut seen = HashSet::with_capacity(found.len());
        found
            .into_iter()
            .filter(|(_, circle)| circle.overlaps(&probe))
            .filter_map(|(entity, _)| seen.insert(entity).then_some(entity))
            .collect()
    }

    /// Number of successful inserts since the last clear.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deepest leaf level; 0 when the root is a leaf.
    pub fn depth(&self) -> u32 {
        self.root.depth()
    }

    pub fn is_split(&self) -> bool {
        self.root.children.is_some()
    }
}

/// Rebuilds the quadtree from live bodies. Units are left out while the
/// battle is still in Prepare so nothing collides during placement.
/// Insertion follows [`EntityId`] order so candidate lists are reproducible.
pub fn quadtree_rebuild_system(
    mut tree: ResMut<Quadtree>,
    battle: Res<Battle>,
    query: Query<(Entity, &EntityId, &Position, &Body, Has<Unit>), Without<Destroyed>>,
) {
    tree.clear();
    let preparing = battle.status == BattleStatus::Prepare;

    let mut bodies: Vec<_> = query
        .iter()
        .filter(|(_, _, _, _, is_unit)| !(preparing && *is_unit))
        .map(|(entity, id, position, body, _)| (*id, entity, Circle::new(position.0, body.radius())))
        .collect();
    bodies.sort_unstable_by_key(|(id, _, _)| *id);

    for (_, entity, circle) in bodies {
        tree.insert(entity, circle);
    }
    log::trace!("quadtree rebuilt: {} bodies, depth {}", tree.len(), tree.depth());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn e(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn test_split_separates_far_corner() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 2, 4);
        assert!(tree.insert(e(1), Circle::new(Vec2::new(10.0, 10.0), 1.0)));
        assert!(tree.insert(e(2), Circle::new(Vec2::new(10.0, 11.0), 1.0)));
        assert!(!tree.is_split());
        assert!(tree.insert(e(3), Circle::new(Vec2::new(90.0, 90.0), 1.0)));
        assert!(tree.is_split());

        let found = tree.retrieve(&Circle::new(Vec2::new(90.0, 90.0), 1.0));
        assert_eq!(found, vec![e(3)]);
        let near = tree.retrieve(&Circle::new(Vec2::new(10.0, 10.0), 1.0));
        assert!(near.contains(&e(1)) && near.contains(&e(2)));
        assert!(!near.contains(&e(3)));
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 3, 4);
        assert!(!tree.insert(e(1), Circle::new(Vec2::new(5.0, 5.0), 0.0)));
        assert!(!tree.insert(e(2), Circle::new(Vec2::new(5.0, 5.0), -3.0)));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_clear_empties_tree() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 4);
        for i in 0..10 {
            tree.insert(e(i), Circle::new(Vec2::new(i as f32 * 9.0, 50.0), 2.0));
        }
        tree.clear();
        assert!(!tree.is_split());
        assert!(tree.retrieve(&Circle::new(Vec2::new(50.0, 50.0), 100.0)).is_empty());
    }

    #[test]
    fn test_straddling_circle_is_deduplicated() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 4);
        tree.insert(e(1), Circle::new(Vec2::new(50.0, 50.0), 5.0));
        tree.insert(e(2), Circle::new(Vec2::new(20.0, 20.0), 1.0));
        let found = tree.retrieve(&Circle::new(Vec2::new(50.0, 50.0), 10.0));
        assert_eq!(found.iter().filter(|x| **x == e(1)).count(), 1);
    }

    #[test]
    fn test_depth_bounded_by_max_levels() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 3);
        for i in 0..20 {
            tree.insert(e(i), Circle::new(Vec2::new(1.0 + i as f32 * 0.01, 1.0), 0.5));
        }
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_retrieve_never_misses_overlapping_circles() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let bounds = Rect::new(0.0, 0.0, 400.0, 300.0);
        let mut tree = Quadtree::new(bounds, 3, 4);
        let circles: Vec<Circle> = (0..200)
            .map(|_| {
                Circle::new(
                    Vec2::new(rng.gen_range(0.0..400.0), rng.gen_range(0.0..300.0)),
                    rng.gen_range(1.0..20.0),
                )
            })
            .collect();
        for (i, circle) in circles.iter().enumerate() {
            tree.insert(e(i as u32), *circle);
        }

        for (i, probe) in circles.iter().enumerate() {
            let found = tree.retrieve(probe);
            for (j, other) in circles.iter().enumerate() {
                if probe.overlaps(other) {
                    assert!(found.contains(&e(j as u32)), "{} missed {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_query_radius_filters_exactly() {
        let mut tree = Quadtree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 3, 4);
        tree.insert(e(1), Circle::new(Vec2::new(10.0, 10.0), 2.0));
        tree.insert(e(2), Circle::new(Vec2::new(20.0, 10.0), 2.0));
        assert_eq!(tree.query_radius(Vec2::new(10.0, 10.0), 5.0), vec![e(1)]);
    }
}
