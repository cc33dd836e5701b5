//! Public API for the simulation.
//!
//! [`SimWorld`] owns the ECS world and the tick schedule. A host drives it
//! with `step(dt)` (or `tick()`), issues commands between ticks, and reads
//! [`Snapshot`]s back out.
//!
//! ## Fixed Timestep
//!
//! The simulation runs at a fixed rate (default 60 Hz). `step(dt)`
//! accumulates host time and runs as many fixed ticks as fit, so a given
//! command sequence plays out the same regardless of frame rate.
//!
//! ## Tick Order
//!
//! Systems run strictly chained; see [`crate::systems`] for the order.

use crate::battle::{Battle, BattleReport, BattleStatus};
use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::error::{SimError, SimResult};
use crate::level::{army_cost, enemy_army, is_kind_unlocked, level_spec, Difficulty};
use crate::math::Vec2;
use crate::placement::{brush_points, grid_cell, in_placement_zone, is_cell_free, snap, Brush, PointerInput};
use crate::spatial::{quadtree_rebuild_system, Quadtree};
use crate::systems::*;
use crate::timer::Timer;
use crate::unit_data::{UnitBehaviors, UnitKind, UNIT_SIDE};
use crate::world::{EventBuffer, Snapshot};
use bevy_ecs::prelude::*;

/// First-shot wait for archers, artillery and cavalry when the fight starts.
const FIRST_SHOT_WAIT: f32 = 1.0;

/// The main simulation world container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Loading levels and placing the player's army
/// - Stepping the simulation forward
/// - Extracting state snapshots
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a new empty simulation world with the default config.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation world with a custom configuration.
    pub fn with_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(SimClock::new(config.fixed_timestep));
        world.insert_resource(Quadtree::new(
            config.bounds,
            config.quadtree_max_objects,
            config.quadtree_max_levels,
        ));
        world.insert_resource(SimRng::from_seed(config.seed));
        world.insert_resource(Battle::default());
        world.insert_resource(EventBuffer::default());
        world.insert_resource(IdAllocator::default());
        world.insert_resource(UnitBehaviors::default());
        world.insert_resource(config);

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                clock_system,
                target_memory_system,
                targeting_system,
                unit_control_system,
                projectile_flight_system,
                blast_growth_system,
                quadtree_rebuild_system,
                collision_system,
                destruction_system,
                battle_end_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            time_accumulator: 0.0,
        }
    }

    /// Step the simulation forward by `dt` seconds of host time.
    ///
    /// Returns the number of fixed ticks that ran.
    pub fn step(&mut self, dt: f32) -> u32 {
        let fixed_dt = self.config().fixed_timestep;
        self.time_accumulator += dt;

        let mut ran = 0;
        while self.time_accumulator >= fixed_dt {
            self.tick();
            self.time_accumulator -= fixed_dt;
            ran += 1;
        }
        ran
    }

    /// Run exactly one fixed tick.
    pub fn tick(&mut self) {
        self.schedule.run(&mut self.world);
        log::trace!("tick {} done, {} entities", self.current_tick(), self.world.entities().len());
    }

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> SimResult<String> {
        snapshot_to_json_string(&self.snapshot())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick
    }

    pub fn current_time(&self) -> f32 {
        self.world.resource::<SimClock>().time
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn battle(&self) -> &Battle {
        self.world.resource::<Battle>()
    }

    pub fn status(&self) -> BattleStatus {
        self.battle().status
    }

    pub fn report(&self) -> Option<BattleReport> {
        self.battle().report
    }

    /// True once the post-battle delay has passed and the host should show
    /// its summary.
    pub fn summary_due(&self) -> bool {
        self.battle().summary_due
    }

    pub fn gold(&self) -> u32 {
        self.battle().gold
    }

    pub fn quadtree(&self) -> &Quadtree {
        self.world.resource::<Quadtree>()
    }

    /// Live units on `team`.
    pub fn unit_count(&mut self, team: Team) -> usize {
        let mut query = self.world.query_filtered::<&Team, (With<Unit>, Without<Destroyed>)>();
        query.iter(&self.world).filter(|t| **t == team).count()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Swap the behavior hooks for a unit kind.
    pub fn behaviors_mut(&mut self) -> Mut<'_, UnitBehaviors> {
        self.world.resource_mut::<UnitBehaviors>()
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Spawn a unit scaled to the current level. A unit joining a running
    /// fight is activated straight away.
    pub fn spawn_unit(&mut self, kind: UnitKind, team: Team, pos: Vec2) -> Entity {
        let now = self.current_time();
        let (size_factor, width) = {
            let config = self.config();
            (config.size_factor, config.bounds.width)
        };
        let fighting = self.battle().is_fighting();
        let id = self.world.resource_mut::<IdAllocator>().next_id();

        let mut bundle = UnitBundle::new(id, kind, team, pos, size_factor, now);
        if fighting {
            activate(&mut bundle.unit, now, width);
        }
        self.world.spawn(bundle).id()
    }

    /// Put a projectile in flight.
    pub fn spawn_projectile(&mut self, launch: Launch, team: Team, owner: Option<Entity>) -> Entity {
        let id = self.world.resource_mut::<IdAllocator>().next_id();
        self.world.spawn(launch.into_bundle(id, team, owner)).id()
    }

    pub fn spawn_explosion(&mut self, at: Vec2, spec: BlastSpec, damage: f32, team: Team) -> Entity {
        let id = self.world.resource_mut::<IdAllocator>().next_id();
        self.world.spawn(explosion_bundle(id, team, None, at, spec, damage)).id()
    }

    // ------------------------------------------------------------------
    // Phase commands
    // ------------------------------------------------------------------

    fn expect_phase(&self, expected: BattleStatus) -> SimResult<()> {
        let actual = self.status();
        if actual == expected {
            Ok(())
        } else {
            Err(SimError::WrongPhase { expected, actual })
        }
    }

    /// Start the fight: every unit gets global aggro and the level timer
    /// starts.
    pub fn fight(&mut self) -> SimResult<()> {
        self.expect_phase(BattleStatus::Prepare)?;
        let now = self.current_time();
        let (width, time_limit) = {
            let config = self.config();
            (config.bounds.width, config.level_time_limit)
        };

        let (mut begin_a, mut begin_b, mut cost_a, mut cost_b) = (0u32, 0u32, 0u32, 0u32);
        let mut query = self.world.query_filtered::<(&Team, &mut Unit), Without<Destroyed>>();
        for (team, mut unit) in query.iter_mut(&mut self.world) {
            activate(&mut unit, now, width);
            let cost = unit.kind.data().cost;
            match team {
                Team::Alpha => {
                    begin_a += 1;
                    cost_a += cost;
                }
                Team::Bravo => {
                    begin_b += 1;
                    cost_b += cost;
                }
                Team::None => {}
            }
        }

        let mut battle = self.world.resource_mut::<Battle>();
        battle.status = BattleStatus::Fight;
        battle.team_a_begin_count = begin_a;
        battle.team_b_begin_count = begin_b;
        battle.team_a_cost = cost_a;
        battle.team_b_cost = cost_b;
        battle.level_timer = Timer::started(now, time_limit);
        log::info!("fight! alpha {} units ({} gold) vs bravo {} units ({} gold)", begin_a, cost_a, begin_b, cost_b);
        Ok(())
    }

    /// Back to Prepare. Reloads the current level when one is loaded,
    /// otherwise leaves an empty field.
    pub fn restart(&mut self) -> SimResult<()> {
        match self.battle().level {
            Some(index) => self.load_level(index),
            None => {
                self.clear_field();
                self.world.resource_mut::<Battle>().reset();
                log::info!("battle restarted");
                Ok(())
            }
        }
    }

    /// Clear the field and set up level `index`: scale, Bravo army and the
    /// player's gold.
    pub fn load_level(&mut self, index: usize) -> SimResult<()> {
        let spec = level_spec(index)?;
        self.clear_field();
        {
            let mut battle = self.world.resource_mut::<Battle>();
            battle.reset();
            battle.level = Some(index);
        }

        let bounds = {
            let mut config = self.world.resource_mut::<SimConfig>();
            config.size_factor = spec.size_factor;
            config.bounds
        };
        let army = enemy_army(index, &bounds, &mut self.world.resource_mut::<SimRng>())?;
        for (kind, pos) in &army {
            self.spawn_unit(*kind, Team::Bravo, *pos);
        }

        let cost = army_cost(&army);
        let gold = self.config().difficulty.starting_gold(cost);
        let mut battle = self.world.resource_mut::<Battle>();
        battle.team_b_cost = cost;
        battle.gold = gold;
        log::info!(
            "level {} loaded: {} enemies worth {}, {} gold to spend",
            index + 1,
            army.len(),
            cost,
            gold
        );
        Ok(())
    }

    /// Takes effect on the next level load or restart.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.world.resource_mut::<SimConfig>().difficulty = difficulty;
    }

    /// Despawn every entity and restart id allocation.
    fn clear_field(&mut self) {
        let mut query = self.world.query_filtered::<Entity, With<EntityId>>();
        let entities: Vec<Entity> = query.iter(&self.world).collect();
        for entity in entities {
            self.world.despawn(entity);
        }
        self.world.resource_mut::<IdAllocator>().reset();
        self.world.resource_mut::<Quadtree>().clear();
        self.world.resource_mut::<EventBuffer>().clear();
        self.time_accumulator = 0.0;
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Radius a unit of any kind has on the current level.
    fn unit_radius(&self) -> f32 {
        Vec2::splat(UNIT_SIDE * self.config().size_factor).length()
    }

    fn alpha_positions(&mut self) -> Vec<Vec2> {
        let mut query = self.world.query_filtered::<(&Team, &Position), (With<Unit>, Without<Destroyed>)>();
        query
            .iter(&self.world)
            .filter(|(team, _)| **team == Team::Alpha)
            .map(|(_, pos)| pos.0)
            .collect()
    }

    /// Place Alpha units under the brush at `pos`, one per free cell while
    /// gold lasts. Returns how many were placed.
    pub fn place_unit(&mut self, kind: UnitKind, pos: Vec2, brush: Brush) -> SimResult<usize> {
        let status = self.status();
        if status == BattleStatus::Ended {
            return Err(SimError::WrongPhase {
                expected: BattleStatus::Prepare,
                actual: status,
            });
        }
        if self.battle().level.is_some_and(|level| !is_kind_unlocked(level, kind)) {
            return Err(SimError::KindLocked(kind.name()));
        }
        let cost = kind.data().cost;
        let available = self.gold();
        if cost > available {
            log::debug!("cannot afford {} ({} > {})", kind.name(), cost, available);
            return Err(SimError::InsufficientGold {
                needed: cost,
                available,
            });
        }

        let cell = grid_cell(self.unit_radius());
        let centre = snap(pos, cell);
        if !in_placement_zone(self.config(), centre) {
            log::debug!("placement at ({:.0}, {:.0}) outside the zone", pos.x, pos.y);
            return Err(SimError::OutsidePlacementZone { x: pos.x, y: pos.y });
        }

        let mut occupied = self.alpha_positions();
        let mut gold = available;
        let mut placed = 0;
        for point in brush_points(pos, cell, brush) {
            if gold < cost {
                break;
            }
            if !in_placement_zone(self.config(), point) || !is_cell_free(point, cell, &occupied) {
                continue;
            }
            self.spawn_unit(kind, Team::Alpha, point);
            occupied.push(point);
            gold -= cost;
            placed += 1;
        }

        if placed == 0 {
            log::debug!("cell at ({:.0}, {:.0}) already taken", centre.x, centre.y);
            return Err(SimError::PlaceOccupied {
                x: centre.x,
                y: centre.y,
            });
        }
        let mut battle = self.world.resource_mut::<Battle>();
        battle.gold = gold;
        battle.team_a_cost += cost * placed as u32;
        Ok(placed)
    }

    /// Remove Alpha units within the brush's reach of `pos` and refund them.
    /// Returns the gold refunded.
    pub fn remove_units(&mut self, pos: Vec2, brush: Brush) -> SimResult<u32> {
        self.expect_phase(BattleStatus::Prepare)?;
        let reach = brush.removal_factor() * self.unit_radius();
        Ok(self.refund_alpha(|unit_pos| unit_pos.distance(pos) < reach))
    }

    /// Remove every Alpha unit and refund them.
    pub fn clear_placement(&mut self) -> SimResult<u32> {
        self.expect_phase(BattleStatus::Prepare)?;
        Ok(self.refund_alpha(|_| true))
    }

    fn refund_alpha(&mut self, mut hit: impl FnMut(Vec2) -> bool) -> u32 {
        let mut query = self.world.query_filtered::<(Entity, &Team, &Position, &Unit), Without<Destroyed>>();
        let removed: Vec<(Entity, u32)> = query
            .iter(&self.world)
            .filter(|(_, team, pos, _)| **team == Team::Alpha && hit(pos.0))
            .map(|(entity, _, _, unit)| (entity, unit.kind.data().cost))
            .collect();

        let mut refund = 0;
        for (entity, cost) in removed {
            self.world.despawn(entity);
            refund += cost;
        }
        let mut battle = self.world.resource_mut::<Battle>();
        battle.gold += refund;
        battle.team_a_cost = battle.team_a_cost.saturating_sub(refund);
        refund
    }

    /// Left button places `kind`, right button removes.
    pub fn apply_pointer(&mut self, input: &PointerInput, kind: UnitKind, brush: Brush) -> SimResult<()> {
        if input.left {
            self.place_unit(kind, input.position(), brush)?;
        }
        if input.right {
            self.remove_units(input.position(), brush)?;
        }
        Ok(())
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Global aggro and fresh cooldowns for a unit entering the fight.
fn activate(unit: &mut Unit, now: f32, field_width: f32) {
    unit.vision_range = field_width;
    unit.attack_cooldown.set(now, 0.0);
    if matches!(unit.kind, UnitKind::Archer | UnitKind::Artillery | UnitKind::Cavalry) {
        unit.shoot_cooldown.set(now, FIRST_SHOT_WAIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::BattleResult;

    #[test]
    fn test_new_world() {
        let mut sim = SimWorld::new();
        assert_eq!(sim.current_tick(), 0);
        assert_eq!(sim.status(), BattleStatus::Prepare);
        assert_eq!(sim.unit_count(Team::Alpha), 0);
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = SimConfig {
            quadtree_max_objects: 0,
            ..Default::default()
        };
        assert!(matches!(SimWorld::with_config(config), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_step_accumulates_fixed_ticks() {
        let mut sim = SimWorld::new();
        assert_eq!(sim.step(0.01), 0);
        assert_eq!(sim.step(0.01), 1);
        assert_eq!(sim.step(1.0 / 30.0), 2);
        assert_eq!(sim.current_tick(), 3);
    }

    #[test]
    fn test_prepare_units_stay_put() {
        let mut sim = SimWorld::new();
        let unit = sim.spawn_unit(UnitKind::Troop, Team::Alpha, Vec2::new(300.0, 500.0));
        sim.spawn_unit(UnitKind::Troop, Team::Bravo, Vec2::new(300.0, 200.0));
        for _ in 0..30 {
            sim.tick();
        }
        assert_eq!(sim.world().get::<Position>(unit).unwrap().0, Vec2::new(300.0, 500.0));
        assert_eq!(sim.status(), BattleStatus::Prepare);
    }

    #[test]
    fn test_fight_activates_units() {
        let mut sim = SimWorld::new();
        let archer = sim.spawn_unit(UnitKind::Archer, Team::Alpha, Vec2::new(300.0, 500.0));
        sim.spawn_unit(UnitKind::Troop, Team::Bravo, Vec2::new(300.0, 200.0));
        sim.fight().unwrap();

        let unit = sim.world().get::<Unit>(archer).unwrap();
        assert_eq!(unit.vision_range, 1280.0);
        assert!(unit.shoot_cooldown.active(0.5));
        let battle = sim.battle();
        assert_eq!(battle.status, BattleStatus::Fight);
        assert_eq!(battle.team_a_begin_count, 1);
        assert_eq!(battle.team_b_begin_count, 1);
        assert_eq!(battle.team_a_cost, 120);

        assert!(matches!(sim.fight(), Err(SimError::WrongPhase { .. })));
    }

    #[test]
    fn test_shooters_wait_before_first_shot() {
        let mut sim = SimWorld::new();
        let shooters = [UnitKind::Archer, UnitKind::Artillery, UnitKind::Cavalry]
            .map(|kind| sim.spawn_unit(kind, Team::Alpha, Vec2::new(300.0, 500.0)));
        let troop = sim.spawn_unit(UnitKind::Troop, Team::Bravo, Vec2::new(300.0, 200.0));
        sim.fight().unwrap();

        for entity in shooters {
            let unit = sim.world().get::<Unit>(entity).unwrap();
            assert!(unit.shoot_cooldown.is_set(), "{:?}", unit.kind);
            assert!(unit.shoot_cooldown.active(0.5), "{:?}", unit.kind);
            assert!(unit.shoot_cooldown.elapsed(1.1), "{:?}", unit.kind);
        }
        assert!(!sim.world().get::<Unit>(troop).unwrap().shoot_cooldown.is_set());
    }

    #[test]
    fn test_unit_joining_fight_is_activated() {
        let mut sim = SimWorld::new();
        sim.fight().unwrap();
        let late = sim.spawn_unit(UnitKind::Knight, Team::Alpha, Vec2::new(300.0, 500.0));
        assert_eq!(sim.world().get::<Unit>(late).unwrap().vision_range, 1280.0);
    }

    #[test]
    fn test_load_level_grants_gold() {
        let mut sim = SimWorld::new();
        sim.load_level(0).unwrap();
        assert_eq!(sim.unit_count(Team::Bravo), 10);
        assert_eq!(sim.battle().team_b_cost, 1000);
        assert_eq!(sim.gold(), 1500);
        assert_eq!(sim.config().size_factor, 2.0);

        sim.set_difficulty(Difficulty::Hard);
        sim.restart().unwrap();
        assert_eq!(sim.gold(), 1000);
        assert!(matches!(sim.load_level(99), Err(SimError::UnknownLevel(99))));
    }

    #[test]
    fn test_place_unit_spends_gold() {
        let mut sim = SimWorld::new();
        sim.load_level(0).unwrap();

        assert_eq!(sim.place_unit(UnitKind::Troop, Vec2::new(300.0, 500.0), Brush::Single).unwrap(), 1);
        assert_eq!(sim.gold(), 1400);
        assert_eq!(sim.unit_count(Team::Alpha), 1);
        assert!(matches!(
            sim.place_unit(UnitKind::Troop, Vec2::new(301.0, 501.0), Brush::Single),
            Err(SimError::PlaceOccupied { .. })
        ));
        assert!(matches!(
            sim.place_unit(UnitKind::Troop, Vec2::new(300.0, 200.0), Brush::Single),
            Err(SimError::OutsidePlacementZone { .. })
        ));
        assert!(matches!(
            sim.place_unit(UnitKind::Knight, Vec2::new(600.0, 500.0), Brush::Single),
            Err(SimError::KindLocked("Knight"))
        ));
    }

    #[test]
    fn test_cluster_skips_cells_outside_zone() {
        let mut sim = SimWorld::new();
        sim.load_level(0).unwrap(); // cell 56; centre snaps to y = 448
        let placed = sim.place_unit(UnitKind::Troop, Vec2::new(300.0, 450.0), Brush::Cluster).unwrap();
        assert_eq!(placed, 6);
        assert_eq!(sim.gold(), 900);
    }

    #[test]
    fn test_cluster_stops_when_gold_runs_out() {
        let mut sim = SimWorld::new();
        sim.world_mut().resource_mut::<Battle>().gold = 250;
        let placed = sim.place_unit(UnitKind::Troop, Vec2::new(300.0, 560.0), Brush::Cluster).unwrap();
        assert_eq!(placed, 2);
        assert_eq!(sim.gold(), 50);
        assert!(matches!(
            sim.place_unit(UnitKind::Troop, Vec2::new(600.0, 560.0), Brush::Single),
            Err(SimError::InsufficientGold { needed: 100, available: 50 })
        ));
    }

    #[test]
    fn test_remove_and_clear_refund() {
        let mut sim = SimWorld::new();
        sim.load_level(0).unwrap();
        sim.place_unit(UnitKind::Troop, Vec2::new(300.0, 560.0), Brush::Single).unwrap();
        sim.place_unit(UnitKind::Archer, Vec2::new(800.0, 560.0), Brush::Single).unwrap();
        assert_eq!(sim.gold(), 1280);

        assert_eq!(sim.remove_units(Vec2::new(300.0, 560.0), Brush::Single).unwrap(), 100);
        assert_eq!(sim.unit_count(Team::Alpha), 1);
        assert_eq!(sim.clear_placement().unwrap(), 120);
        assert_eq!(sim.gold(), 1500);
        assert_eq!(sim.battle().team_a_cost, 0);
        // Bravo is untouched.
        assert_eq!(sim.unit_count(Team::Bravo), 10);
    }

    #[test]
    fn test_pointer_input() {
        let mut sim = SimWorld::new();
        sim.load_level(0).unwrap();
        let press = PointerInput {
            x: 300.0,
            y: 560.0,
            left: true,
            right: false,
        };
        sim.apply_pointer(&press, UnitKind::Testudo, Brush::Single).unwrap();
        assert_eq!(sim.unit_count(Team::Alpha), 1);

        let erase = PointerInput {
            left: false,
            right: true,
            ..press
        };
        sim.apply_pointer(&erase, UnitKind::Testudo, Brush::Single).unwrap();
        assert_eq!(sim.unit_count(Team::Alpha), 0);

        sim.fight().unwrap();
        assert!(matches!(
            sim.apply_pointer(&erase, UnitKind::Testudo, Brush::Single),
            Err(SimError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_restart_after_battle() {
        let mut sim = SimWorld::new();
        sim.spawn_unit(UnitKind::Knight, Team::Alpha, Vec2::new(640.0, 500.0));
        sim.fight().unwrap();
        while sim.status() != BattleStatus::Ended {
            sim.tick();
        }
        assert_eq!(sim.report().map(|r| r.result), Some(BattleResult::Win));

        sim.restart().unwrap();
        assert_eq!(sim.status(), BattleStatus::Prepare);
        assert!(sim.report().is_none());
        assert_eq!(sim.unit_count(Team::Alpha), 0);
        assert!(sim.snapshot().entities.is_empty());
    }

    #[test]
    fn test_snapshot_json() {
        let mut sim = SimWorld::new();
        sim.spawn_unit(UnitKind::Archer, Team::Bravo, Vec2::new(100.0, 100.0));
        let json = sim.snapshot_json().unwrap();
        assert!(json.contains("\"status\":\"Prepare\""));
        assert!(json.contains("Archer"));
    }
}
