//! Battle Commander - Simulation Core
//!
//! A deterministic, fixed-timestep ECS simulation of a two-team medieval
//! battle. Uses `bevy_ecs` for the entity-component-system architecture.
//!
//! The host places its army during the Prepare phase, starts the fight and
//! then only steps the world and reads [`Snapshot`]s until a
//! [`BattleReport`] comes out.

pub mod api;
pub mod battle;
pub mod components;
pub mod config;
pub mod error;
pub mod level;
pub mod math;
pub mod placement;
pub mod render_buffer;
pub mod spatial;
pub mod systems;
pub mod timer;
pub mod unit_data;
pub mod world;

pub use api::SimWorld;
pub use battle::{Battle, BattleReport, BattleResult, BattleStatus, Kills};
pub use components::*;
pub use config::{SimConfig, SimRng, SplashPolicy};
pub use error::{SimError, SimResult};
pub use level::{Difficulty, LevelSpec, LEVELS};
pub use math::{Rect, Vec2};
pub use placement::{Brush, PointerInput};
pub use spatial::{Circle, Quadtree};
pub use systems::*;
pub use timer::Timer;
pub use unit_data::{UnitBehavior, UnitBehaviors, UnitData, UnitKind};
pub use world::{CosmeticEvent, EntityKind, EntitySnapshot, Snapshot};
