//! ECS systems for the battle simulation.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Tick Order
//!
//! Every tick runs the systems below strictly in sequence (one chained
//! group, so deferred spawns and despawns are applied between steps):
//!
//! 1. `clock_system` - advances the clock, drops last tick's events
//! 2. `target_memory_system` - forgets expired targets
//! 3. `targeting_system` - picks targets for a capped, shuffled batch
//! 4. `unit_control_system` - animation, steering, attack and shoot hooks
//! 5. `projectile_flight_system` - ballistic flight and landing
//! 6. `blast_growth_system` - grows and retires explosions
//! 7. `quadtree_rebuild_system` - reindexes live bodies
//! 8. `collision_system` - pairwise separation and damage, then integration
//! 9. `destruction_system` - death callbacks and despawns
//! 10. `battle_end_system` - wipe-out, grace and level timers
//!
//! Targeting and collision skip the Prepare phase entirely; control only
//! animates units while the player is still placing.

pub mod battle;
pub mod clock;
pub mod combat;
pub mod destruction;
pub mod movement;
pub mod projectiles;
pub mod serialization;
pub mod targeting;

pub use battle::*;
pub use clock::*;
pub use combat::*;
pub use destruction::*;
pub use movement::*;
pub use projectiles::*;
pub use serialization::*;
pub use targeting::*;
