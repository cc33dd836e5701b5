//! Simulation configuration and the seeded random source.

use crate::error::{SimError, SimResult};
use crate::level::Difficulty;
use crate::math::Rect;
use bevy_ecs::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How an explosion treats a unit it already damaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplashPolicy {
    /// Damage every overlapping unit on every tick the explosion lives.
    #[default]
    EveryTick,
    /// Damage each unit at most once per explosion.
    OncePerTarget,
}

/// Tuning knobs for the battle simulation.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed timestep in seconds.
    pub fixed_timestep: f32,
    /// Playfield rectangle.
    pub bounds: Rect,
    /// Height of the host's control bar along the bottom edge; no placement there.
    pub control_bar_height: f32,
    pub quadtree_max_objects: usize,
    pub quadtree_max_levels: u32,
    /// Velocity multiplier applied every tick after acceleration.
    pub drag: f32,
    /// Speed kept when bouncing off a field edge.
    pub restitution: f32,
    /// Max units considered by the targeting pass per tick.
    pub targeting_cap: usize,
    /// Randomized window (ms) after which a chosen target is forgotten.
    pub target_memory_ms: (f32, f32),
    /// Seconds between one side being wiped out and the result.
    pub grace_delay: f32,
    /// Seconds between the result and the host's summary screen.
    pub summary_delay: f32,
    /// Hard cap on a fight's duration in seconds.
    pub level_time_limit: f32,
    pub splash_policy: SplashPolicy,
    /// Level scale; unit sizes are multiplied by it.
    pub size_factor: f32,
    /// Downward speed removed from hopping units each tick.
    pub gravity: f32,
    pub difficulty: Difficulty,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0, // 60 Hz
            bounds: Rect::new(0.0, 0.0, 1280.0, 800.0),
            control_bar_height: 120.0,
            quadtree_max_objects: 3,
            quadtree_max_levels: 4,
            drag: 0.95,
            restitution: 0.95,
            targeting_cap: 100,
            target_memory_ms: (500.0, 800.0),
            grace_delay: 1.5,
            summary_delay: 2.0,
            level_time_limit: 60.0,
            splash_policy: SplashPolicy::EveryTick,
            size_factor: 1.0,
            gravity: 0.6,
            difficulty: Difficulty::Easy,
            seed: 0x5eed_ba77,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.fixed_timestep > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if !(self.bounds.width > 0.0 && self.bounds.height > 0.0) {
            return Err(SimError::InvalidConfig("bounds must have a positive area".into()));
        }
        if self.control_bar_height < 0.0 || self.control_bar_height >= self.bounds.height / 2.0 {
            return Err(SimError::InvalidConfig(
                "control_bar_height must fit inside the lower half of the field".into(),
            ));
        }
        if self.quadtree_max_objects == 0 {
            return Err(SimError::InvalidConfig("quadtree_max_objects must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.drag) || !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimError::InvalidConfig("drag and restitution must lie in [0, 1]".into()));
        }
        let (lo, hi) = self.target_memory_ms;
        if lo < 0.0 || hi < lo {
            return Err(SimError::InvalidConfig("target_memory_ms must be a non-negative range".into()));
        }
        if !(self.size_factor > 0.0) {
            return Err(SimError::InvalidConfig("size_factor must be positive".into()));
        }
        if self.grace_delay < 0.0 || self.summary_delay < 0.0 || !(self.level_time_limit > 0.0) {
            return Err(SimError::InvalidConfig("delays must be non-negative and the time limit positive".into()));
        }
        Ok(())
    }

    /// Melee and projectile damage multiplier; shrinks on large-scale levels.
    pub fn damage_factor(&self) -> f32 {
        (1.0 / self.size_factor).min(1.0)
    }

    /// Converts a duration in seconds to whole ticks, rounding up.
    pub fn ticks_for(&self, seconds: f32) -> u32 {
        (seconds / self.fixed_timestep).ceil().max(0.0) as u32
    }
}

/// Seeded random source shared by every system.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::from_seed(SimConfig::default().seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_timestep() {
        let config = SimConfig {
            fixed_timestep: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_leaf_capacity() {
        let config = SimConfig {
            quadtree_max_objects: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_damage_factor_caps_at_one() {
        let mut config = SimConfig::default();
        config.size_factor = 0.5;
        assert_eq!(config.damage_factor(), 1.0);
        config.size_factor = 2.0;
        assert_eq!(config.damage_factor(), 0.5);
    }

    #[test]
    fn test_ticks_for_rounds_up() {
        let config = SimConfig::default();
        assert_eq!(config.ticks_for(1.0), 60);
        assert_eq!(config.ticks_for(0.51), 31);
    }

    #[test]
    fn test_rng_is_reproducible() {
        let mut a = SimRng::from_seed(7);
        let mut b = SimRng::from_seed(7);
        let xs: Vec<u32> = (0..8).map(|_| a.0.gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.0.gen()).collect();
        assert_eq!(xs, ys);
    }
}
