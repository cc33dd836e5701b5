//! Simulation clock and tick-counted delays.
//!
//! Every deferred behavior in the simulation counts ticks rather than
//! waiting on wall-clock callbacks, so a given input sequence always
//! replays the same way.

use crate::components::*;
use crate::world::EventBuffer;
use bevy_ecs::prelude::*;

/// Tick counter and simulation time. `time` is always `tick * dt`.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimClock {
    pub tick: u64,
    pub time: f32,
    pub dt: f32,
}

impl SimClock {
    pub fn new(dt: f32) -> Self {
        Self { tick: 0, time: 0.0, dt }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.time = self.tick as f32 * self.dt;
    }
}

/// Advances the clock and drops last tick's cosmetic events.
pub fn clock_system(mut clock: ResMut<SimClock>, mut events: ResMut<EventBuffer>) {
    clock.advance();
    events.clear();
}

/// Counts down each unit's target memory and forgets the target at zero.
pub fn target_memory_system(mut units: Query<&mut Unit, Without<Destroyed>>) {
    for mut unit in units.iter_mut() {
        if unit.target_ttl == 0 {
            continue;
        }
        unit.target_ttl -= 1;
        if unit.target_ttl == 0 {
            unit.target = None;
        }
    }
}
