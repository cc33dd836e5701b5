//! Deadline timers on the simulation clock.
//!
//! A [`Timer`] stores an absolute deadline in simulation seconds, never a
//! wall-clock instant, so replays with the same tick sequence agree.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    deadline: Option<f32>,
    duration: f32,
}

impl Timer {
    /// A timer armed at `now` for `duration` seconds.
    pub fn started(now: f32, duration: f32) -> Self {
        let mut timer = Self::default();
        timer.set(now, duration);
        timer
    }

    pub fn set(&mut self, now: f32, duration: f32) {
        self.deadline = Some(now + duration);
        self.duration = duration;
    }

    pub fn unset(&mut self) {
        self.deadline = None;
        self.duration = 0.0;
    }

    pub fn is_set(&self) -> bool {
        self.deadline.is_some()
    }

    /// Set and the deadline has not passed yet.
    pub fn active(&self, now: f32) -> bool {
        matches!(self.deadline, Some(deadline) if now <= deadline)
    }

    /// Set and the deadline has passed.
    pub fn elapsed(&self, now: f32) -> bool {
        matches!(self.deadline, Some(deadline) if now > deadline)
    }

    /// Fraction of the set duration already elapsed, clamped to `[0, 1]`.
    pub fn p100(&self, now: f32) -> f32 {
        match self.deadline {
            Some(deadline) if self.duration > 0.0 => {
                let start = deadline - self.duration;
                ((now - start) / self.duration).clamp(0.0, 1.0)
            }
            Some(deadline) if now > deadline => 1.0,
            _ => 0.0,
        }
    }
}
