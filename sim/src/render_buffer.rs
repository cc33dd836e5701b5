//! Flat render buffer
//!
//! Converts a [`Snapshot`] into a contiguous `Vec<f32>` that a renderer can
//! copy across an FFI boundary without parsing JSON.
//!
//! # Buffer Layout (Version 1.0)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ HEADER (3 elements)                                             │
//! │   [0] entity_count   [1] status_id   [2] tick                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ For each entity i (offset = HEADER_SIZE + i * ENTITY_STRIDE):   │
//! │   [+0]  id          - EntityId (u32 as f32)                     │
//! │   [+1]  x           - X position                                │
//! │   [+2]  y           - Y position                                │
//! │   [+3]  z           - Height offset                             │
//! │   [+4]  radius      - Collision radius                          │
//! │   [+5]  team_id     - 0=None, 1=Alpha, 2=Bravo                  │
//! │   [+6]  kind_id     - Unit kind 0-5, projectiles 10-12          │
//! │   [+7]  health_pct  - 0.0-1.0                                   │
//! │   [+8]  armor_pct   - 0.0-1.0                                   │
//! │   [+9]  facing      - Radians                                   │
//! │   [+10] anim_state  - 0=none, 1=idle, 2=attack                  │
//! │   [+11] anim_frame  - Frame index                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entities appear in the snapshot's order (ascending id), so the same
//! snapshot always yields the same buffer.

use crate::battle::BattleStatus;
use crate::components::AnimPhase;
use crate::world::Snapshot;

/// Number of f32 values per entity.
///
/// **Part of the stable buffer contract. Do not change without versioning.**
pub const ENTITY_STRIDE: usize = 12;

/// Number of f32 values in the buffer header.
pub const HEADER_SIZE: usize = 3;

pub const FIELD_ID: usize = 0;
pub const FIELD_X: usize = 1;
pub const FIELD_Y: usize = 2;
pub const FIELD_Z: usize = 3;
pub const FIELD_RADIUS: usize = 4;
pub const FIELD_TEAM: usize = 5;
pub const FIELD_KIND: usize = 6;
pub const FIELD_HEALTH_PCT: usize = 7;
pub const FIELD_ARMOR_PCT: usize = 8;
pub const FIELD_FACING: usize = 9;
pub const FIELD_ANIM_STATE: usize = 10;
pub const FIELD_ANIM_FRAME: usize = 11;

#[inline]
pub fn status_to_id(status: BattleStatus) -> f32 {
    match status {
        BattleStatus::Prepare => 0.0,
        BattleStatus::Fight => 1.0,
        BattleStatus::Ended => 2.0,
    }
}

#[inline]
fn anim_fields(anim: Option<AnimPhase>) -> (f32, f32) {
    match anim {
        None => (0.0, 0.0),
        Some(AnimPhase::Idle { frame }) => (1.0, frame as f32),
        Some(AnimPhase::Attack { frame }) => (2.0, frame as f32),
    }
}

/// Convert a snapshot to the flat buffer described in the module docs.
pub fn snapshot_to_render_buffer(snapshot: &Snapshot) -> Vec<f32> {
    let count = snapshot.entities.len();
    let mut buffer = Vec::with_capacity(calculate_buffer_size(count));

    buffer.push(count as f32);
    buffer.push(status_to_id(snapshot.status));
    buffer.push(snapshot.tick as f32);

    for entity in &snapshot.entities {
        let (anim_state, anim_frame) = anim_fields(entity.anim);
        buffer.extend_from_slice(&[
            entity.id as f32,
            entity.x,
            entity.y,
            entity.z,
            entity.radius,
            entity.team.id() as f32,
            entity.kind.id() as f32,
            entity.health_pct,
            entity.armor_pct,
            entity.facing,
            anim_state,
            anim_frame,
        ]);
    }

    debug_assert_eq!(buffer.len(), calculate_buffer_size(count), "Buffer size mismatch");
    buffer
}

#[inline]
pub fn calculate_buffer_size(entity_count: usize) -> usize {
    HEADER_SIZE + entity_count * ENTITY_STRIDE
}

/// Entity count from a buffer header. `None` for a truncated buffer.
#[inline]
pub fn parse_entity_count(buffer: &[f32]) -> Option<usize> {
    buffer.first().map(|count| *count as usize)
}

#[inline]
pub const fn entity_offset(index: usize) -> usize {
    HEADER_SIZE + index * ENTITY_STRIDE
}
