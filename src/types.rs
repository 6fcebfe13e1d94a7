//! Common types for the rig: identifiers, angle helpers, locomotion
//! tunables and the construction error.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use thiserror::Error;

/// Stable index of a segment inside its creature's skeleton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub(crate) u32);

impl SegmentId {
    /// Get the raw arena index (useful for debugging/serialization)
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Segment({})", self.0)
    }
}

/// Index of a limb/leg system inside its creature's system list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SystemId(pub(crate) u32);

impl SystemId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Unique identifier for a creature registered in a [`CreatureManager`].
///
/// Allocated from the manager's own counter, so two managers may hand out
/// overlapping ids; ids are only meaningful within one manager.
///
/// [`CreatureManager`]: crate::spawning::CreatureManager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreatureId(pub(crate) u64);

impl std::fmt::Display for CreatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Creature({})", self.0)
    }
}

/// Wrap an angle into the canonical range `(-PI, PI]`.
///
/// Idempotent: `wrap_angle(wrap_angle(a)) == wrap_angle(a)`.
pub fn wrap_angle(theta: f32) -> f32 {
    let r = theta.rem_euclid(TAU);
    if r > PI {
        r - TAU
    } else {
        r
    }
}

/// Wrap an angle to the representative in `(center - PI, center + PI]`.
///
/// Joint angles wrap around their rest angle, not around zero, so a joint
/// resting near `PI` does not oscillate across the seam.
pub fn wrap_around(theta: f32, center: f32) -> f32 {
    center + wrap_angle(theta - center)
}

/// The eight locomotion tunables of a creature.
///
/// Forward motion and rotation each get an acceleration, a friction
/// (constant decay with a hard zero floor), a resistance (multiplicative
/// decay factor in `[0, 1)`) and a dead-zone threshold below which the
/// integrator stops accelerating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocomotionTunables {
    pub forward_accel: f32,
    pub forward_friction: f32,
    pub forward_resistance: f32,
    /// Distance to the target below which the creature stops surging.
    pub move_threshold: f32,
    pub turn_accel: f32,
    pub turn_friction: f32,
    pub turn_resistance: f32,
    /// Heading error below which the creature stops turning.
    pub turn_threshold: f32,
}

impl LocomotionTunables {
    /// Validate the tunables for construction.
    pub(crate) fn validate(&self) -> Result<(), RigError> {
        for r in [self.forward_resistance, self.turn_resistance] {
            if !(0.0..1.0).contains(&r) {
                return Err(RigError::InvalidResistance(r));
            }
        }
        let all = [
            self.forward_accel,
            self.forward_friction,
            self.move_threshold,
            self.turn_accel,
            self.turn_friction,
            self.turn_threshold,
        ];
        if let Some(&v) = all.iter().find(|v| !v.is_finite()) {
            return Err(RigError::NonFiniteTunable(v));
        }
        Ok(())
    }
}

impl Default for LocomotionTunables {
    fn default() -> Self {
        Self {
            forward_accel: 12.0,
            forward_friction: 1.0,
            forward_resistance: 0.5,
            move_threshold: 16.0,
            turn_accel: 0.5,
            turn_friction: 0.085,
            turn_resistance: 0.5,
            turn_threshold: 0.3,
        }
    }
}

/// Errors raised while assembling a rig. Steady-state ticking never fails.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RigError {
    #[error("segment length must be positive and finite, got {0}")]
    InvalidSegmentLength(f32),
    #[error("segment stiffness must be at least 1, got {0}")]
    InvalidStiffness(f32),
    #[error("segment angular range must be non-negative, got {0}")]
    InvalidRange(f32),
    #[error("limb chain length must be at least 1, got {0}")]
    InvalidChainLength(usize),
    #[error("limb reach speed must be positive and finite, got {0}")]
    InvalidReachSpeed(f32),
    #[error("resistance must lie in [0, 1), got {0}")]
    InvalidResistance(f32),
    #[error("locomotion tunable must be finite, got {0}")]
    NonFiniteTunable(f32),
    #[error("unknown segment id {0}")]
    UnknownSegment(SegmentId),
}
