//! Procedural 2D creature rig
//!
//! This crate implements:
//! - Segment trees: rigid, angle-constrained links in an arena
//! - Limb systems: IK-style chain solving toward a moving target
//! - Leg systems: a planted/swinging gait machine for stepping feet
//! - Creatures: locomotion integrators driving the whole rig per tick
//!
//! The crate is a pure simulation core: an external host supplies one
//! target coordinate per tick (pointer, touch, scripted path) and renders
//! the geometry the rig emits. Randomness for foothold placement is
//! injected as a seedable RNG, so runs are reproducible under test.

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub mod creature;
pub mod limb;
pub mod segment;
pub mod spawning;
pub mod types;

// Re-export main types for convenience
pub use creature::{Creature, HEAD_RADIUS};
pub use limb::{Gait, GaitState, LimbSystem, SystemKind};
pub use segment::{Pose, Segment, Skeleton};
pub use spawning::{CreatureManager, RigPreset};
pub use types::{CreatureId, LocomotionTunables, RigError, SegmentId, SystemId};

/// One skeletal line for the renderer: parent joint to child joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoneRenderData {
    pub start: Vec2,
    pub end: Vec2,
}

/// Head indicator: an open arc of `radius` facing `heading`, with a nose
/// wedge; the renderer realizes the actual strokes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadRenderData {
    pub position: Vec2,
    pub radius: f32,
    pub heading: f32,
}

/// Render data for an entire creature, emitted once per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureRenderData {
    pub head: HeadRenderData,
    pub bones: Vec<BoneRenderData>,
}
