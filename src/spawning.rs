//! Creature spawning and management.
//!
//! [`CreatureManager`] owns the session's creature population and its id
//! counter; [`RigPreset`] assembles the stock rig topologies (lizard,
//! squid, tentacle, arm) from the construction API.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::creature::Creature;
use crate::types::{CreatureId, LocomotionTunables, RigError, SegmentId};
use crate::CreatureRenderData;

/// Stock rig topologies.
///
/// The creature core is agnostic to body plans; these presets are the thin
/// configuration layer that picks segment counts, joint constraints and
/// locomotion tunables for a handful of known-good rigs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RigPreset {
    /// Segmented spine with rib fins, `legs` leg pairs and a tapering tail.
    Lizard { size: f32, legs: usize, tail: usize },
    /// Fan of long multi-joint legs, each with its own gait.
    Squid { size: f32, legs: usize },
    /// Single 32-joint chain dragged straight to the target.
    Tentacle,
    /// Three long segments reaching for the target.
    Arm,
}

impl RigPreset {
    /// Random lizard: more legs means a smaller body scale and a longer
    /// tail.
    pub fn random_lizard(rng: &mut impl Rng) -> Self {
        let legs = rng.gen_range(1..=12);
        let tail = 4 + rng.gen_range(0..legs * 8);
        RigPreset::Lizard {
            size: 8.0 / (legs as f32).sqrt(),
            legs,
            tail,
        }
    }

    /// Assemble a creature of this topology at the given pose.
    pub fn build(&self, position: Vec2, angle: f32) -> Result<Creature, RigError> {
        let creature = match *self {
            RigPreset::Lizard { size, legs, tail } => build_lizard(position, angle, size, legs, tail)?,
            RigPreset::Squid { size, legs } => build_squid(position, angle, size, legs)?,
            RigPreset::Tentacle => build_tentacle(position, angle)?,
            RigPreset::Arm => build_arm(position, angle)?,
        };
        log::debug!(
            "Built {} rig: {} segments, {} systems",
            self.name(),
            creature.skeleton().len(),
            creature.systems().len()
        );
        Ok(creature)
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            RigPreset::Lizard { .. } => "Lizard",
            RigPreset::Squid { .. } => "Squid",
            RigPreset::Tentacle => "Tentacle",
            RigPreset::Arm => "Arm",
        }
    }
}

impl std::fmt::Display for RigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn lizard_tunables(size: f32) -> LocomotionTunables {
    LocomotionTunables {
        forward_accel: size * 10.0,
        forward_friction: size * 2.0,
        ..LocomotionTunables::default()
    }
}

fn build_lizard(
    position: Vec2,
    angle: f32,
    size: f32,
    legs: usize,
    tail: usize,
) -> Result<Creature, RigError> {
    let s = size;
    let mut c = Creature::new(position, angle, lizard_tunables(s))?;

    // Neck and torso vertebrae, each with a pair of short rib fins
    let mut spine: Option<SegmentId> = None;
    for _ in 0..6 {
        spine = Some(c.attach_segment(spine, s * 4.0, 0.0, 2.0 * PI / 3.0, 1.1)?);
        for side in [-1.0f32, 1.0] {
            let mut node = c.attach_segment(spine, s * 3.0, side, 0.1, 2.0)?;
            for _ in 0..3 {
                node = c.attach_segment(Some(node), s * 0.1, -side * 0.1, 0.1, 2.0)?;
            }
        }
    }

    for pair in 0..legs {
        // Mid-body vertebrae between successive leg pairs
        if pair > 0 {
            for _ in 0..6 {
                spine = Some(c.attach_segment(spine, s * 4.0, 0.0, FRAC_PI_2, 1.5)?);
                for side in [-1.0f32, 1.0] {
                    let mut node =
                        c.attach_segment(spine, s * 3.0, side * FRAC_PI_2, 0.1, 1.5)?;
                    for _ in 0..3 {
                        node = c.attach_segment(Some(node), s * 3.0, -side * 0.3, 0.1, 2.0)?;
                    }
                }
            }
        }
        // One three-joint leg per side, with four toes on the foot
        for side in [-1.0f32, 1.0] {
            let hip = c.attach_segment(spine, s * 12.0, side * FRAC_PI_4, 0.0, 8.0)?;
            let knee = c.attach_segment(Some(hip), s * 16.0, -side * FRAC_PI_4, TAU, 1.0)?;
            let foot = c.attach_segment(Some(knee), s * 16.0, side * FRAC_PI_2, PI, 2.0)?;
            for toe in 0..4 {
                let splay = (toe as f32 / 3.0 - 0.5) * FRAC_PI_2;
                c.attach_segment(Some(foot), s * 4.0, splay, 0.1, 4.0)?;
            }
            c.attach_leg(foot, 3, s * 12.0)?;
        }
    }

    // Tapering tail with shrinking fins
    for i in 0..tail {
        spine = Some(c.attach_segment(spine, s * 4.0, 0.0, 2.0 * PI / 3.0, 1.1)?);
        let taper = (tail - i) as f32 / tail as f32;
        for side in [-1.0f32, 1.0] {
            let mut node = c.attach_segment(spine, s * 3.0, side, 0.1, 2.0)?;
            for _ in 0..3 {
                node = c.attach_segment(Some(node), s * 3.0 * taper, -side * 0.1, 0.1, 2.0)?;
            }
        }
    }
    Ok(c)
}

fn build_squid(position: Vec2, angle: f32, size: f32, legs: usize) -> Result<Creature, RigError> {
    let mut c = Creature::new(
        position,
        angle,
        LocomotionTunables {
            forward_accel: size * 10.0,
            forward_friction: size * 3.0,
            ..LocomotionTunables::default()
        },
    )?;

    const JOINTS: usize = 32;
    for leg in 0..legs {
        // Fan the legs across a quarter turn; a single leg points straight
        let fan = if legs > 1 {
            FRAC_PI_2 * (leg as f32 / (legs - 1) as f32 - 0.5)
        } else {
            0.0
        };
        let mut node: Option<SegmentId> = None;
        for joint in 0..JOINTS {
            let def = if joint == 0 { fan } else { 0.0 };
            node = Some(c.attach_segment(node, size * 64.0 / JOINTS as f32, def, PI, 1.2)?);
        }
        c.attach_leg(node.unwrap_or(SegmentId(0)), JOINTS, size * 30.0)?;
    }
    Ok(c)
}

fn build_tentacle(position: Vec2, angle: f32) -> Result<Creature, RigError> {
    let mut c = Creature::new(position, angle, LocomotionTunables::default())?;
    let mut node: Option<SegmentId> = None;
    for _ in 0..32 {
        node = Some(c.attach_segment(node, 8.0, 0.0, 2.0, 1.0)?);
    }
    c.attach_limb(node.unwrap_or(SegmentId(0)), 32, 8.0)?;
    Ok(c)
}

fn build_arm(position: Vec2, angle: f32) -> Result<Creature, RigError> {
    let mut c = Creature::new(position, angle, LocomotionTunables::default())?;
    let mut node: Option<SegmentId> = None;
    for _ in 0..3 {
        node = Some(c.attach_segment(node, 80.0, 0.0, PI, 1.0)?);
    }
    c.attach_limb(node.unwrap_or(SegmentId(0)), 3, 8.0)?;
    Ok(c)
}

/// Manages the creature population of one session.
///
/// Owns the id counter, so creature counting is a property of the manager
/// rather than ambient process state.
pub struct CreatureManager {
    creatures: HashMap<CreatureId, Creature>,
    max_creatures: usize,
    next_id: u64,
}

impl CreatureManager {
    /// Create new creature manager
    pub fn new(max_creatures: usize) -> Self {
        Self {
            creatures: HashMap::new(),
            max_creatures,
            next_id: 1,
        }
    }

    /// Register a built creature. Returns `None` when the population cap
    /// is reached.
    pub fn spawn(&mut self, creature: Creature) -> Option<CreatureId> {
        if !self.can_spawn() {
            log::warn!(
                "Cannot spawn creature: max population reached ({})",
                self.max_creatures
            );
            return None;
        }
        let id = CreatureId(self.next_id);
        self.next_id += 1;
        let position = creature.position;
        self.creatures.insert(id, creature);
        log::info!(
            "Spawned creature {} at ({:.1}, {:.1}). Population: {}/{}",
            id,
            position.x,
            position.y,
            self.count(),
            self.max_creatures
        );
        Some(id)
    }

    /// Build a preset rig and register it.
    pub fn spawn_preset(
        &mut self,
        preset: &RigPreset,
        position: Vec2,
        angle: f32,
    ) -> Result<Option<CreatureId>, RigError> {
        Ok(self.spawn(preset.build(position, angle)?))
    }

    /// Remove creature
    pub fn remove(&mut self, id: CreatureId) {
        if self.creatures.remove(&id).is_some() {
            log::info!(
                "Removed creature {}. Population: {}/{}",
                id,
                self.count(),
                self.max_creatures
            );
        }
    }

    /// Tick every creature toward the shared target point.
    pub fn update(&mut self, target: Vec2, rng: &mut impl Rng) {
        for creature in self.creatures.values_mut() {
            creature.tick(target, rng);
        }
    }

    /// Get render data for all creatures (for rendering)
    pub fn render_data(&self) -> Vec<CreatureRenderData> {
        self.creatures.values().map(|c| c.render_data()).collect()
    }

    /// Get number of active creatures
    pub fn count(&self) -> usize {
        self.creatures.len()
    }

    /// Check if can spawn more creatures
    pub fn can_spawn(&self) -> bool {
        self.creatures.len() < self.max_creatures
    }

    /// Get creature by ID
    pub fn get(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// Get mutable creature by ID
    pub fn get_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }
}
