//! The creature root: a virtual segment owning the skeleton and its limb
//! systems, with forward and rotational speed integrators.
//!
//! Each tick the creature steers toward the supplied target, moves, drags
//! its non-limb children rigidly behind it and re-solves every limb
//! system. Forward acceleration is gated by the fraction of systems that
//! currently have a foot on the ground.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::limb::LimbSystem;
use crate::segment::{Pose, Skeleton};
use crate::types::{wrap_angle, LocomotionTunables, RigError, SegmentId, SystemId};
use crate::{CreatureRenderData, HeadRenderData};

/// Radius of the head indicator arc.
pub const HEAD_RADIUS: f32 = 4.0;

/// An articulated creature chasing a target point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub position: Vec2,
    /// World-frame heading, wrapped to `(-PI, PI]` after every tick.
    pub angle: f32,
    pub forward_speed: f32,
    pub turn_speed: f32,
    /// Ground speed actually applied last tick (friction-floored at zero).
    speed: f32,
    pub tunables: LocomotionTunables,
    skeleton: Skeleton,
    systems: Vec<LimbSystem>,
}

impl Creature {
    pub fn new(
        position: Vec2,
        angle: f32,
        tunables: LocomotionTunables,
    ) -> Result<Self, RigError> {
        tunables.validate()?;
        Ok(Self {
            position,
            angle,
            forward_speed: 0.0,
            turn_speed: 0.0,
            speed: 0.0,
            tunables,
            skeleton: Skeleton::new(),
            systems: Vec::new(),
        })
    }

    /// Append a segment under `parent` (`None` = the creature root).
    pub fn attach_segment(
        &mut self,
        parent: Option<SegmentId>,
        length: f32,
        def_angle: f32,
        range: f32,
        stiffness: f32,
    ) -> Result<SegmentId, RigError> {
        let pose = self.pose();
        self.skeleton
            .attach(parent, length, def_angle, range, stiffness, pose)
    }

    /// Bind a plain limb system over the chain ending at `end`.
    pub fn attach_limb(
        &mut self,
        end: SegmentId,
        chain_len: usize,
        reach_speed: f32,
    ) -> Result<SystemId, RigError> {
        let system = LimbSystem::limb(&self.skeleton, end, chain_len, reach_speed)?;
        self.systems.push(system);
        Ok(SystemId(self.systems.len() as u32 - 1))
    }

    /// Bind a leg system over the chain ending at `end`, planted where the
    /// foot currently stands.
    pub fn attach_leg(
        &mut self,
        end: SegmentId,
        chain_len: usize,
        reach_speed: f32,
    ) -> Result<SystemId, RigError> {
        let pose = self.pose();
        let system = LimbSystem::leg(&self.skeleton, pose, end, chain_len, reach_speed)?;
        self.systems.push(system);
        Ok(SystemId(self.systems.len() as u32 - 1))
    }

    /// Advance the whole rig one tick toward `target`.
    pub fn tick(&mut self, target: Vec2, rng: &mut impl Rng) {
        let t = self.tunables;
        let to_target = target - self.position;
        let dist = to_target.length();
        let heading = to_target.y.atan2(to_target.x);

        // Forward integrator, gated by how many feet are on the ground
        let accel = t.forward_accel * self.grounded_fraction();
        if dist > t.move_threshold {
            self.forward_speed += accel;
        }
        self.forward_speed *= 1.0 - t.forward_resistance;
        self.speed = (self.forward_speed - t.forward_friction).max(0.0);

        // Rotational integrator with a hard zero floor on friction
        let diff = wrap_angle(self.angle - heading);
        if diff.abs() > t.turn_threshold && dist > t.move_threshold {
            self.turn_speed -= t.turn_accel * if diff > 0.0 { 1.0 } else { -1.0 };
        }
        self.turn_speed *= 1.0 - t.turn_resistance;
        if self.turn_speed.abs() > t.turn_friction {
            self.turn_speed -= t.turn_friction * if self.turn_speed > 0.0 { 1.0 } else { -1.0 };
        } else {
            self.turn_speed = 0.0;
        }

        self.angle = wrap_angle(self.angle + self.turn_speed);
        self.position += self.speed * Vec2::from_angle(self.angle);

        // The rig trails behind the direction of travel
        let trailing = Pose {
            position: self.position,
            angle: self.angle + PI,
        };
        let roots: Vec<SegmentId> = self.skeleton.roots().to_vec();
        for id in roots {
            self.skeleton.follow(id, trailing, true);
        }
        for system in &mut self.systems {
            system.update(&mut self.skeleton, trailing, target, rng);
        }
    }

    /// Fraction of systems currently planted (1 when there are none).
    pub fn grounded_fraction(&self) -> f32 {
        if self.systems.is_empty() {
            return 1.0;
        }
        let planted = self.systems.iter().filter(|s| s.is_planted()).count();
        planted as f32 / self.systems.len() as f32
    }

    /// Geometry for the external renderer: head indicator plus one line
    /// per segment in tree order.
    pub fn render_data(&self) -> CreatureRenderData {
        let mut bones = Vec::with_capacity(self.skeleton.len());
        self.skeleton.bones(self.trailing_pose(), &mut bones);
        CreatureRenderData {
            head: HeadRenderData {
                position: self.position,
                radius: HEAD_RADIUS,
                heading: self.angle,
            },
            bones,
        }
    }

    /// Root pose in the facing frame.
    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            angle: self.angle,
        }
    }

    fn trailing_pose(&self) -> Pose {
        Pose {
            position: self.position,
            angle: self.angle + PI,
        }
    }

    /// Ground speed applied last tick. Never negative.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn systems(&self) -> &[LimbSystem] {
        &self.systems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limb::GaitState;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::f32::consts::TAU;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(1)
    }

    fn bare_creature() -> Creature {
        Creature::new(Vec2::ZERO, 0.0, LocomotionTunables::default()).unwrap()
    }

    #[test]
    fn test_rejects_bad_tunables() {
        let mut t = LocomotionTunables::default();
        t.turn_resistance = -0.1;
        assert!(matches!(
            Creature::new(Vec2::ZERO, 0.0, t),
            Err(RigError::InvalidResistance(_))
        ));
    }

    #[test]
    fn test_moves_toward_distant_target() {
        let mut c = bare_creature();
        let mut rng = rng();
        for _ in 0..20 {
            c.tick(Vec2::new(1000.0, 0.0), &mut rng);
            assert!(c.speed() >= 0.0);
        }
        assert!(c.position.x > 10.0, "creature did not advance: {}", c.position);
        assert!(c.position.y.abs() < 1e-3);
    }

    #[test]
    fn test_turns_toward_target_behind() {
        let mut c = bare_creature();
        let mut rng = rng();
        let initial_error = wrap_angle(c.angle - PI).abs();
        for _ in 0..60 {
            c.tick(Vec2::new(-1000.0, 0.0), &mut rng);
        }
        let final_error = wrap_angle(c.angle - PI).abs();
        assert!(
            final_error < initial_error,
            "heading error did not shrink: {initial_error} -> {final_error}"
        );
    }

    #[test]
    fn test_speed_decays_to_exact_zero_below_threshold() {
        let mut c = bare_creature();
        c.forward_speed = 40.0;
        let mut rng = rng();

        let mut last = f32::INFINITY;
        let mut zero_at = None;
        for i in 0..100 {
            // Target on top of the creature: always inside move_threshold
            c.tick(c.position, &mut rng);
            assert!(c.speed() >= 0.0);
            assert!(c.speed() <= last, "speed rose while coasting");
            last = c.speed();
            if c.speed() == 0.0 {
                zero_at = Some(i);
                break;
            }
        }
        // forward_speed halves each tick (resistance 0.5), so the friction
        // floor of 1.0 is reached within a handful of ticks
        let zero_at = zero_at.expect("speed never reached zero");
        assert!(zero_at < 20);
        assert_eq!(c.speed(), 0.0);
    }

    #[test]
    fn test_angle_stays_wrapped() {
        let mut c = bare_creature();
        let mut rng = rng();
        for i in 0..200 {
            // Orbiting target keeps the creature turning
            let theta = i as f32 * 0.3;
            let target = c.position + 500.0 * Vec2::from_angle(theta);
            c.tick(target, &mut rng);
            assert!(c.angle > -PI && c.angle <= PI);
        }
    }

    #[test]
    fn test_grounded_fraction_without_systems() {
        let c = bare_creature();
        assert_eq!(c.grounded_fraction(), 1.0);
    }

    #[test]
    fn test_grounded_fraction_counts_limbs_as_planted() {
        let mut c = bare_creature();
        let mut node = None;
        for _ in 0..3 {
            node = Some(c.attach_segment(node, 10.0, 0.0, TAU, 1.0).unwrap());
        }
        c.attach_limb(node.unwrap(), 3, 8.0).unwrap();
        assert_eq!(c.grounded_fraction(), 1.0);
    }

    #[test]
    fn test_grounded_fraction_drops_while_swinging() {
        let mut c = bare_creature();
        let a = c.attach_segment(None, 10.0, 0.0, TAU, 1.0).unwrap();
        let b = c.attach_segment(Some(a), 10.0, 0.0, TAU, 1.0).unwrap();
        c.attach_leg(b, 2, 8.0).unwrap();
        assert_eq!(c.grounded_fraction(), 1.0);

        // Teleport the body; the foot is yanked off its foothold
        c.position = Vec2::new(200.0, 0.0);
        let mut rng = rng();
        c.tick(c.position, &mut rng);
        assert_eq!(c.systems()[0].gait().unwrap().state, GaitState::Swinging);
        assert_eq!(c.grounded_fraction(), 0.0);
    }

    #[test]
    fn test_rigidity_holds_across_ticks() {
        let mut c = bare_creature();
        let mut node = None;
        for _ in 0..8 {
            node = Some(c.attach_segment(node, 6.0, 0.0, PI / 2.0, 1.0).unwrap());
        }
        let mut rng = rng();
        for i in 0..50 {
            let target = Vec2::new(300.0 - i as f32, 40.0);
            c.tick(target, &mut rng);
            for (id, seg) in c.skeleton().iter() {
                let parent = c.skeleton().parent_pose(id, c.pose());
                let d = (seg.position - parent.position).length();
                // Root-attached segments hang off the trailing pose, whose
                // position equals the root pose position
                assert!((d - seg.length).abs() < 1e-4, "link {id} length {d}");
            }
        }
    }

    #[test]
    fn test_render_data_shape() {
        let mut c = bare_creature();
        let a = c.attach_segment(None, 10.0, 0.0, TAU, 1.0).unwrap();
        let _b = c.attach_segment(Some(a), 10.0, 0.0, TAU, 1.0).unwrap();

        let data = c.render_data();
        assert_eq!(data.bones.len(), 2);
        assert_eq!(data.head.position, c.position);
        assert_eq!(data.head.radius, HEAD_RADIUS);
        // First bone starts at the creature root
        assert_eq!(data.bones[0].start, c.position);
    }
}
