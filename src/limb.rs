//! Limb systems: chain solving toward a target, and the planted/swinging
//! gait state machine layered on top for legs.
//!
//! A system binds a contiguous ancestor path of segments (hip side first,
//! end-effector last) and drags it toward a point each tick with a single
//! backward reaching pass followed by a forward re-anchoring pass, so link
//! lengths hold exactly after every solve. Legs add a two-phase stepping
//! machine driven purely by geometric thresholds.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

use crate::segment::{Pose, Skeleton};
use crate::types::{wrap_angle, RigError, SegmentId};

/// Gait phase of a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaitState {
    /// Foot stationary at its goal point.
    Planted,
    /// Foot traveling to a freshly picked foothold.
    Swinging,
}

/// Stepping state carried only by leg systems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gait {
    pub state: GaitState,
    /// Current foothold (or foothold-in-progress while swinging).
    pub goal: Vec2,
    /// Signed projection of the foot along the hip's heading, tracked
    /// while swinging to detect when the step has landed.
    pub forwardness: f32,
    /// Comfortable hip-to-foot radius, 0.9 of the as-built distance.
    pub reach: f32,
    /// Neutral lift direction relative to the hip's orientation.
    pub swing: f32,
    pub swing_offset: f32,
}

/// Discriminates plain limbs (chase the external target) from legs
/// (chase their own foothold goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SystemKind {
    Limb,
    Leg(Gait),
}

/// An ordered sub-chain of segments solved toward a point each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimbSystem {
    /// Managed segments, topmost first, end-effector last. Each entry's
    /// parent is the previous entry; the first hangs off `hip`.
    chain: Vec<SegmentId>,
    end: SegmentId,
    /// First rigid ancestor not managed by this system; `None` is the
    /// creature root itself.
    hip: Option<SegmentId>,
    /// Maximum per-tick displacement of the end-effector toward a target.
    reach_speed: f32,
    kind: SystemKind,
}

impl LimbSystem {
    /// Bind a plain limb over the `chain_len` segments ending at `end`.
    ///
    /// The walk truncates at the creature root, so `chain_len` larger than
    /// the available ancestry just claims the whole branch.
    pub fn limb(
        skeleton: &Skeleton,
        end: SegmentId,
        chain_len: usize,
        reach_speed: f32,
    ) -> Result<Self, RigError> {
        let chain = Self::build_chain(skeleton, end, chain_len, reach_speed)?;
        let hip = skeleton.get(chain[0]).parent;
        Ok(Self {
            chain,
            end,
            hip,
            reach_speed,
            kind: SystemKind::Limb,
        })
    }

    /// Bind a leg over the `chain_len` segments ending at `end`, planted
    /// where the foot currently stands.
    ///
    /// `root` is the owning creature's pose at assembly time; it fixes the
    /// leg's neutral swing direction.
    pub fn leg(
        skeleton: &Skeleton,
        root: Pose,
        end: SegmentId,
        chain_len: usize,
        reach_speed: f32,
    ) -> Result<Self, RigError> {
        let chain = Self::build_chain(skeleton, end, chain_len, reach_speed)?;
        let hip = skeleton.get(chain[0]).parent;
        let hip_pose = skeleton.parent_pose(chain[0], root);
        let foot = skeleton.get(end).position;

        let to_foot = foot - hip_pose.position;
        let reach = 0.9 * to_foot.length();
        let rel = wrap_angle(root.angle - to_foot.y.atan2(to_foot.x));
        let lift = if rel < 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
        let gait = Gait {
            state: GaitState::Planted,
            goal: foot,
            forwardness: 0.0,
            reach,
            swing: -rel + lift,
            swing_offset: root.angle - hip_pose.angle,
        };
        Ok(Self {
            chain,
            end,
            hip,
            reach_speed,
            kind: SystemKind::Leg(gait),
        })
    }

    fn build_chain(
        skeleton: &Skeleton,
        end: SegmentId,
        chain_len: usize,
        reach_speed: f32,
    ) -> Result<Vec<SegmentId>, RigError> {
        if chain_len < 1 {
            return Err(RigError::InvalidChainLength(chain_len));
        }
        if !(reach_speed > 0.0) || !reach_speed.is_finite() {
            return Err(RigError::InvalidReachSpeed(reach_speed));
        }
        if !skeleton.contains(end) {
            return Err(RigError::UnknownSegment(end));
        }
        let mut chain = Vec::with_capacity(chain_len);
        let mut node = Some(end);
        while let Some(id) = node {
            if chain.len() == chain_len {
                break;
            }
            chain.push(id);
            node = skeleton.get(id).parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Drag the chain's end-effector toward `target`, by at most
    /// `reach_speed`, respecting every link length.
    ///
    /// One backward reaching pass places the nodes from the target inward;
    /// the forward pass derives the joint angles from that layout and
    /// re-anchors each link to its parent, which snaps the chain root back
    /// onto the hip. Off-chain branches rigidly follow their chain parent.
    pub fn solve_towards(&self, skeleton: &mut Skeleton, root: Pose, target: Vec2) {
        // Settle the whole subtree before dragging it
        skeleton.update_relative(self.chain[0], root, true, true);

        let end_pos = skeleton.get(self.end).position;
        let mut remaining = ((target - end_pos).length() - self.reach_speed).max(0.0);

        let mut anchor = target;
        for &id in self.chain.iter().rev() {
            let seg = skeleton.get(id);
            let toward = seg.position - anchor;
            let placed = anchor + remaining * Vec2::from_angle(toward.y.atan2(toward.x));
            let link = seg.length;
            skeleton.get_mut(id).position = placed;
            anchor = placed;
            remaining = link;
        }

        // Angles from the placed layout, parents included as placed
        let mut parent = skeleton.parent_pose(self.chain[0], root);
        for &id in &self.chain {
            let seg = skeleton.get_mut(id);
            let delta = seg.position - parent.position;
            seg.abs_angle = delta.y.atan2(delta.x);
            seg.rel_angle = seg.abs_angle - parent.angle;
            parent = Pose {
                position: seg.position,
                angle: seg.abs_angle,
            };
        }

        // Re-anchor positions to restore exact link lengths, and let
        // off-chain children follow their moved parent
        for &id in &self.chain {
            let anchor = skeleton.parent_pose(id, root);
            let children = {
                let seg = skeleton.get_mut(id);
                seg.position = anchor.position + seg.length * Vec2::from_angle(seg.abs_angle);
                seg.children.clone()
            };
            for child in children {
                if !self.chain.contains(&child) {
                    skeleton.update_relative(child, root, true, false);
                }
            }
        }
    }

    /// Per-tick update. Plain limbs chase the external `target`; legs
    /// chase their own foothold and run the gait machine.
    pub fn update(
        &mut self,
        skeleton: &mut Skeleton,
        root: Pose,
        target: Vec2,
        rng: &mut impl Rng,
    ) {
        if matches!(self.kind, SystemKind::Limb) {
            self.solve_towards(skeleton, root, target);
        } else {
            self.update_leg(skeleton, root, rng);
        }
    }

    fn update_leg(&mut self, skeleton: &mut Skeleton, root: Pose, rng: &mut impl Rng) {
        let goal = match &self.kind {
            SystemKind::Leg(gait) => gait.goal,
            SystemKind::Limb => return,
        };
        // The foot chain always tracks its current goal, whatever the state
        self.solve_towards(skeleton, root, goal);

        let end = skeleton.get(self.end).position;
        let hip = skeleton.parent_pose(self.chain[0], root);
        if let SystemKind::Leg(gait) = &mut self.kind {
            match gait.state {
                GaitState::Planted => {
                    // Body motion dragged the chain off its foothold
                    if (end - gait.goal).length() > 1.0 {
                        gait.state = GaitState::Swinging;
                        let heading = gait.swing + hip.angle + gait.swing_offset;
                        let jitter = Vec2::new(
                            rng.gen_range(-1.0f32..1.0),
                            rng.gen_range(-1.0f32..1.0),
                        ) * (gait.reach / 2.0);
                        gait.goal = hip.position + gait.reach * Vec2::from_angle(heading) + jitter;
                    }
                }
                GaitState::Swinging => {
                    let delta = end - hip.position;
                    let theta = delta.y.atan2(delta.x) - hip.angle;
                    let forwardness = delta.length() * theta.cos();
                    let df = gait.forwardness - forwardness;
                    gait.forwardness = forwardness;
                    // Foot stopped advancing relative to the hip: step done
                    if df * df < 1.0 {
                        gait.state = GaitState::Planted;
                        gait.goal = end;
                    }
                }
            }
        }
    }

    /// Whether this system counts toward the grounded fraction. Plain
    /// limbs are never mid-swing, so they always count.
    pub fn is_planted(&self) -> bool {
        match &self.kind {
            SystemKind::Limb => true,
            SystemKind::Leg(gait) => gait.state == GaitState::Planted,
        }
    }

    pub fn kind(&self) -> &SystemKind {
        &self.kind
    }

    /// Gait state, when this system is a leg.
    pub fn gait(&self) -> Option<&Gait> {
        match &self.kind {
            SystemKind::Leg(gait) => Some(gait),
            SystemKind::Limb => None,
        }
    }

    pub fn end(&self) -> SegmentId {
        self.end
    }

    /// Managed segments, topmost first.
    pub fn chain(&self) -> &[SegmentId] {
        &self.chain
    }

    pub fn hip(&self) -> Option<SegmentId> {
        self.hip
    }

    pub fn reach_speed(&self) -> f32 {
        self.reach_speed
    }
}
