//! Segment tree: rigid, angle-constrained links stored in an arena.
//!
//! Segments form a rooted tree hanging off the creature's root pose. The
//! arena owns every record; parent links are non-owning indices, so the
//! usual parent-pointer cycle never arises. Structure is fixed at assembly
//! time, only angles and positions mutate per tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::types::{wrap_around, RigError, SegmentId};
use crate::BoneRenderData;

/// World-frame pose of a parent frame (the creature root or a segment).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec2,
    pub angle: f32,
}

/// One rigid link in the skeletal tree.
///
/// `rel_angle` is the signed offset from the parent's absolute angle;
/// `def_angle` is the rest offset the joint relaxes toward, `range` the
/// total allowed deviation around it, and `stiffness` the damping divisor
/// of the relaxation spring (1 = snaps straight to rest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Parent link; `None` means attached directly to the creature root.
    pub parent: Option<SegmentId>,
    /// Owned children, in creation order (deterministic traversal).
    pub children: Vec<SegmentId>,
    pub length: f32,
    pub rel_angle: f32,
    pub def_angle: f32,
    pub range: f32,
    pub stiffness: f32,
    /// World-frame orientation, derived: `parent.abs_angle + rel_angle`.
    pub abs_angle: f32,
    /// World-frame position, derived: one `length` from the parent.
    pub position: Vec2,
}

/// Arena of all segments belonging to one creature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Skeleton {
    segments: Vec<Segment>,
    /// Segments attached directly to the creature root, in creation order.
    roots: Vec<SegmentId>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a segment under `parent` (`None` = the creature root) and
    /// settle it at its rest pose relative to `root`.
    pub fn attach(
        &mut self,
        parent: Option<SegmentId>,
        length: f32,
        def_angle: f32,
        range: f32,
        stiffness: f32,
        root: Pose,
    ) -> Result<SegmentId, RigError> {
        if !(length > 0.0) || !length.is_finite() {
            return Err(RigError::InvalidSegmentLength(length));
        }
        if !(stiffness >= 1.0) {
            return Err(RigError::InvalidStiffness(stiffness));
        }
        if !(range >= 0.0) {
            return Err(RigError::InvalidRange(range));
        }
        if let Some(p) = parent {
            if p.index() >= self.segments.len() {
                return Err(RigError::UnknownSegment(p));
            }
        }

        let id = SegmentId(self.segments.len() as u32);
        let parent_angle = match parent {
            Some(p) => self.segments[p.index()].abs_angle,
            None => root.angle,
        };
        self.segments.push(Segment {
            parent,
            children: Vec::new(),
            length,
            rel_angle: def_angle,
            def_angle,
            range,
            stiffness,
            abs_angle: parent_angle + def_angle,
            position: Vec2::ZERO,
        });
        match parent {
            Some(p) => self.segments[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        // Derive the world position from the rest angle
        self.update_relative(id, root, false, true);
        Ok(id)
    }

    /// Re-derive a segment's pose from its parent, optionally relaxing the
    /// joint toward its rest angle first.
    ///
    /// This is the single routine that keeps the rigid-link and angular
    /// constraint invariants true. `relax = false` is a pure forward
    /// kinematics refresh after an external repositioning; `relax = true`
    /// additionally pulls `rel_angle` toward `def_angle` at rate
    /// `1/stiffness`, clamped to `def_angle ± range/2`.
    pub fn update_relative(&mut self, id: SegmentId, root: Pose, recurse: bool, relax: bool) {
        let parent = self.parent_pose(id, root);
        let seg = &mut self.segments[id.index()];

        // Wrap around the rest angle, not zero
        seg.rel_angle = wrap_around(seg.rel_angle, seg.def_angle);
        if relax {
            let half = seg.range / 2.0;
            let pulled = seg.def_angle + (seg.rel_angle - seg.def_angle) / seg.stiffness;
            seg.rel_angle = pulled.clamp(seg.def_angle - half, seg.def_angle + half);
        }
        seg.abs_angle = parent.angle + seg.rel_angle;
        seg.position = parent.position + seg.length * Vec2::from_angle(seg.abs_angle);

        if recurse {
            let children = seg.children.clone();
            for child in children {
                self.update_relative(child, root, recurse, relax);
            }
        }
    }

    /// Drag a segment after its parent moved without this joint's angle
    /// being set explicitly (whole-body translation).
    ///
    /// Projects the current position onto the circle of radius `length`
    /// around the parent's new position, derives the angles from the
    /// result, then re-applies the relaxation spring.
    pub fn follow(&mut self, id: SegmentId, root: Pose, recurse: bool) {
        let parent = self.parent_pose(id, root);
        let seg = &mut self.segments[id.index()];

        let delta = seg.position - parent.position;
        // Zero distance would divide by zero; treat it as distance 1
        let dist = if delta.length() == 0.0 { 1.0 } else { delta.length() };
        seg.position = parent.position + seg.length * delta / dist;
        seg.abs_angle = delta.y.atan2(delta.x);
        seg.rel_angle = seg.abs_angle - parent.angle;
        self.update_relative(id, root, false, true);

        if recurse {
            let children = self.segments[id.index()].children.clone();
            for child in children {
                self.follow(child, root, recurse);
            }
        }
    }

    /// Pose of the frame a segment hangs from.
    pub fn parent_pose(&self, id: SegmentId, root: Pose) -> Pose {
        match self.segments[id.index()].parent {
            Some(p) => {
                let s = &self.segments[p.index()];
                Pose {
                    position: s.position,
                    angle: s.abs_angle,
                }
            }
            None => root,
        }
    }

    /// One line per segment (parent position to own position), depth-first
    /// from the root-attached segments.
    pub fn bones(&self, root: Pose, out: &mut Vec<BoneRenderData>) {
        for &r in &self.roots {
            self.collect_bones(r, root, out);
        }
    }

    fn collect_bones(&self, id: SegmentId, root: Pose, out: &mut Vec<BoneRenderData>) {
        let parent = self.parent_pose(id, root);
        let seg = &self.segments[id.index()];
        out.push(BoneRenderData {
            start: parent.position,
            end: seg.position,
        });
        for &child in &seg.children {
            self.collect_bones(child, root, out);
        }
    }

    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        id.index() < self.segments.len()
    }

    /// Segments attached directly to the creature root.
    pub fn roots(&self) -> &[SegmentId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &Segment)> {
        self.segments
            .iter()
            .enumerate()
            .map(|(i, s)| (SegmentId(i as u32), s))
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.index()]
    }
}
