//! Turns a blade sweeping through a target into a cutting plane.

use nalgebra::Matrix4;
use tracing::{debug, warn};

use crate::{
    mesh::Mesh,
    plane::Plane,
    slicer::{SliceResult, Slicer},
    Pos,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub u32);

/// World space positions of the two ends of the blade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BladePose {
    pub tip: Pos,
    pub base: Pos,
}

/// Remembers where the blade entered a target and produces a cut when it
/// leaves it again.
#[derive(Debug, Clone)]
pub struct CutTrigger {
    entered: Option<(TargetId, BladePose)>,
    up: Pos,
}

/// A finished sweep through a target, with the plane in the target's local
/// space. The positive side faces up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutEvent {
    pub target: TargetId,
    pub plane: Plane,
}

impl CutTrigger {
    /// `up` is the local direction the positive side of every cut faces.
    pub fn new(up: Pos) -> Self {
        Self { entered: None, up }
    }

    pub fn entered(&self) -> Option<TargetId> {
        self.entered.map(|(target, _)| target)
    }

    pub fn enter(&mut self, target: TargetId, pose: BladePose) {
        if let Some((previous, _)) = self.entered {
            debug!("Blade entered {target:?} while still inside {previous:?}");
        }
        self.entered = Some((target, pose));
    }

    /// Ends the sweep through `target`, whose local to world transform is
    /// `model`. Returns None if the blade never entered it or the sweep
    /// didn't span a plane.
    pub fn exit(&mut self, target: TargetId, exit_tip: Pos, model: &Matrix4<f32>) -> Option<CutEvent> {
        let (entered, pose) = self.entered?;
        if entered != target {
            return None;
        }
        self.entered = None;

        let Some(plane) = cut_plane(&pose, exit_tip, model, &self.up) else {
            warn!("Sweep through {target:?} is degenerate, not cutting");
            return None;
        };
        Some(CutEvent { target, plane })
    }
}

/// The plane swept by the blade: through the tip where it entered and
/// spanned by the triangle between the entry pose and the exit tip. The
/// result is in the local space of `model` and flipped to face `up`.
pub fn cut_plane(enter: &BladePose, exit_tip: Pos, model: &Matrix4<f32>, up: &Pos) -> Option<Plane> {
    let normal = (exit_tip - enter.tip).cross(&(exit_tip - enter.base));
    let plane = Plane::from_normal_and_point(normal, enter.tip)?.to_model_space(model)?;
    Some(if plane.normal().dot(up) < 0.0 {
        plane.flipped()
    } else {
        plane
    })
}

impl CutEvent {
    pub fn apply(&self, slicer: &Slicer, mesh: &Mesh) -> SliceResult {
        debug!("Cutting {:?} along {:?}", self.target, self.plane);
        slicer.slice(mesh, &self.plane)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use nalgebra::{Matrix4, Vector3};

    use crate::{builder::MeshBuilder, slicer::SliceOutcome};

    use super::*;

    /// Blade pointing along -z with its tip at z = 0, swept along x at
    /// height `y`. The swept plane is horizontal.
    fn sweep(y: f32, reverse: bool) -> (BladePose, Pos) {
        let (from, to) = if reverse { (2.0, -2.0) } else { (-2.0, 2.0) };
        let pose = BladePose {
            tip: Pos::new(from, y, 0.0),
            base: Pos::new(from, y, 3.0),
        };
        (pose, Pos::new(to, y, 0.0))
    }

    #[test]
    fn plane_faces_up() {
        for reverse in [false, true] {
            let (pose, exit) = sweep(0.25, reverse);
            let plane = cut_plane(&pose, exit, &Matrix4::identity(), &Pos::y()).unwrap();
            assert!((plane.normal() - Pos::y()).norm() < 1e-6);
            assert!((plane.offset() - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn plane_in_model_space() {
        // Target shifted up by one and turned on its side.
        let model = Matrix4::new_translation(&Vector3::new(0.0, 1.0, 0.0))
            * Matrix4::from_scaled_axis(Vector3::z() * FRAC_PI_2);
        let (pose, exit) = sweep(1.5, false);
        let plane = cut_plane(&pose, exit, &model, &Pos::x()).unwrap();

        // World y = 1.5 is local x = 0.5 after undoing the turn.
        assert!((plane.normal() - Pos::x()).norm() < 1e-5);
        assert!((plane.offset() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn degenerate_sweep() {
        let pose = BladePose {
            tip: Pos::zeros(),
            base: Pos::z(),
        };
        assert!(cut_plane(&pose, Pos::z() * 2.0, &Matrix4::identity(), &Pos::y()).is_none());
        assert!(cut_plane(&pose, pose.tip, &Matrix4::identity(), &Pos::y()).is_none());
    }

    #[test]
    fn trigger_pairs_enter_and_exit() {
        let mut trigger = CutTrigger::new(Pos::y());
        let (pose, exit) = sweep(0.0, false);

        assert!(trigger.exit(TargetId(1), exit, &Matrix4::identity()).is_none());

        trigger.enter(TargetId(1), pose);
        assert_eq!(trigger.entered(), Some(TargetId(1)));
        assert!(trigger.exit(TargetId(2), exit, &Matrix4::identity()).is_none());

        let event = trigger.exit(TargetId(1), exit, &Matrix4::identity()).unwrap();
        assert_eq!(event.target, TargetId(1));
        assert_eq!(trigger.entered(), None);
    }

    #[test]
    fn cut_through_moved_target() {
        let mut builder = MeshBuilder::new();
        builder.add_cuboid(Pos::repeat(-0.5), Pos::repeat(0.5));
        let mesh = builder.build();

        let model = Matrix4::new_translation(&Vector3::new(10.0, 5.0, 0.0));
        let mut trigger = CutTrigger::new(Pos::y());
        let (pose, exit) = sweep(5.25, false);
        trigger.enter(TargetId(7), BladePose {
            tip: pose.tip + Pos::x() * 10.0,
            base: pose.base + Pos::x() * 10.0,
        });
        let event = trigger
            .exit(TargetId(7), exit + Pos::x() * 10.0, &model)
            .unwrap();

        let result = event.apply(&Slicer::default(), &mesh);
        assert_eq!(result.report.outcome, SliceOutcome::Cut);
        assert!((result.positive.mesh.volume() - 0.25).abs() < 1e-4);
        assert!((result.negative.mesh.volume() - 0.75).abs() < 1e-4);

        // Same cut as slicing the moved mesh in world space.
        let world = mesh.transformed(&model);
        let plane = Plane::from_normal_and_point(Pos::y(), Pos::new(0.0, 5.25, 0.0)).unwrap();
        let reference = Slicer::default().slice(&world, &plane);
        assert!((reference.positive.mesh.volume() - result.positive.mesh.volume()).abs() < 1e-4);
    }
}
