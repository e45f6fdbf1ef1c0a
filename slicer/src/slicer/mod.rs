use common::config::{NormalMode, SliceConfig};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, warn};

use crate::{mesh::Mesh, plane::Plane, Pos};

mod cap;
mod classify;
mod clip;

use cap::{add_cap, seam_loops, SeamLoops};
use classify::{is_degenerate, on_plane_side, Classification, TriangleClass};
use clip::{split_triangle, HalfBuilder, SeamCache};

/// Cuts meshes in two along a plane and closes both halves.
pub struct Slicer {
    slice_config: SliceConfig,
}

/// One side of the cutting plane. The positive side is the one the plane
/// normal points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Positive,
    Negative,
}

/// Both halves of a cut mesh.
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub positive: SlicedHalf,
    pub negative: SlicedHalf,
    /// Closed seam loops on the plane, in order around each loop. Seam
    /// chains that didn't close are capped but not listed here.
    pub contours: Vec<Vec<Pos>>,
    pub report: SliceReport,
}

/// A standalone mesh for one side. The cap triangles come last.
#[derive(Debug, Clone, Default)]
pub struct SlicedHalf {
    pub mesh: Mesh,
    pub cap_faces: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// The input had no faces.
    EmptyInput,
    /// The plane didn't separate anything, the whole mesh is on this side.
    NoIntersection(Side),
    Cut,
}

/// What happened during a slice, for callers that care about bad input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceReport {
    pub outcome: SliceOutcome,
    pub straddling: usize,
    /// Faces with invalid indices or no area, left out of both halves.
    pub skipped_degenerate: usize,
    pub seam_loops: usize,
    /// Seam chains that didn't close, capped as well as possible.
    pub open_seams: usize,
}

impl Slicer {
    pub fn new(slice_config: SliceConfig) -> Self {
        Self { slice_config }
    }

    /// Splits the mesh along the plane. Never fails, problems with the input
    /// are listed in the [`SliceReport`].
    pub fn slice(&self, mesh: &Mesh, plane: &Plane) -> SliceResult {
        if mesh.is_empty() {
            debug!("Nothing to slice, mesh has no faces");
            return SliceResult::uncut(SliceOutcome::EmptyInput, Mesh::default(), Side::Positive);
        }

        let epsilon = self.slice_config.epsilon;
        let degenerate = (mesh.faces().iter())
            .map(|face| is_degenerate(mesh, face, self.slice_config.min_triangle_area))
            .collect::<Vec<_>>();
        let skipped = degenerate.iter().filter(|&&x| x).count();
        if skipped == mesh.face_count() {
            debug!("All {skipped} faces are degenerate, nothing to slice");
            let mut result = SliceResult::uncut(SliceOutcome::EmptyInput, Mesh::default(), Side::Positive);
            result.report.skipped_degenerate = skipped;
            return result;
        }

        if !plane.intersects_bounds(mesh.bounds(), epsilon) {
            let (min, max) = mesh.bounds();
            let side = if plane.signed_distance(&((min + max) / 2.0)) > 0.0 {
                Side::Positive
            } else {
                Side::Negative
            };
            debug!("Plane misses the bounds, keeping mesh on the {side:?} side");
            return SliceResult::uncut(SliceOutcome::NoIntersection(side), mesh.clone(), side);
        }

        let classes = Classification::new(mesh, plane, epsilon);
        let valid = (mesh.faces().iter().zip(&degenerate))
            .filter(|(_, degenerate)| !**degenerate)
            .map(|(face, _)| face);
        if let Some(side) = classes.uncut_side(valid) {
            debug!("Plane doesn't cut mesh, keeping it on the {side:?} side");
            return SliceResult::uncut(SliceOutcome::NoIntersection(side), mesh.clone(), side);
        }

        let mut report = SliceReport::new(SliceOutcome::Cut);
        report.skipped_degenerate = skipped;
        let mut cache = SeamCache::new(mesh, &classes);
        let mut positive = HalfBuilder::new(mesh);
        let mut negative = HalfBuilder::new(mesh);

        for (idx, face) in mesh.faces().iter().enumerate() {
            if degenerate[idx] {
                continue;
            }

            let side = match classes.triangle(face) {
                TriangleClass::Side(side) => side,
                TriangleClass::OnPlane => on_plane_side(mesh, idx, plane),
                TriangleClass::Straddling => {
                    report.straddling += 1;
                    let (above, below) = split_triangle(face, &classes);
                    positive.add_polygon(&above, &classes, &mut cache);
                    negative.add_polygon(&below, &classes, &mut cache);
                    continue;
                }
            };

            match side {
                Side::Positive => positive.add_source_face(face, &classes),
                Side::Negative => negative.add_source_face(face, &classes),
            }
        }

        let has_normals = mesh.normals().is_some();
        let (positive, contours) = self.close_half(positive, plane.flipped(), has_normals, &mut report);
        let (negative, _) = self.close_half(negative, *plane, has_normals, &mut report);

        if report.skipped_degenerate > 0 {
            debug!("Skipped {} degenerate faces", report.skipped_degenerate);
        }
        if report.open_seams > 0 {
            warn!(
                "{} seam chains didn't close, caps may leave holes",
                report.open_seams
            );
        }
        debug!(
            "Cut {} of {} faces, {} seam loops, halves have {} and {} faces",
            report.straddling,
            mesh.face_count(),
            report.seam_loops,
            positive.mesh.face_count(),
            negative.mesh.face_count()
        );

        SliceResult {
            positive,
            negative,
            contours,
            report,
        }
    }

    /// Slices independent meshes in parallel.
    pub fn slice_many(&self, jobs: &[(Mesh, Plane)]) -> Vec<SliceResult> {
        jobs.par_iter()
            .map(|(mesh, plane)| self.slice(mesh, plane))
            .collect()
    }

    /// Caps one half. `cap_plane` faces out of the half, that is against the
    /// cutting plane for the positive half and along it for the negative one.
    fn close_half(
        &self,
        half: HalfBuilder,
        cap_plane: Plane,
        has_normals: bool,
        report: &mut SliceReport,
    ) -> (SlicedHalf, Vec<Vec<Pos>>) {
        let has_faces = half.has_faces();
        let (mut builder, on_plane) = half.finish();
        if !has_faces {
            return (SlicedHalf::default(), Vec::new());
        }

        let SeamLoops { loops, chains, open } =
            seam_loops(builder.vertices(), builder.faces(), &on_plane);
        report.open_seams += open;
        report.seam_loops = report.seam_loops.max(loops.len());

        let contours = (loops.iter())
            .map(|lp| lp.iter().map(|&x| builder.vertex(x)).collect())
            .collect();

        let cap_faces = if self.slice_config.generate_caps {
            add_cap(&mut builder, &[loops, chains].concat(), &cap_plane)
        } else {
            0
        };

        let mut mesh = builder.build();
        if !has_normals || self.slice_config.normals == NormalMode::Recompute {
            mesh = mesh.with_recomputed_normals();
        }

        (SlicedHalf { mesh, cap_faces }, contours)
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new(SliceConfig::default())
    }
}

impl SliceResult {
    fn uncut(outcome: SliceOutcome, mesh: Mesh, side: Side) -> Self {
        let full = SlicedHalf { mesh, cap_faces: 0 };
        let (positive, negative) = match side {
            Side::Positive => (full, SlicedHalf::default()),
            Side::Negative => (SlicedHalf::default(), full),
        };

        Self {
            positive,
            negative,
            contours: Vec::new(),
            report: SliceReport::new(outcome),
        }
    }

    pub fn half(&self, side: Side) -> &SlicedHalf {
        match side {
            Side::Positive => &self.positive,
            Side::Negative => &self.negative,
        }
    }
}

impl SlicedHalf {
    /// Faces taken from the input mesh, clipped or not.
    pub fn surface_faces(&self) -> &[[u32; 3]] {
        let faces = self.mesh.faces();
        &faces[..faces.len() - self.cap_faces]
    }

    /// Faces added to close the seam.
    pub fn cap(&self) -> &[[u32; 3]] {
        let faces = self.mesh.faces();
        &faces[faces.len() - self.cap_faces..]
    }

    pub fn is_empty(&self) -> bool {
        self.mesh.is_empty()
    }
}

impl SliceReport {
    fn new(outcome: SliceOutcome) -> Self {
        Self {
            outcome,
            straddling: 0,
            skipped_degenerate: 0,
            seam_loops: 0,
            open_seams: 0,
        }
    }
}
