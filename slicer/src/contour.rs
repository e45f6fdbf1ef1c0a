//! Flattening of cut contours and the cranial measurements taken on them.

use common::config::ContourConfig;
use itertools::Itertools;
use nalgebra::Vector2;

use crate::{plane::Plane, Pos};

/// A closed contour flattened into its cutting plane, relative to the mean
/// of its points.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    center: Pos,
    axes: (Pos, Pos),
    points: Vec<Vector2<f32>>,
}

/// Size and shape of a head contour. Lengths are in mesh units times the
/// contour scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub circumference: f32,
    pub mean_radius: f32,
    /// Extent along the lateral axis.
    pub width: f32,
    /// Extent along the front to back axis.
    pub length: f32,
    pub diagonals: (f32, f32),
    /// Cranial vault asymmetry, the difference between the diagonals.
    pub cva: f32,
    /// Cranial vault asymmetry index, CVA over the longer diagonal in percent.
    pub cvai: f32,
    /// Cephalic ratio, width over length in percent.
    pub cephalic_ratio: f32,
}

impl Contour {
    /// Flattens an ordered loop of points, keeping their order. The center
    /// is the mean of the points, projected onto the plane.
    ///
    /// The first axis is `right` projected into the plane, or an arbitrary
    /// in-plane direction if it isn't given or is parallel to the normal. The
    /// second axis is `normal × first`. Returns None for an empty loop.
    pub fn from_loop(points: &[Pos], plane: &Plane, right: Option<Pos>, scale: f32) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let center = plane.project(&(points.iter().sum::<Pos>() / points.len() as f32));
        let normal = plane.normal();
        let u = right
            .and_then(|x| (x - normal * normal.dot(&x)).try_normalize(1e-6))
            .unwrap_or_else(|| plane.basis().0);
        let v = normal.cross(&u);

        let points = (points.iter())
            .map(|x| plane.to_local((u, v), &center, x) * scale)
            .collect();

        Some(Self {
            center,
            axes: (u, v),
            points,
        })
    }

    /// Flattens unordered points and sorts them by their angle around the
    /// center. Only correct for contours that are star shaped around their
    /// center, which head sections are.
    pub fn from_points(points: &[Pos], plane: &Plane, right: Option<Pos>, scale: f32) -> Option<Self> {
        let mut contour = Self::from_loop(points, plane, right, scale)?;
        contour
            .points
            .sort_by(|a, b| a.y.atan2(a.x).total_cmp(&b.y.atan2(b.x)));
        Some(contour)
    }

    pub fn center(&self) -> Pos {
        self.center
    }

    /// In-plane axes the points are expressed in.
    pub fn axes(&self) -> (Pos, Pos) {
        self.axes
    }

    pub fn points(&self) -> &[Vector2<f32>] {
        &self.points
    }

    /// Length of the closed polyline through the points.
    pub fn perimeter(&self) -> f32 {
        (self.points.iter())
            .circular_tuple_windows()
            .map(|(a, b)| (b - a).norm())
            .sum()
    }

    /// Average distance of the points from the center.
    pub fn mean_radius(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(|x| x.norm()).sum::<f32>() / self.points.len() as f32
    }

    /// Distance between the two extreme points along a direction.
    pub fn extent(&self, direction: Vector2<f32>) -> f32 {
        let (min, max) = (self.points.iter())
            .map(|x| x.dot(&direction))
            .fold((f32::MAX, f32::MIN), |(min, max), x| (min.min(x), max.max(x)));
        (max - min).max(0.0)
    }

    pub fn measure(&self, config: &ContourConfig) -> Measurements {
        let width = self.extent(Vector2::x());
        let length = self.extent(Vector2::y());

        // Diagonals are tilted from the length axis towards either side.
        let (sin, cos) = config.diagonal_angle.to_radians().sin_cos();
        let diagonals = (
            self.extent(Vector2::new(sin, cos)),
            self.extent(Vector2::new(-sin, cos)),
        );

        let cva = (diagonals.0 - diagonals.1).abs();
        let longest = diagonals.0.max(diagonals.1);
        let percent = |a: f32, b: f32| if b > 0.0 { a / b * 100.0 } else { 0.0 };

        Measurements {
            circumference: self.perimeter(),
            mean_radius: self.mean_radius(),
            width,
            length,
            diagonals,
            cva,
            cvai: percent(cva, longest),
            cephalic_ratio: percent(width, length),
        }
    }
}
