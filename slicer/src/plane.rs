use std::cmp::Ordering;

use nalgebra::{Matrix4, Unit, Vector2};

use crate::Pos;

/// An oriented plane, the set of points `p` with `normal · p = offset`.
/// The positive side is the one the normal points into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Unit<Pos>,
    offset: f32,
}

impl Plane {
    pub fn new(normal: Unit<Pos>, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Plane through `point`. Returns None if the normal can't be
    /// normalized.
    pub fn from_normal_and_point(normal: Pos, point: Pos) -> Option<Self> {
        let normal = Unit::try_new(normal, f32::EPSILON)?;
        Some(Self {
            offset: normal.dot(&point),
            normal,
        })
    }

    /// Plane through three points, facing the side they wind
    /// counter-clockwise around.
    pub fn from_points(a: Pos, b: Pos, c: Pos) -> Option<Self> {
        Self::from_normal_and_point((b - a).cross(&(c - a)), a)
    }

    pub fn normal(&self) -> Pos {
        self.normal.into_inner()
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// The point of the plane closest to the origin.
    pub fn origin(&self) -> Pos {
        self.normal.into_inner() * self.offset
    }

    /// Same plane with the sides swapped.
    pub fn flipped(&self) -> Self {
        Self {
            normal: Unit::new_unchecked(-self.normal.into_inner()),
            offset: -self.offset,
        }
    }

    pub fn signed_distance(&self, point: &Pos) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Which side of the plane a point is on. Points within `epsilon` of the
    /// plane are [`Ordering::Equal`], [`Ordering::Greater`] is the positive
    /// side.
    pub fn side(&self, point: &Pos, epsilon: f32) -> Ordering {
        let distance = self.signed_distance(point);
        if distance > epsilon {
            Ordering::Greater
        } else if distance < -epsilon {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Closest point on the plane.
    pub fn project(&self, point: &Pos) -> Pos {
        point - self.normal.into_inner() * self.signed_distance(point)
    }

    /// Two unit vectors spanning the plane, with `u × v = normal`.
    pub fn basis(&self) -> (Pos, Pos) {
        let normal = self.normal.into_inner();
        let helper = if normal.x.abs() < 0.9 { Pos::x() } else { Pos::y() };
        let u = normal.cross(&helper).normalize();
        let v = normal.cross(&u);
        (u, v)
    }

    /// Coordinates of a point in the plane's [`basis`](Self::basis),
    /// measured from `origin`.
    pub fn to_local(&self, (u, v): (Pos, Pos), origin: &Pos, point: &Pos) -> Vector2<f32> {
        let delta = point - origin;
        Vector2::new(delta.dot(&u), delta.dot(&v))
    }

    /// Converts a plane given in world space into the local space of a model
    /// with the given local to world transform. Returns None if the
    /// transform collapses the normal.
    pub fn to_model_space(&self, model: &Matrix4<f32>) -> Option<Self> {
        // World points are `M * local`, so `n · (M * local) = d` is the same
        // as `(Mᵀ n) · local = d`.
        let linear = model.fixed_view::<3, 3>(0, 0);
        let translation = model.fixed_view::<3, 1>(0, 3);

        let normal = linear.transpose() * self.normal.into_inner();
        let offset = self.offset - self.normal.dot(&translation);

        let length = normal.norm();
        (length > f32::EPSILON).then(|| Self {
            normal: Unit::new_unchecked(normal / length),
            offset: offset / length,
        })
    }

    /// Whether the plane passes through an axis aligned box, widened by
    /// `epsilon`.
    pub fn intersects_bounds(&self, (min, max): (Pos, Pos), epsilon: f32) -> bool {
        let center = (min + max) / 2.0;
        let extent = (max - min) / 2.0;
        let radius = extent.dot(&self.normal.abs());
        self.signed_distance(&center).abs() <= radius + epsilon
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use nalgebra::{Matrix4, Vector3};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn sides() {
        let plane = Plane::from_normal_and_point(Pos::y() * 2.0, Pos::new(5.0, 1.0, 3.0)).unwrap();
        assert_eq!(plane.offset(), 1.0);
        assert_eq!(plane.side(&Pos::new(0.0, 2.0, 0.0), 1e-5), Ordering::Greater);
        assert_eq!(plane.side(&Pos::new(9.0, 1.0, 0.0), 1e-5), Ordering::Equal);
        assert_eq!(plane.side(&Pos::zeros(), 1e-5), Ordering::Less);
        assert_eq!(plane.flipped().side(&Pos::zeros(), 1e-5), Ordering::Greater);
    }

    #[test]
    fn zero_normal() {
        assert!(Plane::from_normal_and_point(Pos::zeros(), Pos::zeros()).is_none());
        assert!(Plane::from_points(Pos::zeros(), Pos::x(), Pos::x() * 2.0).is_none());
    }

    #[test]
    fn plane_from_points_follows_winding() {
        let plane = Plane::from_points(Pos::zeros(), Pos::x(), Pos::y()).unwrap();
        assert_eq!(plane.normal(), Pos::z());
    }

    #[test]
    fn bounds_test() {
        let bounds = (Pos::repeat(-1.0), Pos::repeat(1.0));
        let plane = |n: Pos, p: Pos| Plane::from_normal_and_point(n, p).unwrap();
        assert!(plane(Pos::x(), Pos::zeros()).intersects_bounds(bounds, 0.0));
        assert!(plane(Pos::x(), Pos::x()).intersects_bounds(bounds, 0.0));
        assert!(!plane(Pos::x(), Pos::x() * 1.5).intersects_bounds(bounds, 0.0));
        assert!(plane(Pos::repeat(1.0), Pos::repeat(0.9)).intersects_bounds(bounds, 0.0));
        assert!(!plane(Pos::repeat(1.0), Pos::repeat(1.1)).intersects_bounds(bounds, 0.0));
    }

    #[test]
    fn translated_model() {
        let world = Plane::from_normal_and_point(Pos::y(), Pos::new(0.0, 3.0, 0.0)).unwrap();
        let model = Matrix4::new_translation(&Vector3::new(0.0, 1.0, 0.0));
        let local = world.to_model_space(&model).unwrap();
        assert!((local.normal() - Pos::y()).norm() < 1e-6);
        assert!((local.offset() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rotated_and_scaled_model() {
        // Model rotated a quarter turn about z, so its local x points up.
        let model = Matrix4::new_rotation(Vector3::z() * FRAC_PI_2).append_scaling(2.0);
        let world = Plane::from_normal_and_point(Pos::y(), Pos::new(0.0, 1.0, 0.0)).unwrap();
        let local = world.to_model_space(&model).unwrap();
        assert!((local.normal() - Pos::x()).norm() < 1e-5);
        assert!((local.offset() - 0.5).abs() < 1e-5);
    }

    prop_compose! {
        fn arb_vector(range: f32)(x in -range..range, y in -range..range, z in -range..range) -> Pos {
            Pos::new(x, y, z)
        }
    }

    proptest! {
        #[test]
        fn basis_is_right_handed(normal in arb_vector(1.0), point in arb_vector(10.0)) {
            prop_assume!(normal.norm() > 0.01);
            let plane = Plane::from_normal_and_point(normal, point).unwrap();
            let (u, v) = plane.basis();
            prop_assert!(u.dot(&v).abs() < 1e-5);
            prop_assert!((u.cross(&v) - plane.normal()).norm() < 1e-5);
        }

        #[test]
        fn point_lands_on_plane(normal in arb_vector(1.0), point in arb_vector(10.0)) {
            prop_assume!(normal.norm() > 0.01);
            let plane = Plane::from_normal_and_point(normal, point).unwrap();
            prop_assert!(plane.signed_distance(&point).abs() < 1e-3);
            prop_assert!(plane.signed_distance(&plane.origin()).abs() < 1e-3);
        }

        #[test]
        fn projection_lands_on_plane(normal in arb_vector(1.0), point in arb_vector(10.0), other in arb_vector(10.0)) {
            prop_assume!(normal.norm() > 0.01);
            let plane = Plane::from_normal_and_point(normal, point).unwrap();
            let projected = plane.project(&other);
            prop_assert!(plane.signed_distance(&projected).abs() < 1e-3);
            prop_assert!((other - projected).cross(&plane.normal()).norm() < 1e-3);
        }
    }
}
