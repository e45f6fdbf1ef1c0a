//! Reference planes of a head scan, laid out from three anatomical
//! landmarks.

use common::config::PlaneStackConfig;

use crate::{plane::Plane, Pos};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Landmark {
    /// Deepest point of the nasal bridge.
    Sellion,
    RightTragion,
    LeftTragion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmarks {
    pub sellion: Pos,
    pub right_tragion: Pos,
    pub left_tragion: Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    /// Parallel to the plane through the three landmarks.
    Transverse,
    /// Splits front from back, through both tragions.
    Coronal,
    /// Splits left from right, halfway between the tragions and the sellion.
    Sagittal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePlane {
    pub id: PlaneId,
    pub kind: PlaneKind,
    pub plane: Plane,
    /// Point the plane was placed through.
    pub origin: Pos,
}

impl Landmarks {
    pub fn get(&self, landmark: Landmark) -> Pos {
        match landmark {
            Landmark::Sellion => self.sellion,
            Landmark::RightTragion => self.right_tragion,
            Landmark::LeftTragion => self.left_tragion,
        }
    }

    /// Normal of the plane through all three landmarks, on the same side as
    /// `up`.
    pub fn normal(&self, up: &Pos) -> Option<Pos> {
        let normal = (self.right_tragion - self.sellion)
            .cross(&(self.left_tragion - self.sellion))
            .try_normalize(f32::EPSILON)?;
        Some(if normal.dot(up) < 0.0 { -normal } else { normal })
    }

    /// Builds the measurement planes. The first `config.count` planes share
    /// the landmark plane's normal and are stacked along `config.up`: the
    /// first `config.above` step up from the sellion, the rest step down from
    /// it, starting with the lowest. A coronal and a sagittal plane follow.
    /// Returns None if the landmarks are collinear.
    pub fn reference_planes(&self, config: &PlaneStackConfig) -> Option<Vec<ReferencePlane>> {
        let up = config.up.try_normalize(f32::EPSILON)?;
        let normal = self.normal(&up)?;
        let spacing = (self.sellion - self.right_tragion).norm() / config.spacing_divisor;

        let mut planes = Vec::with_capacity(config.count as usize + 2);
        for j in 0..config.count {
            let steps = if j < config.above {
                j as f32
            } else {
                -((config.count - j) as f32)
            };

            let origin = self.sellion + up * steps * spacing;
            planes.push(ReferencePlane {
                id: PlaneId(j + 1),
                kind: PlaneKind::Transverse,
                plane: Plane::from_normal_and_point(normal, origin)?,
                origin,
            });
        }

        let lateral = self.right_tragion - self.left_tragion;
        let lateral = (lateral - normal * normal.dot(&lateral)).try_normalize(f32::EPSILON)?;
        let forward = normal.cross(&lateral);

        let tragion_mid = (self.right_tragion + self.left_tragion) / 2.0;
        let sagittal_origin = (tragion_mid + self.sellion) / 2.0;

        for (kind, normal, origin) in [
            (PlaneKind::Coronal, forward, tragion_mid),
            (PlaneKind::Sagittal, lateral, sagittal_origin),
        ] {
            planes.push(ReferencePlane {
                id: PlaneId(planes.len() as u32 + 1),
                kind,
                plane: Plane::from_normal_and_point(normal, origin)?,
                origin,
            });
        }

        Some(planes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Head looking down -z with y up, ears on the x axis.
    fn landmarks() -> Landmarks {
        Landmarks {
            sellion: Pos::new(0.0, 0.0, -8.0),
            right_tragion: Pos::new(6.0, 0.0, 0.0),
            left_tragion: Pos::new(-6.0, 0.0, 0.0),
        }
    }

    #[test]
    fn plane_stack_layout() {
        let planes = landmarks().reference_planes(&PlaneStackConfig::default()).unwrap();
        assert_eq!(planes.len(), 14);
        assert_eq!(planes.iter().map(|x| x.id.0).collect::<Vec<_>>(), (1..=14).collect::<Vec<_>>());

        let spacing = 10.0 / 8.0;
        let heights = planes[..12].iter().map(|x| x.origin.y).collect::<Vec<_>>();
        let expected = [0, 1, 2, 3, 4, 5, 6, -5, -4, -3, -2, -1].map(|x| x as f32 * spacing);
        for (height, expected) in heights.iter().zip(expected) {
            assert!((height - expected).abs() < 1e-5);
        }

        for plane in &planes[..12] {
            assert_eq!(plane.kind, PlaneKind::Transverse);
            assert!((plane.plane.normal() - Pos::y()).norm() < 1e-6);
            assert!(plane.plane.signed_distance(&plane.origin).abs() < 1e-5);
        }
    }

    #[test]
    fn coronal_and_sagittal() {
        let planes = landmarks().reference_planes(&PlaneStackConfig::default()).unwrap();
        let (coronal, sagittal) = (planes[12], planes[13]);

        assert_eq!(coronal.kind, PlaneKind::Coronal);
        assert!(coronal.plane.normal().cross(&Pos::z()).norm() < 1e-6);
        assert!(coronal.plane.signed_distance(&Pos::zeros()).abs() < 1e-6);

        assert_eq!(sagittal.kind, PlaneKind::Sagittal);
        assert!((sagittal.plane.normal() - Pos::x()).norm() < 1e-6);
        assert!((sagittal.origin - Pos::new(0.0, 0.0, -4.0)).norm() < 1e-6);
    }

    #[test]
    fn normal_faces_up() {
        let mut flipped = landmarks();
        std::mem::swap(&mut flipped.right_tragion, &mut flipped.left_tragion);
        assert_eq!(flipped.normal(&Pos::y()), landmarks().normal(&Pos::y()));
        assert_eq!(flipped.get(Landmark::RightTragion), Pos::new(-6.0, 0.0, 0.0));
    }

    #[test]
    fn collinear_landmarks() {
        let landmarks = Landmarks {
            sellion: Pos::zeros(),
            right_tragion: Pos::x(),
            left_tragion: -Pos::x(),
        };
        assert!(landmarks.reference_planes(&PlaneStackConfig::default()).is_none());
    }
}
