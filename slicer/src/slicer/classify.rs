use std::cmp::Ordering;

use crate::{mesh::Mesh, plane::Plane};

use super::Side;

/// Where a triangle lies relative to the cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriangleClass {
    /// No vertex on the other side, some may touch the plane.
    Side(Side),
    /// All three vertices within epsilon of the plane.
    OnPlane,
    /// Vertices strictly on both sides.
    Straddling,
}

/// Signed distance and side of every vertex of a mesh.
pub struct Classification {
    pub distances: Vec<f32>,
    pub sides: Vec<Ordering>,
}

impl Classification {
    pub fn new(mesh: &Mesh, plane: &Plane, epsilon: f32) -> Self {
        let distances = (mesh.vertices().iter())
            .map(|x| plane.signed_distance(x))
            .collect::<Vec<_>>();
        let sides = (distances.iter())
            .map(|&x| {
                if x > epsilon {
                    Ordering::Greater
                } else if x < -epsilon {
                    Ordering::Less
                } else {
                    Ordering::Equal
                }
            })
            .collect();

        Self { distances, sides }
    }

    pub fn side(&self, vertex: u32) -> Ordering {
        self.sides[vertex as usize]
    }

    pub fn triangle(&self, face: &[u32; 3]) -> TriangleClass {
        let (mut positive, mut negative) = (false, false);
        for &vertex in face {
            match self.side(vertex) {
                Ordering::Greater => positive = true,
                Ordering::Less => negative = true,
                Ordering::Equal => {}
            }
        }

        match (positive, negative) {
            (true, true) => TriangleClass::Straddling,
            (true, false) => TriangleClass::Side(Side::Positive),
            (false, true) => TriangleClass::Side(Side::Negative),
            (false, false) => TriangleClass::OnPlane,
        }
    }

    /// If the plane doesn't separate any of the given faces, the side they
    /// all lie on. Faces flat on the plane count as positive.
    pub fn uncut_side<'a>(&self, faces: impl Iterator<Item = &'a [u32; 3]> + Clone) -> Option<Side> {
        let count = self.sides.len();
        let vertices = || (faces.clone().flatten()).filter(move |&&x| (x as usize) < count);

        if !vertices().any(|&x| self.side(x) == Ordering::Less) {
            Some(Side::Positive)
        } else if !vertices().any(|&x| self.side(x) == Ordering::Greater) {
            Some(Side::Negative)
        } else {
            None
        }
    }
}

/// Faces with out of range or repeated indices, or with an area no larger
/// than `min_area`.
pub fn is_degenerate(mesh: &Mesh, face: &[u32; 3], min_area: f32) -> bool {
    let [a, b, c] = *face;
    if face.iter().any(|&x| x as usize >= mesh.vertex_count()) || a == b || b == c || a == c {
        return true;
    }

    let [a, b, c] = face.map(|x| mesh.vertices()[x as usize]);
    (b - a).cross(&(c - a)).norm() / 2.0 <= min_area
}

/// Triangles flat on the plane end up on the side their front faces away
/// from, so they close the other half rather than duplicating its cap.
pub fn on_plane_side(mesh: &Mesh, face_index: usize, plane: &Plane) -> Side {
    if mesh.normal(face_index).dot(&plane.normal()) > 0.0 {
        Side::Negative
    } else {
        Side::Positive
    }
}
