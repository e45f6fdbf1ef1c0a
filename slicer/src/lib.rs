//! Cuts closed triangle meshes in two along a plane, closing the seam of each
//! half with cap triangles. Also holds the pieces around a cut: deriving the
//! plane from a blade sweep, the reference planes of a head scan and the
//! measurements of the resulting contours.

use nalgebra::{Vector2, Vector3};

pub mod builder;
pub mod contour;
pub mod cut;
pub mod half_edge;
pub mod landmarks;
pub mod mesh;
pub mod plane;
pub mod slicer;
pub mod spin;
pub mod triangulate;

pub type Pos = Vector3<f32>;
pub type Uv = Vector2<f32>;
