use std::{
    collections::HashMap,
    io::{BufRead, Seek},
};

use anyhow::Result;
use nalgebra::Matrix4;
use ordered_float::OrderedFloat;
use tracing::warn;

use crate::{half_edge::HalfEdgeMesh, Pos, Uv};

/// A mesh made of vertices and triangular faces, with optional per vertex
/// normals and texture coordinates. Meshes are plain owned buffers, so a
/// clone never shares storage with the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Pos>,
    normals: Option<Vec<Pos>>,
    uvs: Option<Vec<Uv>>,
    faces: Vec<[u32; 3]>,

    bounds: (Pos, Pos),
}

impl Mesh {
    /// Creates a new mesh from the given vertices and faces.
    pub fn new(vertices: Vec<Pos>, faces: Vec<[u32; 3]>) -> Self {
        Self::from_parts(vertices, None, None, faces)
    }

    /// Creates a new mesh with vertex attributes. Attribute buffers that
    /// don't have one entry per vertex are dropped.
    pub fn from_parts(
        vertices: Vec<Pos>,
        normals: Option<Vec<Pos>>,
        uvs: Option<Vec<Uv>>,
        faces: Vec<[u32; 3]>,
    ) -> Self {
        let count = vertices.len();
        let normals = normals.filter(|x| {
            let valid = x.len() == count;
            (!valid).then(|| warn!("Dropping {} normals for {count} vertices", x.len()));
            valid
        });
        let uvs = uvs.filter(|x| {
            let valid = x.len() == count;
            (!valid).then(|| warn!("Dropping {} uvs for {count} vertices", x.len()));
            valid
        });

        Self {
            bounds: vertex_bounds(&vertices),
            vertices,
            normals,
            uvs,
            faces,
        }
    }

    pub fn vertices(&self) -> &[Pos] {
        &self.vertices
    }

    pub fn normals(&self) -> Option<&[Pos]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[Uv]> {
        self.uvs.as_deref()
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Unit normal of a face following its winding order, zero for
    /// degenerate faces.
    pub fn normal(&self, index: usize) -> Pos {
        let [a, b, c] = self.face_positions(index);
        (b - a).cross(&(c - a)).try_normalize(0.0).unwrap_or_else(Pos::zeros)
    }

    pub fn face_area(&self, index: usize) -> f32 {
        let [a, b, c] = self.face_positions(index);
        (b - a).cross(&(c - a)).norm() / 2.0
    }

    pub fn surface_area(&self) -> f32 {
        (0..self.face_count()).map(|x| self.face_area(x)).sum()
    }

    /// Signed volume enclosed by the mesh. Only meaningful for closed meshes
    /// and positive when the faces wind counter-clockwise seen from outside.
    pub fn volume(&self) -> f32 {
        let volume = (0..self.face_count())
            .map(|x| {
                let [a, b, c] = self.face_positions(x).map(|v| v.cast::<f64>());
                a.dot(&b.cross(&c))
            })
            .sum::<f64>();
        (volume / 6.0) as f32
    }

    /// Get the minimum and maximum of each component of every vertex in the
    /// model. These points define the bounding box of the model.
    pub fn bounds(&self) -> (Pos, Pos) {
        self.bounds
    }

    /// Maps every vertex to an id shared by all vertices at the exact same
    /// position. Attribute seams in the source file don't split topology
    /// this way.
    pub fn weld_ids(&self) -> Vec<u32> {
        weld_positions(&self.vertices)
    }

    /// True when every edge, after welding vertices by position, is shared by
    /// exactly two faces running in opposite directions.
    pub fn is_watertight(&self) -> bool {
        !self.is_empty() && self.half_edges().is_closed()
    }

    /// Position welded half edge structure of the mesh.
    pub fn half_edges(&self) -> HalfEdgeMesh {
        let ids = self.weld_ids();
        let faces = (self.faces.iter())
            .map(|face| face.map(|x| ids[x as usize]))
            .collect::<Vec<_>>();
        HalfEdgeMesh::build(&faces)
    }

    /// Applies a 4x4 transform to the positions. Normals are moved with the
    /// inverse transpose and renormalized.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Self {
        let vertices = (self.vertices.iter())
            .map(|x| matrix.transform_point(&(*x).into()).coords)
            .collect();

        let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear.try_inverse().map(|x| x.transpose());
        let normals = self.normals.as_ref().zip(normal_matrix).map(|(normals, matrix)| {
            (normals.iter())
                .map(|x| (matrix * x).try_normalize(0.0).unwrap_or_else(Pos::zeros))
                .collect()
        });

        Self::from_parts(vertices, normals, self.uvs.clone(), self.faces.clone())
    }

    /// Replaces the vertex normals with area weighted averages of the
    /// adjacent face normals.
    pub fn with_recomputed_normals(mut self) -> Self {
        let mut normals = vec![Pos::zeros(); self.vertices.len()];
        for face in self.faces.iter() {
            let [a, b, c] = face.map(|x| self.vertices[x as usize]);
            // Not normalized, so larger faces weigh more.
            let normal = (b - a).cross(&(c - a));
            for &idx in face {
                normals[idx as usize] += normal;
            }
        }

        for normal in normals.iter_mut() {
            *normal = normal.try_normalize(0.0).unwrap_or_else(Pos::zeros);
        }

        self.normals = Some(normals);
        self
    }

    /// Converts the mesh into the raw representation used for saving.
    pub fn to_raw(&self) -> mesh_format::Mesh {
        mesh_format::Mesh {
            verts: self.vertices.clone(),
            normals: self.normals.clone(),
            uvs: self.uvs.clone(),
            faces: self.faces.clone(),
        }
    }

    fn face_positions(&self, index: usize) -> [Pos; 3] {
        self.faces[index].map(|x| self.vertices[x as usize])
    }
}

impl From<mesh_format::Mesh> for Mesh {
    fn from(mesh: mesh_format::Mesh) -> Self {
        Self::from_parts(mesh.verts, mesh.normals, mesh.uvs, mesh.faces)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

/// Loads a buffer into a mesh in a blocking manner.
/// Supported formats include `.stl` and `.obj`.
pub fn load_mesh<T: BufRead + Seek>(reader: T, format: &str) -> Result<Mesh> {
    let mesh = mesh_format::load_mesh(reader, format)?;
    Ok(mesh.into())
}

/// Get the minimum and maximum of each component of every vertex.
fn vertex_bounds(vertices: &[Pos]) -> (Pos, Pos) {
    vertices.iter().fold(
        (Pos::repeat(f32::MAX), Pos::repeat(f32::MIN)),
        |(min, max), v| (min.inf(v), max.sup(v)),
    )
}

/// Hashable and totally ordered key of a position.
pub(crate) fn position_key(pos: &Pos) -> [OrderedFloat<f32>; 3] {
    [pos.x, pos.y, pos.z].map(OrderedFloat)
}

pub(crate) fn weld_positions(positions: &[Pos]) -> Vec<u32> {
    let mut ids = HashMap::new();
    positions
        .iter()
        .map(|pos| {
            let next = ids.len() as u32;
            *ids.entry(position_key(pos)).or_insert(next)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MeshBuilder;

    fn unit_cube() -> Mesh {
        let mut builder = MeshBuilder::new();
        builder.add_cuboid(Pos::repeat(-0.5), Pos::repeat(0.5));
        builder.build()
    }

    #[test]
    fn cube_measures() {
        let cube = unit_cube();
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.face_count(), 12);
        assert!((cube.volume() - 1.0).abs() < 1e-6);
        assert!((cube.surface_area() - 6.0).abs() < 1e-6);
        assert_eq!(cube.bounds(), (Pos::repeat(-0.5), Pos::repeat(0.5)));
        assert!(cube.is_watertight());
    }

    #[test]
    fn open_mesh_is_not_watertight() {
        let cube = unit_cube();
        let faces = cube.faces()[1..].to_vec();
        let open = Mesh::new(cube.vertices().to_vec(), faces);
        assert!(!open.is_watertight());
        assert_eq!(open.half_edges().boundary().count(), 3);
    }

    #[test]
    fn welding_ignores_duplicate_vertices() {
        // Same cube, but every face owns its own three vertices.
        let cube = unit_cube();
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for face in cube.faces() {
            let base = vertices.len() as u32;
            vertices.extend(face.map(|x| cube.vertices()[x as usize]));
            faces.push([base, base + 1, base + 2]);
        }

        let soup = Mesh::new(vertices, faces);
        assert_eq!(soup.vertex_count(), 36);
        assert!(soup.is_watertight());
        assert_eq!(soup.weld_ids().iter().max(), Some(&7));
    }

    #[test]
    fn recomputed_normals_point_outwards() {
        let cube = unit_cube().with_recomputed_normals();
        for (vertex, normal) in cube.vertices().iter().zip(cube.normals().unwrap()) {
            assert!(vertex.dot(normal) > 0.0);
            assert!((normal.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn mismatched_attributes_are_dropped() {
        let mesh = Mesh::from_parts(
            vec![Pos::zeros(), Pos::x(), Pos::y()],
            Some(vec![Pos::z()]),
            Some(vec![Uv::zeros(); 3]),
            vec![[0, 1, 2]],
        );
        assert!(mesh.normals().is_none());
        assert_eq!(mesh.uvs().map(<[_]>::len), Some(3));
        assert_eq!(mesh.normal(0), Pos::z());
    }

    #[test]
    fn transform_moves_positions_and_normals() {
        let cube = unit_cube().with_recomputed_normals();
        let matrix = Matrix4::new_translation(&Pos::new(1.0, 2.0, 3.0)) * Matrix4::new_scaling(2.0);
        let moved = cube.transformed(&matrix);

        assert_eq!(moved.bounds(), (Pos::new(0.0, 1.0, 2.0), Pos::new(2.0, 3.0, 4.0)));
        assert!((moved.volume() - 8.0).abs() < 1e-4);
        let normals = moved.normals().unwrap().iter().zip(cube.normals().unwrap());
        assert!(normals.into_iter().all(|(a, b)| (a - b).norm() < 1e-6));
    }

    #[test]
    fn empty_mesh() {
        let mesh = Mesh::default();
        assert!(mesh.is_empty());
        assert!(!mesh.is_watertight());
        assert_eq!(mesh.volume(), 0.0);
    }
}
