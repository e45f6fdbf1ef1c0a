use std::{cmp::Ordering, collections::HashMap};

use crate::{
    builder::MeshBuilder,
    mesh::{position_key, Mesh},
    Pos, Uv,
};

use super::classify::Classification;

/// A corner of a clipped polygon, either an original vertex or the point
/// where the plane crosses an original edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Source(u32),
    Seam(u32, u32),
}

/// Interpolated vertex where the plane crosses an edge.
#[derive(Debug, Clone, Copy)]
pub struct SeamVertex {
    pub position: Pos,
    pub normal: Pos,
    pub uv: Uv,
}

/// Crossing points of every cut edge, shared by both halves.
pub struct SeamCache<'a> {
    mesh: &'a Mesh,
    classes: &'a Classification,
    vertices: HashMap<(u32, u32), SeamVertex>,
}

impl<'a> SeamCache<'a> {
    pub fn new(mesh: &'a Mesh, classes: &'a Classification) -> Self {
        Self {
            mesh,
            classes,
            vertices: HashMap::new(),
        }
    }

    /// The crossing on the edge between `a` and `b`, computed once per
    /// edge. The endpoints are ordered by position before interpolating so
    /// edges split by attribute seams still land on the exact same point.
    pub fn get(&mut self, a: u32, b: u32) -> SeamVertex {
        let key = (a.min(b), a.max(b));
        let (mesh, classes) = (self.mesh, self.classes);
        *self.vertices.entry(key).or_insert_with(|| {
            let vertices = mesh.vertices();
            let (a, b) = match position_key(&vertices[a as usize]).cmp(&position_key(&vertices[b as usize])) {
                Ordering::Greater => (b, a),
                _ => (a, b),
            };

            let (da, db) = (classes.distances[a as usize], classes.distances[b as usize]);
            let t = da / (da - db);
            let (pa, pb) = (vertices[a as usize], vertices[b as usize]);

            let normal = mesh.normals().map_or_else(Pos::zeros, |normals| {
                let (na, nb) = (normals[a as usize], normals[b as usize]);
                na.lerp(&nb, t).try_normalize(0.0).unwrap_or(na)
            });
            let uv = mesh.uvs().map_or_else(Uv::zeros, |uvs| {
                uvs[a as usize].lerp(&uvs[b as usize], t)
            });

            SeamVertex {
                position: pa + (pb - pa) * t,
                normal,
                uv,
            }
        })
    }
}

/// Splits a straddling triangle along the plane. Returns the positive and
/// negative polygons, each a triangle or quad in the source winding order.
/// Vertices on the plane go into both.
pub fn split_triangle(face: &[u32; 3], classes: &Classification) -> (Vec<Corner>, Vec<Corner>) {
    let mut positive = Vec::with_capacity(4);
    let mut negative = Vec::with_capacity(4);

    for i in 0..3 {
        let (a, b) = (face[i], face[(i + 1) % 3]);
        let side = classes.side(a);

        if side != Ordering::Less {
            positive.push(Corner::Source(a));
        }
        if side != Ordering::Greater {
            negative.push(Corner::Source(a));
        }

        let other = classes.side(b);
        if side != Ordering::Equal && other != Ordering::Equal && side != other {
            let seam = Corner::Seam(a, b);
            positive.push(seam);
            negative.push(seam);
        }
    }

    (positive, negative)
}

/// Collects the triangles of one half, remapping source vertices and seam
/// crossings to vertices of its own.
pub struct HalfBuilder<'a> {
    source: &'a Mesh,
    builder: MeshBuilder,
    remap: Vec<u32>,
    seams: HashMap<(u32, u32), u32>,
    on_plane: Vec<bool>,
}

impl<'a> HalfBuilder<'a> {
    pub fn new(source: &'a Mesh) -> Self {
        Self {
            source,
            builder: MeshBuilder::with_attributes(
                source.normals().is_some(),
                source.uvs().is_some(),
            ),
            remap: vec![u32::MAX; source.vertex_count()],
            seams: HashMap::new(),
            on_plane: Vec::new(),
        }
    }

    /// Copies a triangle that lies entirely on this side.
    pub fn add_source_face(&mut self, face: &[u32; 3], classes: &Classification) {
        let face = face.map(|x| self.source_vertex(x, classes));
        self.builder.add_face(face);
    }

    /// Adds a convex polygon from [`split_triangle`] as a triangle fan.
    pub fn add_polygon(&mut self, corners: &[Corner], classes: &Classification, cache: &mut SeamCache) {
        let vertices = (corners.iter())
            .map(|&corner| match corner {
                Corner::Source(x) => self.source_vertex(x, classes),
                Corner::Seam(a, b) => self.seam_vertex(a, b, cache),
            })
            .collect::<Vec<_>>();

        for i in 1..vertices.len().saturating_sub(1) {
            self.builder.add_face([vertices[0], vertices[i], vertices[i + 1]]);
        }
    }

    fn source_vertex(&mut self, index: u32, classes: &Classification) -> u32 {
        let slot = &mut self.remap[index as usize];
        if *slot != u32::MAX {
            return *slot;
        }

        let (normal, uv) = attributes(self.source, index);
        let vertex = self.builder.add_vertex_with(self.source.vertices()[index as usize], normal, uv);
        self.remap[index as usize] = vertex;
        self.on_plane.push(classes.side(index) == Ordering::Equal);
        vertex
    }

    fn seam_vertex(&mut self, a: u32, b: u32, cache: &mut SeamCache) -> u32 {
        let key = (a.min(b), a.max(b));
        if let Some(&vertex) = self.seams.get(&key) {
            return vertex;
        }

        let seam = cache.get(a, b);
        let vertex = self.builder.add_vertex_with(seam.position, seam.normal, seam.uv);
        self.seams.insert(key, vertex);
        self.on_plane.push(true);
        vertex
    }

    pub fn has_faces(&self) -> bool {
        self.builder.face_count() > 0
    }

    /// The builder so far along with which of its vertices lie on the plane.
    pub fn finish(self) -> (MeshBuilder, Vec<bool>) {
        (self.builder, self.on_plane)
    }
}

fn attributes(mesh: &Mesh, index: u32) -> (Pos, Uv) {
    let normal = mesh.normals().map_or_else(Pos::zeros, |x| x[index as usize]);
    let uv = mesh.uvs().map_or_else(Uv::zeros, |x| x[index as usize]);
    (normal, uv)
}
