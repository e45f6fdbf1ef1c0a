use std::f32::consts::{PI, TAU};

use crate::{mesh::Mesh, Pos, Uv};

/// Incrementally assembles a [`Mesh`]. Normals and uvs are only stored when
/// enabled with [`MeshBuilder::with_attributes`].
#[derive(Debug)]
pub struct MeshBuilder {
    vertices: Vec<Pos>,
    normals: Option<Vec<Pos>>,
    uvs: Option<Vec<Uv>>,
    faces: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::with_attributes(false, false)
    }

    pub fn with_attributes(normals: bool, uvs: bool) -> Self {
        Self {
            vertices: Vec::new(),
            normals: normals.then(Vec::new),
            uvs: uvs.then(Vec::new),
            faces: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self, vertex: Pos) -> u32 {
        self.add_vertex_with(vertex, Pos::zeros(), Uv::zeros())
    }

    /// Adds a vertex along with its attributes. Attributes that aren't
    /// enabled are ignored.
    pub fn add_vertex_with(&mut self, vertex: Pos, normal: Pos, uv: Uv) -> u32 {
        self.vertices.push(vertex);
        if let Some(normals) = &mut self.normals {
            normals.push(normal);
        }
        if let Some(uvs) = &mut self.uvs {
            uvs.push(uv);
        }
        (self.vertices.len() - 1) as u32
    }

    pub fn add_face(&mut self, face: [u32; 3]) {
        self.faces.push(face);
    }

    pub fn add_quad(&mut self, quad: [u32; 4]) {
        self.add_face([quad[0], quad[1], quad[2]]);
        self.add_face([quad[2], quad[1], quad[3]]);
    }

    pub fn vertex(&self, index: u32) -> Pos {
        self.vertices[index as usize]
    }

    pub fn vertices(&self) -> &[Pos] {
        &self.vertices
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

    pub fn build(self) -> Mesh {
        Mesh::from_parts(self.vertices, self.normals, self.uvs, self.faces)
    }
}

impl MeshBuilder {
    /// Axis aligned box with eight shared corners and two triangles per side.
    pub fn add_cuboid(&mut self, min: Pos, max: Pos) {
        let corners = (0..8)
            .map(|i| {
                let pick = |bit: u32, axis: usize| if i & bit == 0 { min[axis] } else { max[axis] };
                self.add_vertex(Pos::new(pick(1, 0), pick(2, 1), pick(4, 2)))
            })
            .collect::<Vec<_>>();

        // Counter-clockwise seen from outside, in quad strip order.
        const SIDES: [[usize; 4]; 6] = [
            [0, 4, 2, 6],
            [1, 3, 5, 7],
            [0, 1, 4, 5],
            [2, 6, 3, 7],
            [0, 2, 1, 3],
            [4, 5, 6, 7],
        ];

        for side in SIDES {
            self.add_quad(side.map(|x| corners[x]));
        }
    }

    /// Sphere made of `rings` latitude bands, each split into `sectors`
    /// quads, with a single vertex at each pole. Vertex normals and uvs are
    /// filled in when enabled.
    pub fn add_uv_sphere(&mut self, center: Pos, radius: f32, rings: u32, sectors: u32) {
        let rings = rings.max(2);
        let sectors = sectors.max(3);

        let mut vertex = |theta: f32, phi: f32| {
            let normal = Pos::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            let uv = Uv::new(phi / TAU, theta / PI);
            self.add_vertex_with(center + normal * radius, normal, uv)
        };

        let north = vertex(0.0, 0.0);
        let bands = (1..rings)
            .map(|ring| {
                let theta = PI * ring as f32 / rings as f32;
                (0..sectors)
                    .map(|sector| vertex(theta, TAU * sector as f32 / sectors as f32))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let south = vertex(PI, 0.0);

        let band = |ring: usize, sector: u32| bands[ring][(sector % sectors) as usize];
        let mut faces = Vec::new();
        for sector in 0..sectors {
            faces.push([north, band(0, sector + 1), band(0, sector)]);
            for ring in 0..bands.len() - 1 {
                let (a, b) = (band(ring, sector), band(ring, sector + 1));
                let (c, d) = (band(ring + 1, sector), band(ring + 1, sector + 1));
                faces.extend([[a, b, c], [b, d, c]]);
            }
            let last = bands.len() - 1;
            faces.push([band(last, sector), band(last, sector + 1), south]);
        }

        self.faces.extend(faces);
    }

    /// Ring torus around the y axis. `major` is the distance from the center
    /// to the middle of the tube and `minor` the radius of the tube.
    pub fn add_torus(&mut self, center: Pos, major: f32, minor: f32, segments: u32, sides: u32) {
        let (segments, sides) = (segments.max(3), sides.max(3));

        let mut grid = Vec::with_capacity((segments * sides) as usize);
        for segment in 0..segments {
            let phi = TAU * segment as f32 / segments as f32;
            for side in 0..sides {
                let psi = TAU * side as f32 / sides as f32;
                let ring = major + minor * psi.cos();
                let pos = Pos::new(ring * phi.cos(), minor * psi.sin(), ring * phi.sin());
                grid.push(self.add_vertex(center + pos));
            }
        }

        let at = |segment: u32, side: u32| grid[((segment % segments) * sides + side % sides) as usize];
        for segment in 0..segments {
            for side in 0..sides {
                let (a, b) = (at(segment, side), at(segment + 1, side));
                let (c, d) = (at(segment, side + 1), at(segment + 1, side + 1));
                self.faces.extend([[a, c, b], [c, d, b]]);
            }
        }
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}
