use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector2;
use tracing::trace;

use crate::{
    builder::MeshBuilder, half_edge::HalfEdgeMesh, mesh::weld_positions, plane::Plane,
    triangulate::triangulate_loops, Pos,
};

/// Closed seam loops of one half, as vertex indices of its builder.
#[derive(Debug, Default)]
pub struct SeamLoops {
    pub loops: Vec<Vec<u32>>,
    /// Chains of at least three vertices that ended without getting back to
    /// their start. Still worth capping on a mesh with holes.
    pub chains: Vec<Vec<u32>>,
    /// Number of chains that didn't close, short ones included.
    pub open: usize,
}

/// Finds the loops a cap has to fill. These are the boundary edges of the
/// surface that run along the plane, reversed so they wind the way the cap
/// faces do. Vertices are welded by position first so attribute seams in the
/// source don't break loops apart.
pub fn seam_loops(vertices: &[Pos], faces: &[[u32; 3]], on_plane: &[bool]) -> SeamLoops {
    let ids = weld_positions(vertices);
    let mut representative = HashMap::new();
    let mut id_on_plane = HashMap::new();
    for (vertex, &id) in ids.iter().enumerate() {
        representative.entry(id).or_insert(vertex as u32);
        *id_on_plane.entry(id).or_insert(false) |= on_plane[vertex];
    }

    let welded = (faces.iter())
        .map(|face| face.map(|x| ids[x as usize]))
        .collect::<Vec<_>>();
    let half_edges = HalfEdgeMesh::build(&welded);

    let mut walker = Walker::default();
    for edge in half_edges.boundary() {
        let (a, b) = (edge.origin_vertex, edge.vertex);
        if a != b && id_on_plane[&a] && id_on_plane[&b] {
            walker.add_edge(b, a);
        }
    }

    let mut out = walker.walk();
    for lp in out.loops.iter_mut().chain(out.chains.iter_mut()) {
        lp.iter_mut().for_each(|x| *x = representative[&*x]);
    }
    out
}

/// Directed cap edges, consumed while chaining them into loops.
#[derive(Default)]
struct Walker {
    outgoing: BTreeMap<u32, Vec<u32>>,
    incoming: HashMap<u32, usize>,
}

impl Walker {
    fn add_edge(&mut self, from: u32, to: u32) {
        self.outgoing.entry(from).or_default().push(to);
        *self.incoming.entry(to).or_default() += 1;
    }

    fn pop_edge(&mut self, from: u32) -> Option<u32> {
        let targets = self.outgoing.get_mut(&from)?;
        let to = targets.pop()?;
        if targets.is_empty() {
            self.outgoing.remove(&from);
        }

        if let Some(count) = self.incoming.get_mut(&to) {
            *count -= 1;
        }
        Some(to)
    }

    /// Start at the beginning of an open chain if there is one, so the chain
    /// isn't cut in two.
    fn next_start(&self) -> Option<u32> {
        let no_incoming = |x: &u32| self.incoming.get(x).map_or(true, |&c| c == 0);
        let mut keys = self.outgoing.keys();
        keys.clone()
            .find(|x| no_incoming(x))
            .or_else(|| keys.next())
            .copied()
    }

    fn walk(mut self) -> SeamLoops {
        let mut out = SeamLoops::default();

        while let Some(start) = self.next_start() {
            let mut path = vec![start];
            let mut visited = HashMap::from([(start, 0)]);
            let mut current = start;

            loop {
                let Some(next) = self.pop_edge(current) else {
                    trace!("Seam chain of {} vertices ends without closing", path.len());
                    out.open += 1;
                    if path.len() >= 3 {
                        out.chains.push(path);
                    }
                    break;
                };

                // Revisiting a vertex closes a simple loop, which is split
                // off. Walking continues from the shared vertex.
                if let Some(&index) = visited.get(&next) {
                    let cycle = path.split_off(index);
                    cycle.iter().for_each(|x| {
                        visited.remove(x);
                    });
                    if cycle.len() >= 3 {
                        out.loops.push(cycle);
                    }

                    if path.is_empty() {
                        break;
                    }
                }

                visited.insert(next, path.len());
                path.push(next);
                current = next;
            }
        }

        out
    }
}

/// Fills the loops with triangles facing along the normal of `cap_plane`.
/// Cap vertices are new copies of the loop vertices with the cap normal and
/// planar uvs. Returns the number of triangles added.
pub fn add_cap(builder: &mut MeshBuilder, loops: &[Vec<u32>], cap_plane: &Plane) -> usize {
    let basis = cap_plane.basis();
    let origin = cap_plane.origin();

    let mut local = HashMap::new();
    let mut sources = Vec::new();
    let local_loops = (loops.iter())
        .map(|lp| {
            (lp.iter())
                .map(|&vertex| {
                    *local.entry(vertex).or_insert_with(|| {
                        sources.push(vertex);
                        sources.len() as u32 - 1
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let points = (sources.iter())
        .map(|&x| cap_plane.to_local(basis, &origin, &builder.vertex(x)))
        .collect::<Vec<Vector2<f32>>>();
    let triangles = triangulate_loops(&points, &local_loops);

    let normal = cap_plane.normal();
    let first = builder.vertex_count() as u32;
    for (&source, uv) in sources.iter().zip(points.iter()) {
        builder.add_vertex_with(builder.vertex(source), normal, *uv);
    }

    for triangle in triangles.iter() {
        builder.add_face(triangle.map(|x| first + x));
    }

    triangles.len()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::mesh::position_key;

    /// Square frame in the y = 0 plane made of four quads, with the inner
    /// and outer square both left open.
    fn frame() -> (Vec<Pos>, Vec<[u32; 3]>) {
        let square = |size: f32| {
            [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)].map(|(x, z)| Pos::new(x, 0.0, z) * size)
        };
        let mut vertices = square(2.0).to_vec();
        vertices.extend(square(1.0));

        let mut faces = Vec::new();
        for i in 0..4 {
            let j = (i + 1) % 4;
            faces.push([i, 4 + j, j]);
            faces.push([i, 4 + i, 4 + j]);
        }
        (vertices, faces)
    }

    #[test]
    fn frame_has_two_loops() {
        let (vertices, faces) = frame();
        let loops = seam_loops(&vertices, &faces, &[true; 8]);
        assert_eq!(loops.open, 0);
        assert_eq!(loops.loops.len(), 2);

        let mut lengths = loops.loops.iter().map(Vec::len).collect::<Vec<_>>();
        lengths.sort();
        assert_eq!(lengths, vec![4, 4]);
    }

    #[test]
    fn loops_weld_split_vertices() {
        // Every face corner is its own vertex.
        let (vertices, faces) = frame();
        let split = faces.iter().flatten().map(|&x| vertices[x as usize]).collect::<Vec<_>>();
        let faces = (0..faces.len() as u32).map(|x| [3 * x, 3 * x + 1, 3 * x + 2]).collect::<Vec<_>>();

        let loops = seam_loops(&split, &faces, &vec![true; split.len()]);
        assert_eq!(loops.open, 0);
        assert_eq!(loops.loops.len(), 2);
        for lp in loops.loops.iter() {
            assert_eq!(lp.len(), 4);
            let positions = lp.iter().map(|&x| position_key(&split[x as usize])).collect::<HashSet<_>>();
            assert_eq!(positions.len(), 4);
        }
    }

    #[test]
    fn off_plane_boundary_is_ignored() {
        let (vertices, faces) = frame();
        let mut on_plane = [true; 8];
        on_plane[4..].fill(false);

        let loops = seam_loops(&vertices, &faces, &on_plane);
        assert_eq!(loops.loops.len(), 1);
        assert!(loops.loops[0].iter().all(|&x| x < 4));
    }

    #[test]
    fn figure_eight_is_split() {
        let mut walker = Walker::default();
        for (a, b) in [(0, 1), (1, 2), (2, 0), (0, 3), (3, 4), (4, 0)] {
            walker.add_edge(a, b);
        }

        let loops = walker.walk();
        assert_eq!(loops.open, 0);
        assert_eq!(loops.loops.len(), 2);
        assert!(loops.loops.iter().all(|x| x.len() == 3 && x.contains(&0)));
    }

    #[test]
    fn open_chain_is_reported() {
        let mut walker = Walker::default();
        for (a, b) in [(5, 6), (6, 7), (7, 8)] {
            walker.add_edge(a, b);
        }

        let loops = walker.walk();
        assert_eq!(loops.open, 1);
        assert!(loops.loops.is_empty());
        assert_eq!(loops.chains, vec![vec![5, 6, 7, 8]]);
    }

    #[test]
    fn cap_covers_frame_hole() {
        let (vertices, faces) = frame();
        let loops = seam_loops(&vertices, &faces, &[true; 8]);

        let mut builder = MeshBuilder::with_attributes(true, true);
        vertices.iter().for_each(|&x| {
            builder.add_vertex(x);
        });
        faces.iter().for_each(|&x| builder.add_face(x));

        // The frame faces up, so the cap closing it from below faces down
        // and has the inner square as a hole.
        let plane = Plane::from_normal_and_point(-Pos::y(), Pos::zeros()).unwrap();
        let added = add_cap(&mut builder, &loops.loops, &plane);
        let mesh = builder.build();

        assert_eq!(added, 8);
        assert_eq!(mesh.vertex_count(), 16);
        assert!(mesh.is_watertight());
        assert!((mesh.surface_area() - 2.0 * 12.0).abs() < 1e-4);
        for face in 8..mesh.face_count() {
            assert_eq!(mesh.normal(face), -Pos::y());
        }
    }
}
