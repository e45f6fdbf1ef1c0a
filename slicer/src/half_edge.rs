use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    repeated_edges: bool,
}

#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub origin_vertex: u32,
    pub vertex: u32,
    pub next: u32,
    pub twin: Option<u32>,
}

impl HalfEdgeMesh {
    /// Builds the half edges of a set of faces. Vertex ids are compared
    /// directly, so callers weld coincident vertices first when needed.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut half_edges = Vec::with_capacity(faces.len() * 3);
        let mut edge_map = HashMap::<_, Vec<u32>>::new();

        for face in faces.iter() {
            let first_edge = half_edges.len() as u32;
            for i in 0..3 {
                let half_edge = HalfEdge {
                    origin_vertex: face[i],
                    vertex: face[(i + 1) % 3],
                    next: first_edge + (i as u32 + 1) % 3,
                    twin: None,
                };

                let edge_key = (face[i], face[(i + 1) % 3]);
                half_edges.push(half_edge);
                edge_map
                    .entry(edge_key)
                    .or_default()
                    .push(first_edge + i as u32);
            }
        }

        // Pair every a->b with a b->a. On non-manifold edges the extra
        // copies are paired in order and the rest stay open.
        for (&(a, b), edges) in edge_map.iter() {
            if a >= b {
                continue;
            }

            let Some(twins) = edge_map.get(&(b, a)) else {
                continue;
            };

            for (&edge, &twin) in edges.iter().zip(twins) {
                half_edges[edge as usize].twin = Some(twin);
                half_edges[twin as usize].twin = Some(edge);
            }
        }

        let repeated_edges = edge_map.values().any(|x| x.len() > 1);
        Self {
            half_edges,
            repeated_edges,
        }
    }

    pub fn half_edges(&self) -> &[HalfEdge] {
        &self.half_edges
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    pub fn get_edge(&self, idx: u32) -> &HalfEdge {
        &self.half_edges[idx as usize]
    }

    /// Half edges without a twin, these run along holes in the surface.
    pub fn boundary(&self) -> impl Iterator<Item = &HalfEdge> {
        self.half_edges.iter().filter(|x| x.twin.is_none())
    }

    /// Every edge is used exactly once in each direction.
    pub fn is_closed(&self) -> bool {
        !self.repeated_edges && self.half_edges.iter().all(|x| x.twin.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::HalfEdgeMesh;

    const TETRAHEDRON: [[u32; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];

    #[test]
    fn tetrahedron_is_closed() {
        let mesh = HalfEdgeMesh::build(&TETRAHEDRON);
        assert_eq!(mesh.half_edge_count(), 12);
        assert!(mesh.is_closed());

        for (idx, edge) in mesh.half_edges().iter().enumerate() {
            let twin = mesh.get_edge(edge.twin.unwrap());
            assert_eq!(twin.twin, Some(idx as u32));
            assert_eq!((twin.vertex, twin.origin_vertex), (edge.origin_vertex, edge.vertex));
            assert_eq!(mesh.get_edge(mesh.get_edge(edge.next).next).next as usize, idx);
        }
    }

    #[test]
    fn missing_face_leaves_boundary() {
        let mesh = HalfEdgeMesh::build(&TETRAHEDRON[1..]);
        assert!(!mesh.is_closed());

        let mut boundary = mesh
            .boundary()
            .map(|x| (x.origin_vertex, x.vertex))
            .collect::<Vec<_>>();
        boundary.sort();
        assert_eq!(boundary, vec![(0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn repeated_faces_are_not_closed() {
        let mut faces = TETRAHEDRON.to_vec();
        faces.extend_from_slice(&[[0, 2, 1], [1, 2, 0]]);
        let mesh = HalfEdgeMesh::build(&faces);
        assert!(!mesh.is_closed());
    }
}
