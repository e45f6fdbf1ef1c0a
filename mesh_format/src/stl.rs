use std::io::{Read, Seek, Write};

use anyhow::{Context, Result};
use nalgebra::Vector3;
use stl_io::{Normal, Triangle, Vertex};

use crate::Mesh;

/// Reads both ascii and binary STL. Identical vertices are merged by
/// `stl_io`, so the result is indexed.
pub fn parse<T: Read + Seek>(reader: &mut T) -> Result<Mesh> {
    let stl = stl_io::read_stl(reader).context("Invalid STL file")?;

    let verts = (stl.vertices.iter())
        .map(|v| Vector3::new(v[0], v[1], v[2]))
        .collect();
    let faces = (stl.faces.iter())
        .map(|face| face.vertices.map(|idx| idx as u32))
        .collect();

    Ok(Mesh {
        verts,
        normals: None,
        uvs: None,
        faces,
    })
}

/// Writes a binary STL. Facet normals come from the winding order, vertex
/// normals and uvs can't be stored in the format and are dropped.
pub fn write<W: Write>(writer: &mut W, mesh: &Mesh) -> Result<()> {
    let triangles = (mesh.faces.iter())
        .map(|face| {
            let [a, b, c] = face.map(|idx| mesh.verts[idx as usize]);
            let normal = (b - a)
                .cross(&(c - a))
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);

            Triangle {
                normal: Normal::new(normal.into()),
                vertices: [a, b, c].map(|v| Vertex::new(v.into())),
            }
        })
        .collect::<Vec<_>>();

    stl_io::write_stl(writer, triangles.iter())?;
    Ok(())
}
