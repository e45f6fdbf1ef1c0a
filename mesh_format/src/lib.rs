use std::io::{BufRead, Seek, Write};

use anyhow::{bail, Result};
use nalgebra::{Vector2, Vector3};
use tracing::debug;

mod obj;
mod stl;

/// Raw triangle soup as read from or written to a file. Normals and UVs are
/// per vertex and only present when the file provides them for every face.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub verts: Vec<Vector3<f32>>,
    pub normals: Option<Vec<Vector3<f32>>>,
    pub uvs: Option<Vec<Vector2<f32>>>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    /// Checks that every face index and attribute buffer lines up with the
    /// vertex buffer.
    pub fn validate(&self) -> Result<()> {
        let count = self.verts.len();
        if let Some(face) = (self.faces.iter()).find(|face| face.iter().any(|&i| i as usize >= count)) {
            bail!("Face {:?} references a vertex out of range ({count} vertices)", face);
        }

        if self.normals.as_ref().is_some_and(|x| x.len() != count) {
            bail!("Normal count does not match vertex count");
        }

        if self.uvs.as_ref().is_some_and(|x| x.len() != count) {
            bail!("UV count does not match vertex count");
        }

        Ok(())
    }
}

/// Loads a buffer into a mesh in a blocking manner.
/// Supported formats include `.stl` and `.obj`.
pub fn load_mesh<T: BufRead + Seek>(mut reader: T, format: &str) -> Result<Mesh> {
    let format = format.to_ascii_lowercase();
    let mesh = match format.as_str() {
        "stl" => stl::parse(&mut reader)?,
        "obj" => obj::parse(reader)?,
        _ => bail!("Unsupported format: {}", format),
    };

    mesh.validate()?;
    debug!(
        "Loaded {format} mesh {{ vert: {}, face: {} }}",
        mesh.verts.len(),
        mesh.faces.len()
    );

    Ok(mesh)
}

/// Writes a mesh in the given format, either `.stl` (binary) or `.obj`.
pub fn save_mesh<W: Write>(writer: &mut W, mesh: &Mesh, format: &str) -> Result<()> {
    mesh.validate()?;

    let format = format.to_ascii_lowercase();
    match format.as_str() {
        "stl" => stl::write(writer, mesh),
        "obj" => obj::write(writer, mesh),
        _ => bail!("Unsupported format: {}", format),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn tetrahedron() -> Mesh {
        Mesh {
            verts: vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            normals: None,
            uvs: None,
            faces: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        }
    }

    #[test]
    fn obj_written_then_loaded() {
        let mesh = tetrahedron();
        let mut buf = Vec::new();
        save_mesh(&mut buf, &mesh, "OBJ").unwrap();

        let loaded = load_mesh(Cursor::new(buf), "obj").unwrap();
        assert_eq!(loaded, mesh);
    }

    #[test]
    fn stl_written_then_loaded() {
        let mesh = tetrahedron();
        let mut buf = Vec::new();
        save_mesh(&mut buf, &mesh, "stl").unwrap();

        let loaded = load_mesh(Cursor::new(buf), "stl").unwrap();
        assert_eq!(loaded.faces.len(), 4);
        assert_eq!(loaded.verts.len(), 4);
        for (face, original) in loaded.faces.iter().zip(&mesh.faces) {
            let a = face.map(|i| loaded.verts[i as usize]);
            let b = original.map(|i| mesh.verts[i as usize]);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn unknown_format() {
        assert!(load_mesh(Cursor::new(Vec::new()), "ply").is_err());
        assert!(save_mesh(&mut Vec::new(), &tetrahedron(), "3mf").is_err());
    }

    #[test]
    fn out_of_range_face() {
        let mut mesh = tetrahedron();
        mesh.faces.push([0, 1, 9]);
        assert!(save_mesh(&mut Vec::new(), &mesh, "obj").is_err());
    }
}
