use std::{
    collections::HashMap,
    io::{BufRead, BufWriter, Write},
};

use anyhow::{bail, Context, Result};
use nalgebra::{Vector2, Vector3};

use crate::Mesh;

/// One corner of a face, indexing into the separate position, uv and normal
/// streams of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: u32,
    uv: Option<u32>,
    normal: Option<u32>,
}

/// Lines are decoded lossily, so stray non UTF-8 bytes in comments or
/// material names don't fail the load.
pub fn parse<T: BufRead>(mut reader: T) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut triangles = Vec::new();

    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);

        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let vert = next_vector(parts)
                    .with_context(|| format!("Invalid vertex on line {line_no}"))?;
                positions.push(vert);
            }
            Some("vn") => {
                let normal = next_vector(parts)
                    .with_context(|| format!("Invalid normal on line {line_no}"))?;
                normals.push(normal);
            }
            Some("vt") => {
                let uv =
                    next_uv(parts).with_context(|| format!("Invalid uv on line {line_no}"))?;
                uvs.push(uv);
            }
            Some("f") => {
                let counts = (positions.len(), uvs.len(), normals.len());
                let polygon = parts
                    .map(|part| next_corner(part, counts))
                    .collect::<Option<Vec<_>>>()
                    .with_context(|| format!("Invalid face on line {line_no}"))?;

                if polygon.len() < 3 {
                    bail!("Face with less than three corners on line {line_no}");
                }

                // Faces are convex polygons, so a fan is enough.
                for i in 1..polygon.len() - 1 {
                    triangles.push([polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    assemble(positions, normals, uvs, triangles)
}

/// OBJ files index positions, uvs and normals separately, this merges each
/// distinct combination into a single vertex.
fn assemble(
    positions: Vec<Vector3<f32>>,
    normals: Vec<Vector3<f32>>,
    uvs: Vec<Vector2<f32>>,
    triangles: Vec<[Corner; 3]>,
) -> Result<Mesh> {
    let corners = || triangles.iter().flatten();
    if let Some(corner) = corners().find(|x| x.position as usize >= positions.len()) {
        bail!("Face references missing vertex {}", corner.position + 1);
    }

    let use_uvs = !uvs.is_empty()
        && corners().all(|x| x.uv.is_some_and(|uv| (uv as usize) < uvs.len()));
    let use_normals = !normals.is_empty()
        && corners().all(|x| x.normal.is_some_and(|n| (n as usize) < normals.len()));

    if !use_uvs && !use_normals {
        let faces = triangles.iter().map(|x| x.map(|c| c.position)).collect();
        return Ok(Mesh {
            verts: positions,
            normals: None,
            uvs: None,
            faces,
        });
    }

    let mut mesh = Mesh {
        normals: use_normals.then(Vec::new),
        uvs: use_uvs.then(Vec::new),
        ..Default::default()
    };

    let mut lookup = HashMap::new();
    for triangle in triangles {
        let face = triangle.map(|corner| {
            let corner = Corner {
                uv: corner.uv.filter(|_| use_uvs),
                normal: corner.normal.filter(|_| use_normals),
                ..corner
            };

            *lookup.entry(corner).or_insert_with(|| {
                mesh.verts.push(positions[corner.position as usize]);
                if let (Some(out), Some(uv)) = (&mut mesh.uvs, corner.uv) {
                    out.push(uvs[uv as usize]);
                }
                if let (Some(out), Some(normal)) = (&mut mesh.normals, corner.normal) {
                    out.push(normals[normal as usize]);
                }
                mesh.verts.len() as u32 - 1
            })
        });
        mesh.faces.push(face);
    }

    Ok(mesh)
}

pub fn write<W: Write>(writer: &mut W, mesh: &Mesh) -> Result<()> {
    let mut out = BufWriter::new(writer);

    for v in mesh.verts.iter() {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }

    for uv in mesh.uvs.iter().flatten() {
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }

    for n in mesh.normals.iter().flatten() {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }

    let (has_uvs, has_normals) = (mesh.uvs.is_some(), mesh.normals.is_some());
    for face in mesh.faces.iter() {
        let [a, b, c] = face.map(|x| x + 1);
        match (has_uvs, has_normals) {
            (false, false) => writeln!(out, "f {a} {b} {c}")?,
            (true, false) => writeln!(out, "f {a}/{a} {b}/{b} {c}/{c}")?,
            (false, true) => writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?,
            (true, true) => writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?,
        }
    }

    out.flush()?;
    Ok(())
}

fn next_vector<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<Vector3<f32>> {
    Some(Vector3::new(
        parts.next()?.parse().ok()?,
        parts.next()?.parse().ok()?,
        parts.next()?.parse().ok()?,
    ))
}

fn next_uv<'a>(mut parts: impl Iterator<Item = &'a str>) -> Option<Vector2<f32>> {
    Some(Vector2::new(
        parts.next()?.parse().ok()?,
        parts.next().map(str::parse::<f32>).transpose().ok()?.unwrap_or(0.0),
    ))
}

/// Parses `v`, `v/vt`, `v//vn` or `v/vt/vn`. Negative indices are relative
/// to the end of the respective list at the point the face is read.
fn next_corner(part: &str, (positions, uvs, normals): (usize, usize, usize)) -> Option<Corner> {
    fn index(raw: &str, len: usize) -> Option<u32> {
        let raw = raw.parse::<i64>().ok()?;
        let idx = match raw {
            0 => return None,
            _ if raw > 0 => raw - 1,
            _ => len as i64 + raw,
        };
        u32::try_from(idx).ok()
    }

    let mut fields = part.split('/');
    let position = index(fields.next()?, positions)?;
    let uv = match fields.next() {
        Some("") | None => None,
        Some(raw) => Some(index(raw, uvs)?),
    };
    let normal = match fields.next() {
        Some("") | None => None,
        Some(raw) => Some(index(raw, normals)?),
    };

    Some(Corner {
        position,
        uv,
        normal,
    })
}
