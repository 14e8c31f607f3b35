//! PLY (Stanford polygon) format support.
//!
//! Loading reads `vertex` positions and `face` index lists into a
//! [`SurfaceMesh`]; polygons are fan-triangulated. Saving writes ASCII PLY with
//! one `red green blue alpha` color per vertex, ready for a viewer.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{Result, SurfaceError};
use crate::mesh::SurfaceMesh;

/// Load surface geometry from a PLY file.
///
/// # Example
///
/// ```no_run
/// use sulcus::io::ply;
///
/// let mesh = ply::load_geometry("lh.white.ply").unwrap();
/// println!("{} vertices", mesh.num_vertices());
/// ```
pub fn load_geometry<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let (vertices, faces) = read_geometry(&mut reader).map_err(|message| SurfaceError::LoadError {
        path: path.to_path_buf(),
        message,
    })?;
    tracing::debug!(path = %path.display(), vertices = vertices.len(), faces = faces.len(), "read PLY");

    SurfaceMesh::new(vertices, faces)
}

/// Save a mesh with per-vertex RGBA colors as ASCII PLY.
///
/// # Errors
///
/// [`SurfaceError::LengthMismatch`] unless there is one color per vertex.
pub fn save_colored<P: AsRef<Path>>(mesh: &SurfaceMesh, colors: &[[u8; 4]], path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_colored(&mut writer, mesh, colors)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh with per-vertex RGBA colors as ASCII PLY to any writer.
pub fn write_colored<W: Write>(writer: &mut W, mesh: &SurfaceMesh, colors: &[[u8; 4]]) -> Result<()> {
    if colors.len() != mesh.num_vertices() {
        return Err(SurfaceError::LengthMismatch {
            what: "colors",
            expected: mesh.num_vertices(),
            actual: colors.len(),
        });
    }

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by sulcus")?;
    writeln!(writer, "element vertex {}", mesh.num_vertices())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "property uchar red")?;
    writeln!(writer, "property uchar green")?;
    writeln!(writer, "property uchar blue")?;
    writeln!(writer, "property uchar alpha")?;
    writeln!(writer, "element face {}", mesh.num_faces())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for (v, c) in mesh.vertices().iter().zip(colors) {
        writeln!(writer, "{} {} {} {} {} {} {}", v.x, v.y, v.z, c[0], c[1], c[2], c[3])?;
    }
    for f in mesh.faces() {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }
    Ok(())
}

type Geometry = (Vec<Point3<f64>>, Vec<[usize; 3]>);

fn read_geometry<R: BufRead>(reader: &mut R) -> std::result::Result<Geometry, String> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(reader).map_err(|e| e.to_string())?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or("PLY file has no vertex element")?;

    let mut vertices = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let coord = |name: &str| {
            get_float_property(vertex, name).ok_or_else(|| format!("vertex missing {name} coordinate"))
        };
        vertices.push(Point3::new(coord("x")?, coord("y")?, coord("z")?));
    }

    let face_element = ply.payload.get("face").ok_or("PLY file has no face element")?;

    let mut faces = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or("face missing vertex_indices property")?;

        // Fan-triangulate polygons; lines and points carry no surface.
        for i in 1..indices.len().saturating_sub(1) {
            faces.push([indices[0], indices[i], indices[i + 1]]);
        }
    }

    if faces.is_empty() {
        return Err("PLY file contains no faces".to_string());
    }
    Ok((vertices, faces))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}
