//! Load and save reconstructed scan meshes in a line-oriented text format.
//!
//! Vertex lines are `v x y z r g b` with color channels in [0, 1]; face
//! lines are `f a//an b//bn c//cn` with 1-based indices. Loading re-centers
//! all vertices about their centroid.

use crate::Result;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A reconstructed scan mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanMesh {
    pub vertices: Vec<[f32; 3]>,
    /// Per-vertex RGB, parallel to `vertices`.
    pub colors: Vec<[u8; 3]>,
    /// Flat triangle index triples, 0-based.
    pub triangles: Vec<u32>,
}

/// Parse a mesh file. Malformed lines are skipped with a warning; a
/// missing or unreadable file is an error.
pub fn load_mesh(path: &Path) -> Result<ScanMesh> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut mesh = ScanMesh::default();

    for line in reader.lines() {
        let line = line?;
        if let Some(rest) = line.strip_prefix("v ") {
            let values: Vec<f32> = rest
                .split_whitespace()
                .filter_map(|token| token.parse().ok())
                .collect();
            if values.len() < 6 {
                log::warn!("skipping malformed vertex line: {:?}", line);
                continue;
            }
            mesh.vertices.push([values[0], values[1], values[2]]);
            mesh.colors.push([
                channel_to_u8(values[3]),
                channel_to_u8(values[4]),
                channel_to_u8(values[5]),
            ]);
        } else if let Some(rest) = line.strip_prefix('f') {
            // Each token is a vertex//normal index pair; only the vertex
            // index matters here.
            let indices: Vec<u32> = rest
                .split_whitespace()
                .filter_map(|pair| pair.split("//").next().and_then(|v| v.parse().ok()))
                .filter(|&v| v >= 1)
                .collect();
            if indices.len() < 3 {
                log::warn!("skipping malformed face line: {:?}", line);
                continue;
            }
            for &index in &indices[..3] {
                mesh.triangles.push(index - 1);
            }
        }
    }

    recenter(&mut mesh);
    Ok(mesh)
}

/// Write a mesh in the same text format `load_mesh` reads.
pub fn save_mesh(path: &Path, mesh: &ScanMesh) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    for (vertex, color) in mesh.vertices.iter().zip(&mesh.colors) {
        writeln!(
            file,
            "v {} {} {} {} {} {}",
            vertex[0],
            vertex[1],
            vertex[2],
            color[0] as f32 / 255.0,
            color[1] as f32 / 255.0,
            color[2] as f32 / 255.0,
        )?;
    }
    for triangle in mesh.triangles.chunks_exact(3) {
        writeln!(
            file,
            "f {0}//{0} {1}//{1} {2}//{2}",
            triangle[0] + 1,
            triangle[1] + 1,
            triangle[2] + 1,
        )?;
    }

    file.flush()?;
    Ok(())
}

fn channel_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Move all vertices so their mean sits at the origin.
fn recenter(mesh: &mut ScanMesh) {
    if mesh.vertices.is_empty() {
        return;
    }
    let mut center = [0.0f32; 3];
    for vertex in &mesh.vertices {
        center[0] += vertex[0];
        center[1] += vertex[1];
        center[2] += vertex[2];
    }
    let count = mesh.vertices.len() as f32;
    center[0] /= count;
    center[1] /= count;
    center[2] /= count;
    for vertex in &mut mesh.vertices {
        vertex[0] -= center[0];
        vertex[1] -= center[1];
        vertex[2] -= center[2];
    }
}
