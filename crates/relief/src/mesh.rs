//! RMSH: the persisted relief mesh artifact.
//!
//! File layout (little-endian):
//!   00  : [u8;4]  magic = b"RMSH"
//!   04  : u32     version = 1
//!   08  : u32     flags (bit 0 => triangle indices present)
//!   0C  : u32     vertex_count
//!   10  : f64     radius (already unit-scaled)
//!   18  : for each vertex: f32 x, f32 y, f32 z
//!   ..  : SCLR chunk: "SCLR" u16 name_len, name bytes, f32 per vertex
//!   ..  : TRIS chunk (if bit 0): "TRIS" u32 tri_count, u32[3] per triangle
//!
//! Downstream viewers read the scalar array by name and apply a
//! user-adjustable warp factor to it; the name is "Heights", verbatim, and
//! the values share the unit scale of the vertex positions.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use crate::sphere::SphereMesh;

pub const RMSH_MAGIC: [u8; 4] = *b"RMSH";
pub const RMSH_VERSION: u32 = 1;

/// Scalar array name the rendering collaborator expects, verbatim.
pub const HEIGHTS_ARRAY_NAME: &str = "Heights";

/// A serialized-form relief mesh: sphere vertex positions plus exactly one
/// named per-vertex scalar array.
#[derive(Debug, Clone)]
pub struct ReliefMesh {
    pub radius: f64,
    pub positions: Vec<[f32; 3]>,
    pub scalar_name: String,
    pub scalars: Vec<f32>,
    pub triangles: Option<Vec<[u32; 3]>>,
}

impl From<&SphereMesh> for ReliefMesh {
    fn from(mesh: &SphereMesh) -> Self {
        Self {
            radius: mesh.radius,
            positions: mesh
                .vertices
                .iter()
                .map(|v| [v[0] as f32, v[1] as f32, v[2] as f32])
                .collect(),
            scalar_name: HEIGHTS_ARRAY_NAME.to_string(),
            scalars: mesh.heights.iter().map(|&h| h as f32).collect(),
            triangles: Some(mesh.triangles.clone()),
        }
    }
}

#[inline(always)]
fn need(buf: &[u8], want: usize) -> io::Result<()> {
    if buf.len() < want {
        Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated RMSH"))
    } else {
        Ok(())
    }
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    need(buf, n)?;
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

#[inline(always)]
fn le_u16(buf: &mut &[u8]) -> io::Result<u16> {
    let b = take(buf, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline(always)]
fn le_u32(buf: &mut &[u8]) -> io::Result<u32> {
    let b = take(buf, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline(always)]
fn le_f32(buf: &mut &[u8]) -> io::Result<f32> {
    let b = take(buf, 4)?;
    Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

#[inline(always)]
fn le_f64(buf: &mut &[u8]) -> io::Result<f64> {
    let b = take(buf, 8)?;
    Ok(f64::from_le_bytes([
        b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
    ]))
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

/// Parse RMSH from a contiguous byte slice. The single source of truth for
/// parsing.
pub fn parse_bytes(mut p: &[u8]) -> io::Result<ReliefMesh> {
    if take(&mut p, 4)? != RMSH_MAGIC {
        return Err(bad("bad RMSH magic"));
    }

    let version = le_u32(&mut p)?;
    if version != RMSH_VERSION {
        return Err(bad("unsupported RMSH version"));
    }

    let flags = le_u32(&mut p)?;
    let has_triangles = (flags & (1 << 0)) != 0;

    let count = le_u32(&mut p)? as usize;
    let radius = le_f64(&mut p)?;

    let pos_bytes = count
        .checked_mul(12)
        .ok_or_else(|| bad("position block size overflow"))?;
    let raw = take(&mut p, pos_bytes)?;

    let mut positions = Vec::<[f32; 3]>::with_capacity(count);
    for chunk in raw.chunks_exact(12) {
        positions.push([
            f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]),
            f32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]),
        ]);
    }

    if take(&mut p, 4)? != b"SCLR" {
        return Err(bad("expected SCLR tag"));
    }

    let name_len = le_u16(&mut p)? as usize;
    let name_bytes = take(&mut p, name_len)?;
    let scalar_name = std::str::from_utf8(name_bytes)
        .map_err(|_| bad("scalar name is not UTF-8"))?
        .to_string();

    let mut scalars = Vec::<f32>::with_capacity(count);
    for _ in 0..count {
        scalars.push(le_f32(&mut p)?);
    }

    let triangles = if has_triangles {
        if take(&mut p, 4)? != b"TRIS" {
            return Err(bad("expected TRIS tag"));
        }

        let tri_count = le_u32(&mut p)? as usize;
        let mut tris = Vec::<[u32; 3]>::with_capacity(tri_count);
        for _ in 0..tri_count {
            tris.push([le_u32(&mut p)?, le_u32(&mut p)?, le_u32(&mut p)?]);
        }

        Some(tris)
    } else {
        None
    };

    Ok(ReliefMesh {
        radius,
        positions,
        scalar_name,
        scalars,
        triangles,
    })
}

/// Serialize a mesh to any writer.
pub fn write_mesh<W: Write>(w: &mut W, mesh: &ReliefMesh) -> io::Result<()> {
    if mesh.scalars.len() != mesh.positions.len() {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            "scalar length != vertex count",
        ));
    }

    let mut flags = 0u32;
    if mesh.triangles.is_some() {
        flags |= 1 << 0;
    }

    w.write_all(&RMSH_MAGIC)?;
    write_u32(w, RMSH_VERSION)?;
    write_u32(w, flags)?;
    write_u32(w, mesh.positions.len() as u32)?;
    w.write_all(&mesh.radius.to_le_bytes())?;

    for p in &mesh.positions {
        write_f32(w, p[0])?;
        write_f32(w, p[1])?;
        write_f32(w, p[2])?;
    }

    w.write_all(b"SCLR")?;
    write_u16(w, mesh.scalar_name.len() as u16)?;
    w.write_all(mesh.scalar_name.as_bytes())?;

    for &s in &mesh.scalars {
        write_f32(w, s)?;
    }

    if let Some(tris) = mesh.triangles.as_ref() {
        w.write_all(b"TRIS")?;
        write_u32(w, tris.len() as u32)?;

        for t in tris {
            write_u32(w, t[0])?;
            write_u32(w, t[1])?;
            write_u32(w, t[2])?;
        }
    }

    w.flush()
}

pub fn write_file<P: AsRef<Path>>(path: P, mesh: &ReliefMesh) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_mesh(&mut file, mesh)
}

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<ReliefMesh> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes)
}

#[inline]
fn write_u16<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

#[inline]
fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

#[inline]
fn write_f32<W: Write>(w: &mut W, v: f32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}
