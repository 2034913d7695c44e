//! Canonical sphere tessellation.
//!
//! A UV sphere: two poles plus latitude rings, triangulated with fans at the
//! poles and split quads between rings. Vertex count and connectivity are a
//! deterministic function of the resolution parameters alone, never of any
//! source image, so meshes from different rasters stay comparable.

use std::f64::consts::PI;

/// A fixed-topology sphere mesh with one per-vertex "Heights" scalar array.
///
/// `heights` starts empty and is written exactly once by the resampler;
/// after that the mesh is serialized and never mutated again.
#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub radius: f64,
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
    pub heights: Vec<f64>,
}

impl SphereMesh {
    /// Tessellate a sphere of `radius` with `theta_res` longitudinal and
    /// `phi_res` latitudinal divisions (both floored to sane minimums).
    ///
    /// Vertex count is `2 + (phi_res - 1) * theta_res`.
    pub fn tessellate(radius: f64, theta_res: u32, phi_res: u32) -> Self {
        let theta_res = theta_res.max(3) as usize;
        let phi_res = phi_res.max(2) as usize;

        let ring_count = phi_res - 1;
        let mut vertices = Vec::with_capacity(2 + ring_count * theta_res);

        // North pole, rings from north to south, south pole.
        vertices.push([0.0, 0.0, radius]);

        for i in 1..phi_res {
            let phi = PI * i as f64 / phi_res as f64;
            let (sin_phi, cos_phi) = phi.sin_cos();

            for j in 0..theta_res {
                let theta = 2.0 * PI * j as f64 / theta_res as f64;
                let (sin_theta, cos_theta) = theta.sin_cos();

                vertices.push([
                    radius * sin_phi * cos_theta,
                    radius * sin_phi * sin_theta,
                    radius * cos_phi,
                ]);
            }
        }

        vertices.push([0.0, 0.0, -radius]);

        let south = (vertices.len() - 1) as u32;
        let ring = |r: usize, j: usize| (1 + r * theta_res + (j % theta_res)) as u32;

        let mut triangles =
            Vec::with_capacity(2 * theta_res + 2 * theta_res * ring_count.saturating_sub(1));

        // North cap fan.
        for j in 0..theta_res {
            triangles.push([0, ring(0, j), ring(0, j + 1)]);
        }

        // Quads between consecutive rings, split into two triangles.
        for r in 0..ring_count.saturating_sub(1) {
            for j in 0..theta_res {
                let (a, b) = (ring(r, j), ring(r, j + 1));
                let (c, d) = (ring(r + 1, j), ring(r + 1, j + 1));
                triangles.push([a, c, b]);
                triangles.push([b, c, d]);
            }
        }

        // South cap fan.
        for j in 0..theta_res {
            triangles.push([south, ring(ring_count - 1, j + 1), ring(ring_count - 1, j)]);
        }

        Self {
            radius,
            vertices,
            triangles,
            heights: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_matches_resolution() {
        let mesh = SphereMesh::tessellate(1.0, 8, 6);
        assert_eq!(mesh.vertex_count(), 2 + 5 * 8);

        let mesh = SphereMesh::tessellate(1.0, 16, 16);
        assert_eq!(mesh.vertex_count(), 2 + 15 * 16);
    }

    #[test]
    fn all_vertices_on_the_sphere() {
        let radius = 3389.5;
        let mesh = SphereMesh::tessellate(radius, 24, 24);

        for v in &mesh.vertices {
            let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!((r - radius).abs() < 1e-9 * radius);
        }
    }

    #[test]
    fn tessellation_is_deterministic() {
        let a = SphereMesh::tessellate(10.0, 12, 9);
        let b = SphereMesh::tessellate(10.0, 12, 9);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.triangles, b.triangles);
    }

    #[test]
    fn triangle_indices_in_range() {
        let mesh = SphereMesh::tessellate(1.0, 5, 4);
        let count = mesh.vertex_count() as u32;
        for t in &mesh.triangles {
            assert!(t.iter().all(|&i| i < count));
        }
    }

    #[test]
    fn minimal_resolution_is_clamped() {
        // theta 1 / phi 1 floor to 3 / 2: a 5-vertex bipyramid.
        let mesh = SphereMesh::tessellate(1.0, 1, 1);
        assert_eq!(mesh.vertex_count(), 2 + 1 * 3);
        assert_eq!(mesh.triangles.len(), 6);
    }
}
