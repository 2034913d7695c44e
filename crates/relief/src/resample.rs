//! Scattered-sample to mesh-vertex resampling.

use log::debug;
use thiserror::Error;

use crate::nearest::{NearestIndex, SpatialIndex};
use crate::sphere::SphereMesh;

/// One scattered surface observation: a cartesian position on the sphere and
/// the elevation recovered for it.
#[derive(Debug, Clone, Copy)]
pub struct HeightSample {
    pub position: [f64; 3],
    pub elevation: f64,
}

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("no height samples to resample from")]
    EmptyCloud,
}

/// Assigns every mesh vertex the elevation of its nearest height sample.
///
/// Samples are indexed in an R-tree once; each vertex query is then
/// logarithmic, keeping the whole join at O(V log S).
pub struct SurfaceResampler {
    index: SpatialIndex,
    elevations: Vec<f64>,
}

impl SurfaceResampler {
    pub fn new(samples: &[HeightSample]) -> Result<Self, ResampleError> {
        if samples.is_empty() {
            return Err(ResampleError::EmptyCloud);
        }

        let positions: Vec<[f64; 3]> = samples.iter().map(|s| s.position).collect();
        let elevations = samples.iter().map(|s| s.elevation).collect();

        Ok(Self {
            index: SpatialIndex::build(&positions),
            elevations,
        })
    }

    /// Populate the mesh's "Heights" array: one entry per vertex, each the
    /// nearest sample's elevation multiplied by `unit_scale` so heights and
    /// vertex positions share the same unit.
    pub fn assign(&self, mesh: &mut SphereMesh, unit_scale: f64) -> Result<(), ResampleError> {
        let mut heights = Vec::with_capacity(mesh.vertex_count());

        for vertex in &mesh.vertices {
            let i = self
                .index
                .nearest(vertex)
                .ok_or(ResampleError::EmptyCloud)?;
            heights.push(self.elevations[i] * unit_scale);
        }

        debug!(
            "resampled {} vertices from {} samples",
            heights.len(),
            self.index.len()
        );

        mesh.heights = heights;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::SphereMesh;

    #[test]
    fn single_sample_covers_every_vertex() {
        let mut mesh = SphereMesh::tessellate(10.0, 8, 8);
        let samples = [HeightSample {
            position: [10.0, 0.0, 0.0],
            elevation: 4321.0,
        }];

        let resampler = SurfaceResampler::new(&samples).unwrap();
        resampler.assign(&mut mesh, 0.001).unwrap();

        assert_eq!(mesh.heights.len(), mesh.vertex_count());
        for &h in &mesh.heights {
            assert!((h - 4.321).abs() < 1e-12);
        }
    }

    #[test]
    fn vertices_pick_their_nearest_sample() {
        let mut mesh = SphereMesh::tessellate(1.0, 8, 8);

        // Asymmetric pole samples so no vertex sits exactly equidistant;
        // the decision boundary lands at z = 0.1, between rings.
        let samples = [
            HeightSample {
                position: [0.0, 0.0, 1.1],
                elevation: 100.0,
            },
            HeightSample {
                position: [0.0, 0.0, -0.9],
                elevation: -100.0,
            },
        ];

        let resampler = SurfaceResampler::new(&samples).unwrap();
        resampler.assign(&mut mesh, 1.0).unwrap();

        for (v, &h) in mesh.vertices.iter().zip(&mesh.heights) {
            if v[2] > 0.15 {
                assert_eq!(h, 100.0, "vertex {:?}", v);
            } else if v[2] < -0.05 {
                assert_eq!(h, -100.0, "vertex {:?}", v);
            }
        }
    }

    #[test]
    fn empty_cloud_is_an_error() {
        assert!(matches!(
            SurfaceResampler::new(&[]),
            Err(ResampleError::EmptyCloud)
        ));
    }
}
