//! End-to-end reconstruction for the two supported source kinds.
//!
//! Inputs are already-decoded rasters plus a validated [`PlanetConfig`];
//! output is a tessellated [`SphereMesh`] with its "Heights" array
//! populated, ready to serialize. Intermediate results are handed to an
//! injectable [`PipelineObserver`] so diagnostic tooling can watch a run
//! without the core ever depending on a display.

use log::{debug, info};
use thiserror::Error;

use crate::classify::ColorClassifier;
use crate::colormap::{rgb_to_hsv, ColorRamp, ColorRampBuilder, ColormapError, RampOptions};
use crate::config::PlanetConfig;
use crate::nearest::Metric;
use crate::projection::{equirectangular, geo_to_cartesian, inverse_orthographic};
use crate::raster::{hemisphere_pixels, intensity_heights, repair_seam, GrayRaster, RgbRaster};
use crate::resample::{HeightSample, ResampleError, SurfaceResampler};
use crate::sphere::SphereMesh;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("colormap extraction: {0}")]
    Colormap(#[from] ColormapError),

    #[error("resampling: {0}")]
    Resample(#[from] ResampleError),

    #[error("cylindrical raster too small ({0}x{1})")]
    RasterTooSmall(usize, usize),
}

/// Observer hooks invoked with intermediate pipeline results. All methods
/// default to no-ops; the pipeline never requires an implementation to do
/// anything.
pub trait PipelineObserver {
    fn ramp_extracted(&mut self, _ramp: &ColorRamp) {}
    fn samples_ready(&mut self, _samples: &[HeightSample]) {}
    fn mesh_resampled(&mut self, _mesh: &SphereMesh) {}
}

/// The headless default.
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// Knobs for the colorized-hemispheres source kind. Defaults match the
/// NASA Mars relief sheet the pipeline was calibrated against.
#[derive(Debug, Clone)]
pub struct HemisphereOptions {
    pub ramp: RampOptions,
    /// Interpolated points per ramp control-point gap.
    pub densify: usize,
    pub metric: Metric,
    /// Per-channel HSV weights for ramp matching.
    pub weights: [f64; 3],
    /// Projection-center longitudes of the two photographs.
    pub west_center_lon: f64,
    pub east_center_lon: f64,
    /// Seam band half-width in scaled cartesian units.
    pub seam_band: f64,
    /// Elevations below `h_min + seam_low_margin` or above
    /// `h_max - seam_high_margin` inside the band are treated as rim
    /// artifacts.
    pub seam_low_margin: f64,
    pub seam_high_margin: f64,
}

impl Default for HemisphereOptions {
    fn default() -> Self {
        Self {
            ramp: RampOptions::default(),
            densify: 10,
            metric: Metric::L2Norm,
            weights: [4.0, 1.0, 2.0],
            west_center_lon: -90.0,
            east_center_lon: 90.0,
            seam_band: 200.0,
            seam_low_margin: 4000.0,
            seam_high_margin: 6000.0,
        }
    }
}

/// Reconstruct from two orthographic hemisphere photographs and the legend
/// strip of their shared color scale.
pub fn reconstruct_hemispheres(
    cfg: &PlanetConfig,
    legend_strip: &[[u8; 3]],
    west: &RgbRaster,
    east: &RgbRaster,
    opts: &HemisphereOptions,
    observer: &mut dyn PipelineObserver,
) -> Result<SphereMesh, PipelineError> {
    let builder = ColorRampBuilder::new(opts.ramp);
    let ramp = builder
        .extract(legend_strip)?
        .to_hsv()
        .densify(opts.densify);

    info!("calibrated color ramp: {} entries", ramp.len());
    observer.ramp_extracted(&ramp);

    let classifier =
        ColorClassifier::new(&ramp, (cfg.h_min, cfg.h_max), opts.metric, opts.weights);
    let r_scaled = cfg.scaled_radius();

    let mut samples = Vec::new();
    for (hemi, lon0) in [(west, opts.west_center_lon), (east, opts.east_center_lon)] {
        let disc = hemisphere_pixels(hemi);
        debug!("hemisphere lon0={}: {} disc pixels", lon0, disc.colors.len());

        for i in 0..disc.colors.len() {
            let (lon, lat) = inverse_orthographic(disc.xs[i], disc.ys[i], disc.radius, lon0, 0.0);

            if let Some(elevation) = classifier.classify(rgb_to_hsv(disc.colors[i])) {
                samples.push(HeightSample {
                    position: geo_to_cartesian(r_scaled, lon, lat),
                    elevation,
                });
            }
        }
    }

    repair_seam(
        &mut samples,
        opts.seam_band,
        cfg.h_min + opts.seam_low_margin,
        cfg.h_max - opts.seam_high_margin,
    );

    info!("classified {} height samples", samples.len());
    observer.samples_ready(&samples);

    resample_onto_sphere(cfg, &samples, observer)
}

/// Reconstruct from an equirectangular grayscale raster whose intensity
/// linearly encodes elevation. Row 0 is the top (northmost) row, as decoded.
pub fn reconstruct_cylindrical(
    cfg: &PlanetConfig,
    gray: &GrayRaster,
    observer: &mut dyn PipelineObserver,
) -> Result<SphereMesh, PipelineError> {
    let (w, h) = (gray.width(), gray.height());
    if w < 2 || h < 2 {
        return Err(PipelineError::RasterTooSmall(w, h));
    }

    let heights = intensity_heights(gray, cfg.h_min, cfg.h_max);
    let r_scaled = cfg.scaled_radius();
    let (max_x, max_y) = ((w - 1) as f64, (h - 1) as f64);

    let mut samples = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            // Raster rows run north to south; latitude runs the other way.
            let (lon, lat) = equirectangular(x as f64, (h - 1 - y) as f64, max_x, max_y);

            samples.push(HeightSample {
                position: geo_to_cartesian(r_scaled, lon, lat),
                elevation: heights[y * w + x],
            });
        }
    }

    info!("scaled {} intensity samples", samples.len());
    observer.samples_ready(&samples);

    resample_onto_sphere(cfg, &samples, observer)
}

fn resample_onto_sphere(
    cfg: &PlanetConfig,
    samples: &[HeightSample],
    observer: &mut dyn PipelineObserver,
) -> Result<SphereMesh, PipelineError> {
    let mut mesh = SphereMesh::tessellate(cfg.scaled_radius(), cfg.resolution, cfg.resolution);
    info!(
        "tessellated sphere: {} vertices at resolution {}",
        mesh.vertex_count(),
        cfg.resolution
    );

    let resampler = SurfaceResampler::new(samples)?;
    resampler.assign(&mut mesh, cfg.unit_scale)?;

    observer.mesh_resampled(&mesh);
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn test_config() -> PlanetConfig {
        PlanetConfig::parse(
            "hMin = -1000\nhMax = 1000\nR = 1000000\nsfR = 0.001\nsf = 1\n\
             topo = t.png\ntexture = x.png\nmesh = out.rmsh\nres = 12\n",
        )
        .unwrap()
    }

    #[derive(Default)]
    struct CountingObserver {
        ramps: usize,
        sample_batches: usize,
        meshes: usize,
    }

    impl PipelineObserver for CountingObserver {
        fn ramp_extracted(&mut self, _: &ColorRamp) {
            self.ramps += 1;
        }
        fn samples_ready(&mut self, _: &[HeightSample]) {
            self.sample_batches += 1;
        }
        fn mesh_resampled(&mut self, _: &SphereMesh) {
            self.meshes += 1;
        }
    }

    #[test]
    fn cylindrical_end_to_end() {
        let cfg = test_config();

        // 4x3 gradient: darkest in the first row, brightest in the last.
        let gray = Raster::new(4, 3, vec![0, 0, 0, 0, 128, 128, 128, 128, 255, 255, 255, 255])
            .unwrap();

        let mut obs = CountingObserver::default();
        let mesh = reconstruct_cylindrical(&cfg, &gray, &mut obs).unwrap();

        assert_eq!(mesh.heights.len(), mesh.vertex_count());
        assert_eq!(obs.sample_batches, 1);
        assert_eq!(obs.meshes, 1);

        // Heights carry the unit scale: [-1000, 1000] m becomes [-1, 1].
        for &h in &mesh.heights {
            assert!((-1.0..=1.0).contains(&h), "height {} out of range", h);
        }

        // Row 0 is north: vertices near the north pole take the dark row's
        // low elevation, the south pole the bright row's high one.
        assert!((mesh.heights[0] - (-1.0)).abs() < 1e-9);
        assert!((mesh.heights[mesh.heights.len() - 1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hemispheres_end_to_end_uniform_disc() {
        let cfg = test_config();

        // Legend: two 4-pixel segments, dark then bright.
        let legend: Vec<[u8; 3]> = std::iter::repeat([40, 40, 40])
            .take(4)
            .chain(std::iter::repeat([220, 220, 220]).take(4))
            .collect();

        // Both photographs are a uniform dark disc on black matte.
        let mut pixels = vec![[0u8, 0, 0]; 25];
        for y in 1..4 {
            for x in 1..4 {
                pixels[y * 5 + x] = [40, 40, 40];
            }
        }
        let disc = Raster::new(5, 5, pixels).unwrap();

        let opts = HemisphereOptions {
            ramp: RampOptions {
                segment_width: 4,
                ..RampOptions::default()
            },
            densify: 1,
            seam_band: 1e9, // the uniform elevation is its own boundary median
            ..HemisphereOptions::default()
        };

        let mut obs = CountingObserver::default();
        let mesh =
            reconstruct_hemispheres(&cfg, &legend, &disc, &disc, &opts, &mut obs).unwrap();

        assert_eq!(obs.ramps, 1);
        assert_eq!(mesh.heights.len(), mesh.vertex_count());

        // The whole planet is ramp entry 0, i.e. h_min, unit-scaled.
        for &h in &mesh.heights {
            assert!((h - (-1.0)).abs() < 1e-9, "height {}", h);
        }
    }

    #[test]
    fn cylindrical_rejects_degenerate_rasters() {
        let cfg = test_config();
        let gray = Raster::new(1, 1, vec![0u8]).unwrap();

        assert!(matches!(
            reconstruct_cylindrical(&cfg, &gray, &mut NullObserver),
            Err(PipelineError::RasterTooSmall(1, 1))
        ));
    }
}
