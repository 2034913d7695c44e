//! Source raster handling: crops, hemisphere photograph extraction,
//! intensity scaling and seam repair.
//!
//! Rasters here are plain pixel buffers; image decoding lives with the
//! caller so the core pipeline stays headless and dependency-light.

use thiserror::Error;

use crate::resample::HeightSample;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("pixel buffer length {got} != width*height = {expected}")]
    BadDimensions { got: usize, expected: usize },
}

/// Row-major pixel buffer. Row 0 is the top of the image.
#[derive(Debug, Clone)]
pub struct Raster<P> {
    width: usize,
    height: usize,
    pixels: Vec<P>,
}

pub type RgbRaster = Raster<[u8; 3]>;
pub type GrayRaster = Raster<u8>;

impl<P: Copy> Raster<P> {
    pub fn new(width: usize, height: usize, pixels: Vec<P>) -> Result<Self, RasterError> {
        let expected = width * height;
        if pixels.len() != expected {
            return Err(RasterError::BadDimensions {
                got: pixels.len(),
                expected,
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> P {
        self.pixels[y * self.width + x]
    }

    pub fn row(&self, y: usize) -> &[P] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Rectangular sub-region, clamped to the raster bounds.
    pub fn box_region(&self, left: usize, top: usize, w: usize, h: usize) -> Raster<P> {
        let right = (left + w).min(self.width);
        let bottom = (top + h).min(self.height);
        let left = left.min(right);
        let top = top.min(bottom);

        let mut pixels = Vec::with_capacity((right - left) * (bottom - top));
        for y in top..bottom {
            pixels.extend_from_slice(&self.row(y)[left..right]);
        }

        Raster {
            width: right - left,
            height: bottom - top,
            pixels,
        }
    }
}

/// Per-channel 3x3 median filter with replicated borders. Suppresses scan
/// speckle in the downsampled sheet before color classification.
pub fn median_blur3(img: &RgbRaster) -> RgbRaster {
    let (w, h) = (img.width as isize, img.height as isize);
    let mut pixels = Vec::with_capacity(img.pixels.len());

    for y in 0..h {
        for x in 0..w {
            let mut out = [0u8; 3];
            for ch in 0..3 {
                let mut window = [0u8; 9];
                let mut k = 0;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let yy = (y + dy).clamp(0, h - 1) as usize;
                        let xx = (x + dx).clamp(0, w - 1) as usize;
                        window[k] = img.get(xx, yy)[ch];
                        k += 1;
                    }
                }
                window.sort_unstable();
                out[ch] = window[4];
            }
            pixels.push(out);
        }
    }

    Raster {
        width: img.width,
        height: img.height,
        pixels,
    }
}

/// Shrink factor applied to the photograph disc before projection: the
/// printed discs bleed slightly past the ideal circle, so coordinates are
/// pulled in to 95% of the reference radius. Rim pixels then invert to an
/// angular distance of `asin(0.95)` (about 72 degrees) instead of
/// degenerating onto the pole.
const DISC_SHRINK: f64 = 0.95;

/// Foreground pixels of a hemisphere photograph with planar coordinates
/// recentred on the projection disc.
#[derive(Debug, Clone)]
pub struct HemispherePixels {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub colors: Vec<[u8; 3]>,
    /// Reference radius in pixels for the inverse projection: half the
    /// larger crop dimension. Coordinates span at most
    /// [`DISC_SHRINK`] times this.
    pub radius: f64,
}

/// Extract the disc pixels of an orthographic hemisphere photograph.
///
/// Foreground means all channels nonzero (the photographs sit on a black
/// matte). The reference radius is half the larger crop dimension; planar
/// coordinates are recentred (x right, y up) and min/max normalised into
/// [-0.95 radius, 0.95 radius] so slightly off-centre crops still fill the
/// shrunk disc.
pub fn hemisphere_pixels(hemi: &RgbRaster) -> HemispherePixels {
    let radius = (hemi.width.max(hemi.height) as f64 / 2.0).ceil();

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut colors = Vec::new();

    for y in 0..hemi.height {
        for x in 0..hemi.width {
            let c = hemi.get(x, y);
            if c.iter().all(|&ch| ch > 0) {
                xs.push(x as f64 - radius);
                ys.push(radius - y as f64);
                colors.push(c);
            }
        }
    }

    normalise_axis(&mut xs, DISC_SHRINK * radius);
    normalise_axis(&mut ys, DISC_SHRINK * radius);

    HemispherePixels {
        xs,
        ys,
        colors,
        radius,
    }
}

fn normalise_axis(values: &mut [f64], radius: f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    if !span.is_finite() || span == 0.0 {
        for v in values.iter_mut() {
            *v = 0.0;
        }
        return;
    }

    for v in values.iter_mut() {
        *v = 2.0 * radius * (*v - min) / span - radius;
    }
}

/// Linearly rescale grayscale intensities into `[h_min, h_max]`: the
/// darkest pixel maps to `h_min`, the brightest to `h_max`.
pub fn intensity_heights(gray: &GrayRaster, h_min: f64, h_max: f64) -> Vec<f64> {
    let lo = gray.pixels.iter().copied().min().unwrap_or(0);
    let hi = gray.pixels.iter().copied().max().unwrap_or(0);
    let span = (hi - lo) as f64;

    if span == 0.0 {
        return vec![h_min; gray.pixels.len()];
    }

    let scale = (h_max - h_min) / span;
    gray.pixels
        .iter()
        .map(|&p| h_min + (p - lo) as f64 * scale)
        .collect()
}

/// Repair classification artifacts along the hemisphere seam.
///
/// Where the two hemisphere photographs meet (cartesian |y| near zero) the
/// disc rim picks up matte and rim-shadow colors that classify to extreme
/// elevations. Samples within `band` of the minimum |y| whose elevation
/// falls outside `[low_cut, high_cut]` are replaced by the median elevation
/// of that boundary band.
pub fn repair_seam(samples: &mut [HeightSample], band: f64, low_cut: f64, high_cut: f64) {
    let min_abs_y = samples
        .iter()
        .map(|s| s.position[1].abs())
        .fold(f64::INFINITY, f64::min);
    if !min_abs_y.is_finite() {
        return;
    }

    let boundary: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.position[1].abs() <= min_abs_y + band)
        .map(|(i, _)| i)
        .collect();

    let mut elevations: Vec<f64> = boundary.iter().map(|&i| samples[i].elevation).collect();
    let Some(median) = median_f64(&mut elevations) else {
        return;
    };

    for &i in &boundary {
        let e = samples[i].elevation;
        if e < low_cut || e > high_cut {
            samples[i].elevation = median;
        }
    }
}

fn median_f64(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    })
}
