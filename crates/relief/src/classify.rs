//! Nearest-ramp-entry color classification.
//!
//! A calibrated [`ColorRamp`](crate::colormap::ColorRamp) spans a declared
//! height range; classifying a pixel color means finding its nearest ramp
//! entry under a selectable metric and reading the elevation off the entry's
//! position along the ramp.

use crate::colormap::ColorRamp;
use crate::nearest::{Metric, NearestIndex, ScanIndex};

/// Maps pixel colors to elevations via their nearest ramp entry.
///
/// Identical (color, ramp, metric, weights) inputs always select the
/// identical index; ties resolve to the lowest index.
pub struct ColorClassifier {
    index: ScanIndex<3>,
    h_min: f64,
    h_max: f64,
}

impl ColorClassifier {
    /// Build a classifier over `ramp` with height range `(h_min, h_max)`.
    /// `weights` scale each channel's contribution to the distance, e.g.
    /// `[4.0, 1.0, 2.0]` to emphasize hue over saturation in HSV space.
    pub fn new(ramp: &ColorRamp, height_range: (f64, f64), metric: Metric, weights: [f64; 3]) -> Self {
        let points = ramp
            .entries
            .iter()
            .map(|c| [c[0] as f64, c[1] as f64, c[2] as f64])
            .collect();

        Self {
            index: ScanIndex::new(points, metric, weights),
            h_min: height_range.0,
            h_max: height_range.1,
        }
    }

    /// Index of the nearest ramp entry, or `None` for an empty ramp.
    pub fn nearest_index(&self, color: [u8; 3]) -> Option<usize> {
        let q = [color[0] as f64, color[1] as f64, color[2] as f64];
        self.index.nearest(&q)
    }

    /// Elevation for a ramp index: `h_min + idx * (h_max - h_min) / (len - 1)`.
    /// A one-entry ramp pins everything to `h_min`.
    pub fn elevation_for(&self, index: usize) -> f64 {
        if self.index.len() < 2 {
            return self.h_min;
        }
        self.h_min + index as f64 * (self.h_max - self.h_min) / (self.index.len() - 1) as f64
    }

    /// Classify one pixel color to an elevation.
    pub fn classify(&self, color: [u8; 3]) -> Option<f64> {
        self.nearest_index(color).map(|i| self.elevation_for(i))
    }
}
