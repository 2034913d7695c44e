//! Color ramp extraction from a legend strip.
//!
//! Relief maps embed their calibration as a horizontal strip of legend
//! colors, interrupted by near-white divider ticks between scale segments.
//! The builder partitions the strip, excises the divider artifacts, reduces
//! each segment to its per-channel median, and densifies the resulting
//! control points by interpolation so that nearest-color classification has
//! a fine-grained scale to match against.

use thiserror::Error;

/// Color space a ramp's entries are expressed in. The hue channel of the
/// 8-bit HSV encoding is circular with period 180.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    Hsv,
}

impl ColorSpace {
    fn hue_period(self) -> Option<f64> {
        match self {
            ColorSpace::Hsv => Some(180.0),
            ColorSpace::Rgb => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColormapError {
    /// Divider excision left nothing to take a median of; the segment is
    /// shorter than the excision window.
    #[error("legend segment {index} empty after divider excision ({len} px < window)")]
    EmptySegment { index: usize, len: usize },

    #[error("legend strip is empty")]
    EmptyStrip,
}

/// Tuning knobs for legend extraction. The defaults match the NASA Mars
/// relief legend the pipeline was first calibrated against, but they are
/// ordinary parameters, not baked-in literals.
#[derive(Debug, Clone, Copy)]
pub struct RampOptions {
    /// Width of one legend segment in pixels.
    pub segment_width: usize,
    /// A pixel is a divider tick when all channels exceed this value.
    pub divider_threshold: u8,
    /// Width of the excision window centred on the brightest pixel.
    pub divider_window: usize,
}

impl Default for RampOptions {
    fn default() -> Self {
        Self {
            segment_width: 9,
            divider_threshold: 245,
            divider_window: 5,
        }
    }
}

/// An ordered, calibrated sequence of unique colors; index 0 is minimum
/// elevation, the last index maximum elevation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    pub entries: Vec<[u8; 3]>,
    pub space: ColorSpace,
}

impl ColorRamp {
    pub fn new(entries: Vec<[u8; 3]>, space: ColorSpace) -> Self {
        Self { entries, space }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reinterpret an RGB ramp in HSV space, entry for entry.
    pub fn to_hsv(&self) -> ColorRamp {
        match self.space {
            ColorSpace::Hsv => self.clone(),
            ColorSpace::Rgb => ColorRamp {
                entries: self.entries.iter().map(|&c| rgb_to_hsv(c)).collect(),
                space: ColorSpace::Hsv,
            },
        }
    }

    /// Densify the ramp: between each pair of consecutive control points,
    /// insert `points_per_sample` linearly interpolated colors, yielding
    /// `N + (N-1) * points_per_sample` samples before deduplication.
    ///
    /// The hue channel interpolates along the shorter arc: when the raw
    /// delta exceeds half the hue period it is replaced by the wrap-around
    /// delta of opposite sign. Results are rounded to integer channel
    /// values (hue wrapped, other channels clamped) and run through
    /// [`stable_unique`] to drop samples collapsed by rounding.
    pub fn densify(&self, points_per_sample: usize) -> ColorRamp {
        let k = points_per_sample;
        let n = self.entries.len();
        if n < 2 || k == 0 {
            return ColorRamp {
                entries: stable_unique(&self.entries),
                space: self.space,
            };
        }

        let hue_period = self.space.hue_period();
        let mut out = Vec::with_capacity(n + (n - 1) * k);

        for pair in self.entries.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            out.push(a);

            for i in 1..=k {
                let t = i as f64 / (k + 1) as f64;
                let mut color = [0u8; 3];

                for ch in 0..3 {
                    let av = a[ch] as f64;
                    let mut d = b[ch] as f64 - av;

                    if ch == 0 {
                        if let Some(period) = hue_period {
                            if d.abs() > period / 2.0 {
                                d -= period * d.signum();
                            }
                        }
                    }

                    let v = av + t * d;
                    color[ch] = match (ch, hue_period) {
                        (0, Some(period)) => (v.rem_euclid(period).round() % period) as u8,
                        _ => v.round().clamp(0.0, 255.0) as u8,
                    };
                }

                out.push(color);
            }
        }

        if let Some(&last) = self.entries.last() {
            out.push(last);
        }

        ColorRamp {
            entries: stable_unique(&out),
            space: self.space,
        }
    }
}

/// Order-preserving deduplication: keeps the first occurrence of each color.
/// Idempotent.
pub fn stable_unique(colors: &[[u8; 3]]) -> Vec<[u8; 3]> {
    let mut seen = std::collections::HashSet::with_capacity(colors.len());
    colors.iter().filter(|c| seen.insert(**c)).copied().collect()
}

/// Extracts the calibrated control-point ramp from a legend strip.
#[derive(Debug, Clone, Default)]
pub struct ColorRampBuilder {
    opts: RampOptions,
}

impl ColorRampBuilder {
    pub fn new(opts: RampOptions) -> Self {
        Self { opts }
    }

    /// Reduce a legend strip (one row of pixels across the legend, in RGB)
    /// to its unique per-segment median colors.
    pub fn extract(&self, strip: &[[u8; 3]]) -> Result<ColorRamp, ColormapError> {
        if strip.is_empty() {
            return Err(ColormapError::EmptyStrip);
        }

        let mut raw = Vec::with_capacity(strip.len() / self.opts.segment_width.max(1) + 1);

        for (index, segment) in strip.chunks(self.opts.segment_width.max(1)).enumerate() {
            let threshold = self.opts.divider_threshold;
            let has_divider = segment.iter().any(|c| c.iter().all(|&ch| ch > threshold));

            let representative = if has_divider {
                let kept = excise_divider(segment, self.opts.divider_window);
                if kept.is_empty() {
                    return Err(ColormapError::EmptySegment {
                        index,
                        len: segment.len(),
                    });
                }
                channel_median(&kept)
            } else {
                channel_median(segment)
            };

            raw.push(representative);
        }

        Ok(ColorRamp {
            entries: stable_unique(&raw),
            space: ColorSpace::Rgb,
        })
    }
}

/// Remove a window of `window` pixels centred on the brightest pixel (first
/// maximal channel sum), returning the remainder in order.
fn excise_divider(segment: &[[u8; 3]], window: usize) -> Vec<[u8; 3]> {
    let mut brightest = 0usize;
    let mut best: u32 = 0;
    for (i, c) in segment.iter().enumerate() {
        let sum = c.iter().map(|&ch| ch as u32).sum();
        if sum > best {
            best = sum;
            brightest = i;
        }
    }

    let half = window / 2;
    let start = brightest.saturating_sub(half);
    let end = (brightest + half + 1).min(segment.len());

    let mut kept = Vec::with_capacity(segment.len().saturating_sub(end - start));
    kept.extend_from_slice(&segment[..start]);
    kept.extend_from_slice(&segment[end..]);
    kept
}

/// Per-channel median of a non-empty pixel run. Even-length runs take the
/// rounded mean of the two middle values.
fn channel_median(pixels: &[[u8; 3]]) -> [u8; 3] {
    let mut out = [0u8; 3];
    for ch in 0..3 {
        let mut values: Vec<u8> = pixels.iter().map(|c| c[ch]).collect();
        values.sort_unstable();

        let mid = values.len() / 2;
        out[ch] = if values.len() % 2 == 1 {
            values[mid]
        } else {
            (((values[mid - 1] as u16 + values[mid] as u16) as f64) / 2.0).round() as u8
        };
    }
    out
}

/// 8-bit RGB to 8-bit HSV with hue halved into [0, 180), the convention the
/// legend calibration operates in.
pub fn rgb_to_hsv(c: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (c[0] as f64, c[1] as f64, c[2] as f64);

    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v == 0.0 { 0.0 } else { delta * 255.0 / v };

    let h360 = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h360 = if h360 < 0.0 { h360 + 360.0 } else { h360 };

    [
        ((h360 / 2.0).round() % 180.0) as u8,
        s.round() as u8,
        v as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];
    const WHITE: [u8; 3] = [255, 255, 255];

    #[test]
    fn stable_unique_preserves_first_seen_order() {
        let input = vec![[3, 0, 0], [1, 0, 0], [3, 0, 0], [2, 0, 0], [1, 0, 0]];
        let once = stable_unique(&input);
        assert_eq!(once, vec![[3, 0, 0], [1, 0, 0], [2, 0, 0]]);

        // Idempotence.
        assert_eq!(stable_unique(&once), once);
    }

    #[test]
    fn densify_black_white_yields_mid_gray() {
        let ramp = ColorRamp::new(vec![BLACK, WHITE], ColorSpace::Rgb);
        let dense = ramp.densify(1);
        assert_eq!(dense.entries, vec![BLACK, [128, 128, 128], WHITE]);
    }

    #[test]
    fn densify_sample_count() {
        let ramp = ColorRamp::new(
            vec![[0, 0, 0], [60, 60, 60], [120, 120, 120]],
            ColorSpace::Rgb,
        );
        let dense = ramp.densify(5);
        // N + (N-1)*k with no rounding collapses: 3 + 2*5.
        assert_eq!(dense.len(), 13);
    }

    #[test]
    fn densify_hue_takes_shorter_arc() {
        // 175 -> 5 wraps across 0; the long way around would pass 90.
        let ramp = ColorRamp::new(vec![[175, 200, 200], [5, 200, 200]], ColorSpace::Hsv);
        let dense = ramp.densify(4);

        let hues: Vec<f64> = dense.entries.iter().map(|c| c[0] as f64).collect();
        for pair in hues.windows(2) {
            let d = (pair[1] - pair[0]).abs();
            let arc = d.min(180.0 - d);
            assert!(arc <= 90.0, "hue step {} -> {} exceeds half period", pair[0], pair[1]);
            assert!(arc <= 3.0, "hue step {} -> {} is not a short hop", pair[0], pair[1]);
        }
    }

    #[test]
    fn extract_takes_segment_medians() {
        // Two uniform 4-pixel segments.
        let strip: Vec<[u8; 3]> = std::iter::repeat([10, 20, 30])
            .take(4)
            .chain(std::iter::repeat([100, 110, 120]).take(4))
            .collect();

        let builder = ColorRampBuilder::new(RampOptions {
            segment_width: 4,
            divider_threshold: 245,
            divider_window: 5,
        });

        let ramp = builder.extract(&strip).unwrap();
        assert_eq!(ramp.entries, vec![[10, 20, 30], [100, 110, 120]]);
        assert_eq!(ramp.space, ColorSpace::Rgb);
    }

    #[test]
    fn extract_excises_divider_ticks() {
        // A 9-pixel segment with a near-white tick in the middle; the median
        // must come from the surrounding color only.
        let mut strip = vec![[50, 60, 70]; 9];
        strip[4] = [250, 250, 250];

        let builder = ColorRampBuilder::new(RampOptions::default());
        let ramp = builder.extract(&strip).unwrap();
        assert_eq!(ramp.entries, vec![[50, 60, 70]]);
    }

    #[test]
    fn extract_fails_when_excision_empties_segment() {
        // A 3-pixel segment is entirely covered by the 5-pixel window.
        let strip = vec![[250, 250, 250]; 3];

        let builder = ColorRampBuilder::new(RampOptions {
            segment_width: 3,
            divider_threshold: 245,
            divider_window: 5,
        });

        assert_eq!(
            builder.extract(&strip),
            Err(ColormapError::EmptySegment { index: 0, len: 3 })
        );
    }

    #[test]
    fn extract_rejects_empty_strip() {
        let builder = ColorRampBuilder::default();
        assert_eq!(builder.extract(&[]), Err(ColormapError::EmptyStrip));
    }

    #[test]
    fn rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
    }
}
