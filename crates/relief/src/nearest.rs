//! Nearest-neighbor search behind one dimensionality-agnostic seam.
//!
//! Two very different joins in the pipeline reduce to "find the closest
//! point": matching pixel colors against a color ramp (small set, exotic
//! metrics, per-channel weights) and assigning sphere vertices the elevation
//! of the closest height sample (tens of thousands of points, Euclidean).
//! [`ScanIndex`] serves the former, [`SpatialIndex`] the latter; both answer
//! through [`NearestIndex`].

use rstar::primitives::GeomWithData;
use rstar::RTree;
use thiserror::Error;

/// Index of the nearest stored point to a query, or `None` when empty.
///
/// Ties between exactly-equidistant candidates resolve to the first point
/// encountered in insertion order for [`ScanIndex`]; for [`SpatialIndex`]
/// the winner among exact ties is implementation-defined by the R-tree.
pub trait NearestIndex<const N: usize> {
    fn nearest(&self, query: &[f64; N]) -> Option<usize>;
}

/// Unrecognized distance metric selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid metric selector {0:?} (expected l1|l2|mse|mae)")]
pub struct InvalidMetric(pub String);

/// Distance metric for weighted nearest-color matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    L1Norm,
    L2Norm,
    MeanSquared,
    MeanAbsolute,
}

impl std::str::FromStr for Metric {
    type Err = InvalidMetric;

    fn from_str(s: &str) -> Result<Self, InvalidMetric> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l1" | "l1norm" => Ok(Metric::L1Norm),
            "l2" | "l2norm" => Ok(Metric::L2Norm),
            "mse" => Ok(Metric::MeanSquared),
            "mae" => Ok(Metric::MeanAbsolute),
            other => Err(InvalidMetric(other.to_string())),
        }
    }
}

impl Metric {
    /// Weighted distance between two N-dimensional points.
    pub fn distance<const N: usize>(self, a: &[f64; N], b: &[f64; N], weights: &[f64; N]) -> f64 {
        let mut acc = 0.0;
        for i in 0..N {
            let d = (a[i] - b[i]) * weights[i];
            acc += match self {
                Metric::L1Norm | Metric::MeanAbsolute => d.abs(),
                Metric::L2Norm | Metric::MeanSquared => d * d,
            };
        }

        match self {
            Metric::L1Norm => acc,
            Metric::L2Norm => acc.sqrt(),
            Metric::MeanSquared | Metric::MeanAbsolute => acc / N as f64,
        }
    }
}

/// Brute-force index over a small point set with a selectable metric and
/// per-channel weights. O(n) per query; intended for ramp-sized inputs.
#[derive(Debug, Clone)]
pub struct ScanIndex<const N: usize> {
    points: Vec<[f64; N]>,
    metric: Metric,
    weights: [f64; N],
}

impl<const N: usize> ScanIndex<N> {
    pub fn new(points: Vec<[f64; N]>, metric: Metric, weights: [f64; N]) -> Self {
        Self {
            points,
            metric,
            weights,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<const N: usize> NearestIndex<N> for ScanIndex<N> {
    fn nearest(&self, query: &[f64; N]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for (i, p) in self.points.iter().enumerate() {
            let d = self.metric.distance(p, query, &self.weights);

            // Strict less-than keeps the first minimal index on ties.
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }

        best.map(|(i, _)| i)
    }
}

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// R-tree over 3D points for sub-linear Euclidean nearest-neighbor queries.
///
/// The resampler join is O(V log S) through this index; a brute-force scan
/// would be O(V * S) and does not hold up at tens of thousands of points.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn build(points: &[[f64; 3]]) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new(*p, i))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl NearestIndex<3> for SpatialIndex {
    fn nearest(&self, query: &[f64; 3]) -> Option<usize> {
        self.tree.nearest_neighbor(query).map(|p| p.data)
    }
}
