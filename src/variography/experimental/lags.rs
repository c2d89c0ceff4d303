use itertools::izip;
use rayon::prelude::*;

use crate::error::{GeostatError, Result};
use crate::geometry::metric::DistanceMetric;
use crate::spatial_database::point_set::PointSet;

/// Distance and signed attribute difference for every unordered pair `i < j`.
///
/// Pairs are emitted in row-major order of `(i, j)` regardless of how the work is split.
pub fn pairwise_differences(points: &PointSet, metric: &DistanceMetric) -> (Vec<f64>, Vec<f64>) {
    let n = points.len();
    let points = points.points.as_slice();

    (0..n)
        .into_par_iter()
        .flat_map_iter(move |i| {
            let p = points[i];
            points[i + 1..]
                .iter()
                .map(move |q| (metric.between(&p, q), p.value - q.value))
        })
        .unzip()
}

/// Upper edges of `num_lags` equal width lags covering `[0, max]`.
///
/// `max` is the largest finite distance, capped by `max_lag` when given.
pub fn lag_edges(distances: &[f64], num_lags: usize, max_lag: Option<f64>) -> Result<Vec<f64>> {
    if num_lags == 0 {
        return Err(GeostatError::Input(
            "number of lags must be at least one".to_string(),
        ));
    }

    let observed = distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    let max = match max_lag {
        Some(cutoff) => observed.min(cutoff),
        None => observed,
    };

    if !(max.is_finite() && max > 0.0) {
        return Err(GeostatError::Input(format!(
            "no finite positive maximum lag distance (got {max})"
        )));
    }

    let width = max / num_lags as f64;
    Ok((1..=num_lags).map(|i| i as f64 * width).collect())
}

/// Lag index for each pair, `None` for pairs outside every lag.
///
/// A pair falls in lag `j` when `edges[j - 1] <= d < edges[j]` (with `edges[-1] = 0`).
/// Pairs with a non-finite distance or difference are never assigned.
pub fn bin_indices(distances: &[f64], differences: &[f64], edges: &[f64]) -> Vec<Option<usize>> {
    izip!(distances, differences)
        .map(|(d, diff)| {
            if !d.is_finite() || diff.is_nan() {
                return None;
            }
            let j = edges.partition_point(|e| *e <= *d);
            (j < edges.len()).then_some(j)
        })
        .collect()
}

/// Pair count per lag.
pub fn histogram(bins: &[Option<usize>], num_lags: usize) -> Vec<usize> {
    let mut counts = vec![0; num_lags];
    for j in bins.iter().flatten() {
        counts[*j] += 1;
    }
    counts
}
