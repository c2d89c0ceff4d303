use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GeostatError, Result};
use crate::geometry::metric::{DistanceMetric, MetricKind};
use crate::spatial_database::point_set::PointSet;
use crate::variography::model_variograms::iso_fitter::{fit_variogram, FittedVariogram};
use crate::variography::model_variograms::ModelFamily;

use self::estimator::Estimator;

pub mod estimator;
pub mod lags;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariogramParams {
    pub num_lags: usize,
    /// Largest lag distance considered, unbounded when `None`.
    pub max_lag: Option<f64>,
    pub metric: MetricKind,
    pub estimator: Estimator,
}

impl Default for VariogramParams {
    fn default() -> Self {
        Self {
            num_lags: 10,
            max_lag: None,
            metric: MetricKind::default(),
            estimator: Estimator::default(),
        }
    }
}

/// Wall time spent in each phase of [`EmpiricalVariogram::compute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariogramProfile {
    pub pairwise: Duration,
    pub binning: Duration,
    pub histogram: Duration,
    pub semivariance: Duration,
    pub total: Duration,
}

/// Isotropic empirical variogram of a sample.
#[derive(Debug, Clone)]
pub struct EmpiricalVariogram {
    sample: PointSet,
    params: VariogramParams,
    distances: Vec<f64>,
    differences: Vec<f64>,
    lags: Vec<f64>,
    semivariance: Vec<f64>,
    histogram: Vec<usize>,
    profile: VariogramProfile,
    computed: bool,
}

impl EmpiricalVariogram {
    pub fn new(sample: PointSet, params: VariogramParams) -> Self {
        Self {
            sample,
            params,
            distances: Vec::new(),
            differences: Vec::new(),
            lags: Vec::new(),
            semivariance: Vec::new(),
            histogram: Vec::new(),
            profile: VariogramProfile::default(),
            computed: false,
        }
    }

    /// Compute lags, histogram and semivariance from the sample.
    ///
    /// Unobserved points are ignored. Recomputing from the same sample and parameters
    /// reproduces the same result. Lags without pairs get a NaN semivariance and a warning.
    #[tracing::instrument(skip_all, fields(points = self.sample.len(), lags = self.params.num_lags))]
    pub fn compute(&mut self) -> Result<()> {
        let start = Instant::now();
        let sample = self.sample.observed();
        if sample.len() < 2 {
            return Err(GeostatError::Input(format!(
                "empirical variogram needs at least two observed points, got {}",
                sample.len()
            )));
        }

        let metric = DistanceMetric::new(self.params.metric, sample.dimension);
        let num_lags = self.params.num_lags;

        let (distances, differences) = lags::pairwise_differences(&sample, &metric);
        let pairwise = start.elapsed();

        let t = Instant::now();
        let edges = lags::lag_edges(&distances, num_lags, self.params.max_lag)?;
        let bins = lags::bin_indices(&distances, &differences, &edges);
        let binning = t.elapsed();

        let t = Instant::now();
        let histogram = lags::histogram(&bins, num_lags);
        let histogram_time = t.elapsed();

        let t = Instant::now();
        let semivariance = self.params.estimator.map(&differences, &bins, num_lags);
        let semivariance_time = t.elapsed();

        for (i, g) in semivariance.iter().enumerate() {
            if g.is_nan() {
                warn!(lag = i, "no semivariance computed for lag {i}");
            }
        }

        self.distances = distances;
        self.differences = differences;
        self.lags = edges;
        self.semivariance = semivariance;
        self.histogram = histogram;
        self.profile = VariogramProfile {
            pairwise,
            binning,
            histogram: histogram_time,
            semivariance: semivariance_time,
            total: start.elapsed(),
        };
        self.computed = true;

        debug!(profile = ?self.profile, "empirical variogram computed");
        Ok(())
    }

    /// Fit a model of the given family to the computed semivariance.
    pub fn fit(&self, family: ModelFamily) -> Result<FittedVariogram> {
        if !self.computed {
            return Err(GeostatError::NotFitted("empirical variogram"));
        }

        let mut fitted = fit_variogram(&self.lags, &self.semivariance, family)?;
        fitted.profile.total += self.profile.total;
        Ok(fitted)
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn params(&self) -> &VariogramParams {
        &self.params
    }

    pub fn sample(&self) -> &PointSet {
        &self.sample
    }

    /// Upper lag edges.
    pub fn lags(&self) -> &[f64] {
        &self.lags
    }

    pub fn semivariance(&self) -> &[f64] {
        &self.semivariance
    }

    pub fn histogram(&self) -> &[usize] {
        &self.histogram
    }

    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn differences(&self) -> &[f64] {
        &self.differences
    }

    pub fn profile(&self) -> &VariogramProfile {
        &self.profile
    }

    /// Indices of lags that received no pairs.
    pub fn empty_lags(&self) -> Vec<usize> {
        self.semivariance
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_nan())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::geometry::{Dimension, SamplePoint};

    fn random_sample(n: usize, seed: u64) -> PointSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let points = (0..n)
            .map(|_| {
                let x = rng.gen_range(0.0..100.0);
                let y = rng.gen_range(0.0..100.0);
                SamplePoint::planar(x, y, (x / 20.0).sin() + (y / 30.0).cos())
            })
            .collect();
        PointSet::new(points, Dimension::Planar)
    }

    #[test]
    fn compute_shapes() {
        let sample = random_sample(200, 1);
        let mut vgram = EmpiricalVariogram::new(sample, VariogramParams::default());
        vgram.compute().unwrap();

        assert_eq!(vgram.lags().len(), 10);
        assert_eq!(vgram.semivariance().len(), 10);
        assert_eq!(vgram.histogram().len(), 10);
        assert_eq!(vgram.distances().len(), 200 * 199 / 2);
        assert!(vgram.histogram().iter().sum::<usize>() <= vgram.distances().len());
        assert!(vgram.lags().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn compute_is_idempotent() {
        let params = VariogramParams {
            estimator: Estimator::Cressie,
            max_lag: Some(60.0),
            ..Default::default()
        };
        let mut vgram = EmpiricalVariogram::new(random_sample(150, 2), params);

        vgram.compute().unwrap();
        let first = (
            vgram.lags().to_vec(),
            vgram.semivariance().to_vec(),
            vgram.histogram().to_vec(),
        );

        vgram.compute().unwrap();
        assert_eq!(first.0, vgram.lags());
        assert_eq!(first.1, vgram.semivariance());
        assert_eq!(first.2, vgram.histogram());
    }

    #[test]
    fn sparse_lags_are_flagged() {
        //two clusters far apart leave the middle lags empty
        let points = vec![
            SamplePoint::planar(0.0, 0.0, 1.0),
            SamplePoint::planar(0.1, 0.0, 2.0),
            SamplePoint::planar(10.0, 0.0, 3.0),
        ];
        let mut vgram = EmpiricalVariogram::new(
            PointSet::new(points, Dimension::Planar),
            VariogramParams::default(),
        );
        vgram.compute().unwrap();

        //pairs at 0.1 and 9.9 are binned, the pair at 10.0 sits on the last edge
        assert_eq!(vgram.histogram()[0], 1);
        assert_eq!(vgram.histogram()[9], 1);
        assert_relative_eq!(vgram.semivariance()[0], 0.5, epsilon = 1e-12);
        assert_eq!(vgram.empty_lags(), (1..9).collect::<Vec<_>>());
    }

    #[test]
    fn too_few_points_rejected() {
        let single = PointSet::new(vec![SamplePoint::planar(0.0, 0.0, 1.0)], Dimension::Planar);
        let mut vgram = EmpiricalVariogram::new(single, VariogramParams::default());
        assert!(matches!(vgram.compute(), Err(GeostatError::Input(_))));
    }

    #[test]
    fn fit_requires_compute() {
        let vgram = EmpiricalVariogram::new(random_sample(10, 3), VariogramParams::default());
        assert!(matches!(
            vgram.fit(ModelFamily::Spherical),
            Err(GeostatError::NotFitted(_))
        ));
    }
}
