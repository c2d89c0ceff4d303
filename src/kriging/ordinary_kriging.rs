use std::time::Instant;

use nalgebra::{DMatrix, Point3};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{GeostatError, Result};
use crate::geometry::metric::DistanceMetric;
use crate::spatial_database::point_set::PointSet;
use crate::systems::ok_system::OrdinaryKrigingSystem;
use crate::variography::model_variograms::IsoVariogramModel;

use super::{Estimation, EstimationError, KrigingParameters, KrigingProfile, StepProfile};

//diagonal used when the model has no nugget, keeps the system solvable
const ZERO_NUGGET_DIAGONAL: f64 = 1e-10;
//allowed drift of the weight sum from one, relative to the weight magnitudes
const WEIGHT_SUM_TOL: f64 = 1e-6;

/// Ordinary kriging estimator over a fixed conditioning set.
#[derive(Clone, Debug)]
pub struct OrdinaryKriging<V> {
    variogram_model: V,
    params: KrigingParameters,
    conditioning: PointSet,
    cond_mat: DMatrix<f64>,
    metric: DistanceMetric,
    fitted: bool,
    profile: KrigingProfile,
}

impl<V> OrdinaryKriging<V>
where
    V: IsoVariogramModel + Sync,
{
    /// Create a new ordinary kriging estimator
    /// # Arguments
    /// * `variogram_model` - The variogram model to use
    /// * `params` - Neighborhood and metric parameters
    pub fn new(variogram_model: V, params: KrigingParameters) -> Self {
        Self {
            variogram_model,
            params,
            conditioning: PointSet::default(),
            cond_mat: DMatrix::zeros(0, 0),
            metric: DistanceMetric::default(),
            fitted: false,
            profile: KrigingProfile::default(),
        }
    }

    /// Store the observed points of `conditioning` and precompute their variogram matrix.
    pub fn fit(&mut self, conditioning: &PointSet) {
        let start = Instant::now();
        let conditioning = conditioning.observed();
        let metric = DistanceMetric::new(self.params.metric, conditioning.dimension);

        let nugget = self.variogram_model.nugget();
        let diagonal = if nugget == 0.0 {
            ZERO_NUGGET_DIAGONAL
        } else {
            nugget
        };

        let points = &conditioning.points;
        let n = points.len();
        let model = &self.variogram_model;
        self.cond_mat = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                diagonal
            } else {
                model.variogram(metric.between(&points[i], &points[j]))
            }
        });

        self.conditioning = conditioning;
        self.metric = metric;
        self.fitted = true;
        self.profile = KrigingProfile {
            fit: start.elapsed(),
            ..Default::default()
        };
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn conditioning(&self) -> &PointSet {
        &self.conditioning
    }

    pub fn variogram_model(&self) -> &V {
        &self.variogram_model
    }

    /// Timings of the last `fit` and `interpolate` calls.
    pub fn profile(&self) -> &KrigingProfile {
        &self.profile
    }

    /// Estimate a single location.
    pub fn estimate(&self, target: &Point3<f64>) -> Result<Estimation> {
        if !self.fitted {
            return Err(GeostatError::NotFitted("ordinary kriging"));
        }
        let mut system = self.system();
        Ok(self.krige(target, &mut system).0)
    }

    /// Estimate every target in parallel.
    ///
    /// Results are aligned with `targets`. Targets that cannot be estimated are returned as
    /// NaN estimations tagged with the reason and never abort the batch.
    #[tracing::instrument(skip_all, fields(targets = targets.len(), conditioning = self.conditioning.len()))]
    pub fn interpolate(&mut self, targets: &PointSet) -> Result<Vec<Estimation>> {
        if !self.fitted {
            return Err(GeostatError::NotFitted("ordinary kriging"));
        }

        let results = targets
            .points
            .par_iter()
            .map_with(self.system(), |local_system, target| {
                self.krige(&target.coords, local_system)
            })
            .collect::<Vec<_>>();

        let failed = results.iter().filter(|(e, _)| !e.is_ok()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "kriging failed for {failed} targets");
        }

        self.profile =
            KrigingProfile::accumulate(self.profile.fit, results.iter().filter_map(|(_, p)| p.as_ref()), failed);
        debug!(profile = ?self.profile, "kriging complete");

        Ok(results.into_iter().map(|(e, _)| e).collect())
    }

    fn system(&self) -> OrdinaryKrigingSystem {
        OrdinaryKrigingSystem::new(self.params.max_points.min(self.conditioning.len()))
    }

    /// Krige one target, returning its step timings when it succeeds.
    fn krige(
        &self,
        target: &Point3<f64>,
        system: &mut OrdinaryKrigingSystem,
    ) -> (Estimation, Option<StepProfile>) {
        let start = Instant::now();

        let neighbors = self
            .conditioning
            .nearest(target, self.params.max_points, &self.metric);

        let Some(&(_, farthest)) = neighbors.last() else {
            return (Estimation::failed(EstimationError::NoConditionPoints), None);
        };
        if self.params.in_range && farthest > self.variogram_model.range() {
            return (Estimation::failed(EstimationError::NoConditionPoints), None);
        }

        let (inds, target_cov): (Vec<usize>, Vec<f64>) = neighbors
            .iter()
            .map(|(i, d)| (*i, self.variogram_model.variogram(*d)))
            .unzip();
        let init = start.elapsed();

        let t = Instant::now();
        system.build_system(&self.cond_mat, &inds, &target_cov);
        let matrix = t.elapsed();

        let t = Instant::now();
        let Some(solved) = system.solve() else {
            return (Estimation::failed(EstimationError::SingularMatrix), None);
        };
        let scale = solved.weights.iter().map(|w| w.abs()).sum::<f64>().max(1.0);
        if (solved.weight_sum() - 1.0).abs() > WEIGHT_SUM_TOL * scale {
            return (Estimation::failed(EstimationError::SingularMatrix), None);
        }
        let field = solved.estimate(inds.iter().map(|i| self.conditioning.points[*i].value));
        let variance = solved.variance();
        let solve = t.elapsed();

        if !field.is_finite() || !variance.is_finite() {
            return (Estimation::failed(EstimationError::SingularMatrix), None);
        }

        (
            Estimation::new(field, variance),
            Some(StepProfile {
                init,
                matrix,
                solve,
                total: start.elapsed(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::geometry::{Dimension, SamplePoint};
    use crate::variography::model_variograms::iso_exponential::IsoExponential;
    use crate::variography::model_variograms::iso_spherical::IsoSpherical;

    fn collinear(dimension: Dimension) -> PointSet {
        let points = (0..3)
            .map(|i| {
                let c = i as f64;
                match dimension {
                    Dimension::Planar => SamplePoint::planar(c, c, c + 1.0),
                    Dimension::Spatial => SamplePoint::spatial(c, c, c, c + 1.0),
                }
            })
            .collect();
        PointSet::new(points, dimension)
    }

    #[test]
    fn collinear_planar() {
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(100.0, 1.0, 0.0), KrigingParameters::default());
        ok.fit(&collinear(Dimension::Planar));

        let targets = PointSet::new(
            vec![SamplePoint::unobserved(Point3::new(0.5, 0.5, 0.0))],
            Dimension::Planar,
        );
        let est = ok.interpolate(&targets).unwrap()[0];

        assert!(est.is_ok());
        assert_relative_eq!(est.field, 1.50, epsilon = 1e-3);
        assert_relative_eq!(est.variance, 0.010607, epsilon = 1e-5);
        assert_eq!(ok.profile().successful, 1);
    }

    #[test]
    fn collinear_spatial() {
        let mut ok = OrdinaryKriging::new(IsoExponential::new(100.0, 1.0, 0.0), KrigingParameters::default());
        ok.fit(&collinear(Dimension::Spatial));

        let est = ok.estimate(&Point3::new(0.5, 0.5, 0.5)).unwrap();
        assert_relative_eq!(est.field, 1.50017, epsilon = 1e-4);
        assert_relative_eq!(est.variance, 0.025975, epsilon = 1e-5);
    }

    #[test]
    fn exact_at_data_points() {
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(100.0, 1.0, 0.0), KrigingParameters::default());
        let data = collinear(Dimension::Planar);
        ok.fit(&data);

        for p in data.iter() {
            let est = ok.estimate(&p.coords).unwrap();
            assert_relative_eq!(est.field, p.value, epsilon = 1e-6);
        }
    }

    #[test]
    fn no_conditioning_points() {
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(10.0, 1.0, 0.0), KrigingParameters::default());
        ok.fit(&PointSet::default());

        let targets = PointSet::new(
            (0..5)
                .map(|i| SamplePoint::unobserved(Point3::new(i as f64, 0.0, 0.0)))
                .collect(),
            Dimension::Planar,
        );
        let estimates = ok.interpolate(&targets).unwrap();

        assert_eq!(estimates.len(), 5);
        assert!(estimates
            .iter()
            .all(|e| e.error == EstimationError::NoConditionPoints && e.field.is_nan()));
        assert_eq!(ok.profile().failed, 5);
        assert_eq!(ok.profile().successful, 0);
    }

    #[test]
    fn unobserved_conditioning_points_ignored() {
        let mut data = collinear(Dimension::Planar);
        data.points.push(SamplePoint::planar(0.5, 0.5, f64::NAN));

        let mut ok = OrdinaryKriging::new(IsoSpherical::new(100.0, 1.0, 0.0), KrigingParameters::default());
        ok.fit(&data);
        assert_eq!(ok.conditioning().len(), 3);

        let est = ok.estimate(&Point3::new(0.5, 0.5, 0.0)).unwrap();
        assert_relative_eq!(est.field, 1.50, epsilon = 1e-3);
    }

    #[test]
    fn range_gate_rejects_distant_neighbors() {
        let params = KrigingParameters {
            in_range: true,
            ..Default::default()
        };
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(1.0, 1.0, 0.0), params);
        ok.fit(&collinear(Dimension::Planar));

        let est = ok.estimate(&Point3::new(0.5, 0.5, 0.0)).unwrap();
        assert_eq!(est.error, EstimationError::NoConditionPoints);

        let params = KrigingParameters {
            in_range: true,
            max_points: 1,
            ..Default::default()
        };
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(1.0, 1.0, 0.0), params);
        ok.fit(&collinear(Dimension::Planar));
        let est = ok.estimate(&Point3::new(0.1, 0.1, 0.0)).unwrap();
        assert!(est.is_ok());
        assert_relative_eq!(est.field, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clustered_pairs_keep_unbiased_weights() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut points = Vec::new();
        for _ in 0..30 {
            let x = rng.gen_range(0.0..10.0);
            let y = rng.gen_range(0.0..10.0);
            points.push(SamplePoint::planar(x, y, x + y));
            points.push(SamplePoint::planar(x + 1e-3, y, x + y));
        }

        let mut ok = OrdinaryKriging::new(IsoSpherical::new(30.0, 1.0, 0.1), KrigingParameters::default());
        ok.fit(&PointSet::new(points, Dimension::Planar));

        for _ in 0..10 {
            let target = Point3::new(rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0), 0.0);
            let est = ok.estimate(&target).unwrap();
            assert!(est.is_ok(), "{:?}", est);
            assert!(est.field.is_finite());
        }
    }

    #[test]
    fn unfitted_is_error() {
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(1.0, 1.0, 0.0), KrigingParameters::default());
        assert!(matches!(
            ok.interpolate(&PointSet::default()),
            Err(GeostatError::NotFitted(_))
        ));
        assert!(ok.estimate(&Point3::origin()).is_err());
    }

    #[test]
    fn results_aligned_with_targets() {
        let mut rng = StdRng::seed_from_u64(5);
        let data = PointSet::new(
            (0..60)
                .map(|_| {
                    let x = rng.gen_range(0.0..20.0);
                    let y = rng.gen_range(0.0..20.0);
                    SamplePoint::planar(x, y, x + 0.5 * y)
                })
                .collect(),
            Dimension::Planar,
        );
        let params = KrigingParameters {
            max_points: 12,
            ..Default::default()
        };
        let mut ok = OrdinaryKriging::new(IsoSpherical::new(15.0, 10.0, 0.0), params);
        ok.fit(&data);

        let targets = PointSet::new(
            (0..40)
                .map(|i| SamplePoint::unobserved(Point3::new(i as f64 * 0.5, 10.0, 0.0)))
                .collect(),
            Dimension::Planar,
        );
        let batch = ok.interpolate(&targets).unwrap();

        for (t, est) in targets.iter().zip(batch.iter()) {
            let single = ok.estimate(&t.coords).unwrap();
            assert_relative_eq!(single.field, est.field, epsilon = 1e-12);
        }
    }
}
