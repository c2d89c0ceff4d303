use std::sync::Arc;
use std::time::{Duration, Instant};

use bitvec::prelude::*;
use nalgebra::Point3;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GeostatError, Result};
use crate::geometry::metric::{DistanceMetric, MetricKind};
use crate::geometry::SamplePoint;
use crate::kriging::ordinary_kriging::OrdinaryKriging;
use crate::kriging::{Estimation, EstimationError, KrigingParameters};
use crate::spatial_database::point_set::PointSet;
use crate::variography::model_variograms::IsoVariogramModel;

use super::progress::{ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SGSParameters {
    /// Maximum number of conditioning points per step.
    pub max_points: usize,
    /// Restrict each step to the nearest original points and the simulated points inside
    /// their radius instead of every point simulated so far.
    pub use_neighbors: bool,
    /// Realization `r` is seeded with `seed + r`, entropy is used when `None`.
    pub seed: Option<u64>,
    pub metric: MetricKind,
}

impl Default for SGSParameters {
    fn default() -> Self {
        Self {
            max_points: 100,
            use_neighbors: true,
            seed: None,
            metric: MetricKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationState {
    #[default]
    Idle,
    Fitted,
    Simulating,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationProfile {
    pub mean_fit: Duration,
    pub mean_interpolation: Duration,
    pub mean_realization: Duration,
    pub failed_steps: usize,
    pub failed_realizations: usize,
}

//per realization outcome gathered before aggregation
struct Realization {
    values: Vec<Estimation>,
    fit: Duration,
    interpolation: Duration,
    steps: usize,
    failed_steps: usize,
    total: Duration,
}

/// Sequential Gaussian simulation conditioned on a fixed set of observed points.
pub struct SGS<V> {
    variogram_model: V,
    params: SGSParameters,
    conditioning: PointSet,
    state: SimulationState,
    progress: Option<Arc<dyn ProgressSink>>,
    profile: SimulationProfile,
}

impl<V> SGS<V>
where
    V: IsoVariogramModel + Clone + Send + Sync,
{
    /// Create a new SGS simulator
    /// # Arguments
    /// * `variogram_model` - The variogram model to use
    /// * `params` - The SGS parameters to use
    pub fn new(variogram_model: V, params: SGSParameters) -> Self {
        Self {
            variogram_model,
            params,
            conditioning: PointSet::default(),
            state: SimulationState::Idle,
            progress: None,
            profile: SimulationProfile::default(),
        }
    }

    /// Report per step progress to `sink`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Store the observed points of `conditioning`.
    pub fn fit(&mut self, conditioning: &PointSet) {
        self.conditioning = conditioning.observed();
        self.state = SimulationState::Fitted;
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    pub fn conditioning(&self) -> &PointSet {
        &self.conditioning
    }

    /// Single stochastic draw per target.
    pub fn interpolate(&mut self, targets: &PointSet) -> Result<Vec<Estimation>> {
        let mut realizations = self.simulate(targets, 1)?;
        Ok(realizations.pop().unwrap_or_default())
    }

    /// Generate `num_realizations` independent realizations in parallel.
    ///
    /// Each realization is aligned with `targets`. Steps that cannot be kriged leave NaN
    /// entries and are counted in the profile instead of failing the call.
    #[tracing::instrument(skip_all, fields(targets = targets.len(), realizations = num_realizations))]
    pub fn simulate(
        &mut self,
        targets: &PointSet,
        num_realizations: usize,
    ) -> Result<Vec<Vec<Estimation>>> {
        if self.state == SimulationState::Idle {
            return Err(GeostatError::NotFitted("sequential gaussian simulation"));
        }
        if num_realizations == 0 {
            return Err(GeostatError::Input(
                "number of realizations must be at least one".to_string(),
            ));
        }

        self.state = SimulationState::Simulating;
        let metric = DistanceMetric::new(self.params.metric, targets.dimension);

        //nearest original conditioning points, shared by every realization
        let neighbors = targets
            .points
            .par_iter()
            .map(|t| {
                self.conditioning
                    .nearest(&t.coords, self.params.max_points, &metric)
            })
            .collect::<Vec<_>>();

        let realizations = (0..num_realizations)
            .into_par_iter()
            .map(|r| self.realize(r, targets, &neighbors, &metric))
            .collect::<Vec<_>>();

        self.profile = Self::aggregate(&realizations);
        if self.profile.failed_realizations > 0 {
            warn!(
                failed_realizations = self.profile.failed_realizations,
                failed_steps = self.profile.failed_steps,
                "{} of {num_realizations} realizations contain failed steps",
                self.profile.failed_realizations
            );
        }
        debug!(profile = ?self.profile, "simulation complete");

        self.state = SimulationState::Done;
        Ok(realizations.into_iter().map(|r| r.values).collect())
    }

    fn rng(&self, realization: usize) -> StdRng {
        match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(realization as u64)),
            None => StdRng::from_entropy(),
        }
    }

    fn realize(
        &self,
        realization: usize,
        targets: &PointSet,
        neighbors: &[Vec<(usize, f64)>],
        metric: &DistanceMetric,
    ) -> Realization {
        let start = Instant::now();
        let mut rng = self.rng(realization);

        let n_cond = self.conditioning.len();
        let n_targets = targets.len();

        //conditioning points followed by targets, a set bit marks usable conditioning
        let mut arena = self.conditioning.points.clone();
        arena.extend(targets.points.iter().map(|t| SamplePoint {
            value: f64::NAN,
            ..*t
        }));
        let mut active = bitvec![0; n_cond + n_targets];
        active[..n_cond].fill(true);

        let mut path = (0..n_targets).collect::<Vec<_>>();
        path.shuffle(&mut rng);

        let kriging_params = KrigingParameters {
            max_points: self.params.max_points,
            in_range: false,
            metric: self.params.metric,
        };

        let mut values = vec![Estimation::failed(EstimationError::NoConditionPoints); n_targets];
        let mut fit_time = Duration::ZERO;
        let mut interpolation_time = Duration::ZERO;
        let mut failed_steps = 0;

        for (step, &t) in path.iter().enumerate() {
            let target = targets.points[t].coords;

            let candidates = self.active_set(&arena, &active, n_cond, &neighbors[t], &target, metric);
            let local = PointSet::new(
                candidates.into_iter().map(|i| arena[i]).collect(),
                targets.dimension,
            );

            let fit_start = Instant::now();
            let mut solver = OrdinaryKriging::new(self.variogram_model.clone(), kriging_params);
            solver.fit(&local);
            let fit = fit_start.elapsed();

            let interp_start = Instant::now();
            let estimation = solver
                .estimate(&target)
                .unwrap_or_else(|_| Estimation::failed(EstimationError::NoConditionPoints));
            let drawn = draw(&estimation, &mut rng);
            let interpolation = interp_start.elapsed();

            fit_time += fit;
            interpolation_time += interpolation;

            match drawn {
                Some(value) => {
                    arena[n_cond + t].value = value;
                    active.set(n_cond + t, true);
                    values[t] = Estimation {
                        field: value,
                        ..estimation
                    };
                }
                None => {
                    failed_steps += 1;
                    values[t] = Estimation {
                        field: f64::NAN,
                        ..estimation
                    };
                }
            }

            if let Some(sink) = &self.progress {
                sink.emit(&ProgressEvent {
                    realization,
                    step,
                    total: n_targets,
                    fit_time: fit,
                    interpolation_time: interpolation,
                });
            }
        }

        if let Some(sink) = &self.progress {
            sink.finish(realization);
        }

        Realization {
            values,
            fit: fit_time,
            interpolation: interpolation_time,
            steps: n_targets,
            failed_steps,
            total: start.elapsed(),
        }
    }

    /// Arena indices conditioning the next step at `target`.
    ///
    /// With the neighbor restriction this is the precomputed nearest original points plus
    /// every simulated point strictly closer than the farthest of them. The result is cut to
    /// the `max_points` nearest, which are the points the kriging step would select anyway.
    fn active_set(
        &self,
        arena: &[SamplePoint],
        active: &BitSlice,
        n_cond: usize,
        neighbors: &[(usize, f64)],
        target: &Point3<f64>,
        metric: &DistanceMetric,
    ) -> Vec<usize> {
        let simulated = active[n_cond..].iter_ones().map(|i| i + n_cond);

        let mut candidates = match (self.params.use_neighbors, neighbors.last()) {
            (true, Some(&(_, radius))) => neighbors
                .iter()
                .map(|&(i, d)| (d, i))
                .chain(simulated.filter_map(|i| {
                    let d = metric.compute(target, &arena[i].coords);
                    (d < radius).then_some((d, i))
                }))
                .collect::<Vec<_>>(),
            (true, None) => simulated
                .map(|i| (metric.compute(target, &arena[i].coords), i))
                .collect(),
            (false, _) => active
                .iter_ones()
                .map(|i| (metric.compute(target, &arena[i].coords), i))
                .collect(),
        };

        let k = self.params.max_points;
        if candidates.len() > k {
            candidates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            candidates.truncate(k);
        }
        candidates.into_iter().map(|(_, i)| i).collect()
    }

    fn aggregate(realizations: &[Realization]) -> SimulationProfile {
        let steps = realizations.iter().map(|r| r.steps).sum::<usize>().max(1) as u32;
        let n = realizations.len().max(1) as u32;

        SimulationProfile {
            mean_fit: realizations.iter().map(|r| r.fit).sum::<Duration>() / steps,
            mean_interpolation: realizations.iter().map(|r| r.interpolation).sum::<Duration>()
                / steps,
            mean_realization: realizations.iter().map(|r| r.total).sum::<Duration>() / n,
            failed_steps: realizations.iter().map(|r| r.failed_steps).sum(),
            failed_realizations: realizations.iter().filter(|r| r.failed_steps > 0).count(),
        }
    }
}

/// Normal draw with the kriging mean and standard deviation, `None` when the step failed.
fn draw(estimation: &Estimation, rng: &mut StdRng) -> Option<f64> {
    if !estimation.is_ok() || !estimation.field.is_finite() {
        return None;
    }
    let sd = estimation.variance.max(0.0).sqrt();
    let normal = Normal::new(estimation.field, sd).ok()?;
    let value = normal.sample(rng);
    value.is_finite().then_some(value)
}
