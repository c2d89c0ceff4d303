use std::time::{Duration, Instant};

use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use itertools::izip;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IsoVariogramModel, ModelFamily, ModelParameters, VariogramType};

const MAX_ITERS: u64 = 100;
const SD_TOLERANCE: f64 = 1e-6;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("no sill: semivariance has no finite value")]
    NoSill,
    #[error("no range: lag edges are empty")]
    NoRange,
    #[error("invalid sill: {0}")]
    InvalidSill(f64),
    #[error("invalid range: {0}")]
    InvalidRange(f64),
    #[error("optimizer failed: {0}")]
    Optimizer(String),
    #[error("no feasible model found")]
    Infeasible,
}

/// Starting point for the simplex.
///
/// Nugget is the first finite semivariance, sill is the largest semivariance above that
/// nugget and range is the lag edge where the largest semivariance occurs.
pub fn initial_guess(lags: &[f64], semivariance: &[f64]) -> Result<ModelParameters, FitError> {
    if lags.is_empty() {
        return Err(FitError::NoRange);
    }

    let finite = izip!(lags, semivariance)
        .filter(|(h, g)| h.is_finite() && g.is_finite())
        .map(|(h, g)| (*h, *g))
        .collect::<Vec<_>>();

    let (_, nugget) = *finite.first().ok_or(FitError::NoSill)?;
    //first lag reaching the maximum
    let (range, max) = finite
        .iter()
        .rev()
        .copied()
        .max_by_key(|(_, g)| OrderedFloat(*g))
        .ok_or(FitError::NoSill)?;

    if range <= 0.0 {
        return Err(FitError::InvalidRange(range));
    }

    let mut guess = ModelParameters::new(range, max - nugget, nugget);

    //flat or decreasing variograms give no room above the nugget, start from a pure sill instead
    if guess.sill <= 0.0 {
        guess.nugget = 0.0;
        guess.sill = max;
    }
    if guess.sill <= 0.0 {
        return Err(FitError::InvalidSill(guess.sill));
    }

    Ok(guess)
}

/// Least squares misfit between a model family and an empirical variogram.
pub struct VariogramFitter<'a> {
    pub lags: &'a [f64],
    pub semivariance: &'a [f64],
    pub family: ModelFamily,
}

impl<'a> VariogramFitter<'a> {
    pub fn new(lags: &'a [f64], semivariance: &'a [f64], family: ModelFamily) -> Self {
        Self {
            lags,
            semivariance,
            family,
        }
    }

    /// Sum of squared residuals, infinite outside the feasible region.
    pub fn misfit(&self, params: ModelParameters) -> f64 {
        if !params.is_feasible() {
            return f64::INFINITY;
        }

        let model = self.family.build(params);
        let cost = izip!(self.lags, self.semivariance)
            .filter(|(_, g)| g.is_finite())
            .map(|(h, g)| {
                let r = model.variogram(*h) - g;
                r * r
            })
            .sum::<f64>();

        if cost.is_nan() {
            f64::INFINITY
        } else {
            cost
        }
    }
}

impl CostFunction for VariogramFitter<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok(self.misfit(ModelParameters::from_slice(params)))
    }
}

//initial guess plus one vertex per parameter, each nudged by 5%
fn initial_simplex(guess: &ModelParameters) -> Vec<Vec<f64>> {
    let x0 = guess.to_vec();
    let mut simplex = vec![x0.clone()];
    for i in 0..x0.len() {
        let mut vertex = x0.clone();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * 1.05
        } else {
            0.00025
        };
        simplex.push(vertex);
    }
    simplex
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitProfile {
    pub initial_guess: Duration,
    pub fit: Duration,
    /// Includes the empirical variogram when the fit started from one.
    pub total: Duration,
}

/// Model produced by fitting an empirical variogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedVariogram {
    pub model: VariogramType,
    pub initial: ModelParameters,
    pub residual: f64,
    pub iterations: u64,
    pub profile: FitProfile,
}

impl FittedVariogram {
    pub fn name(&self) -> &'static str {
        self.model.name()
    }

    pub fn evaluate(&self, h: f64) -> f64 {
        self.model.variogram(h)
    }
}

impl IsoVariogramModel for FittedVariogram {
    fn range(&self) -> f64 {
        self.model.range()
    }

    fn sill(&self) -> f64 {
        self.model.sill()
    }

    fn nugget(&self) -> f64 {
        self.model.nugget()
    }

    #[inline(always)]
    fn variogram(&self, h: f64) -> f64 {
        self.model.variogram(h)
    }
}

/// Fit `family` to an empirical variogram with Nelder-Mead.
///
/// # Arguments
/// * `lags` - upper lag edges
/// * `semivariance` - semivariance per lag, non-finite lags are ignored
/// * `family` - model family to fit, matérn smoothness is held fixed
pub fn fit_variogram(
    lags: &[f64],
    semivariance: &[f64],
    family: ModelFamily,
) -> Result<FittedVariogram, FitError> {
    let start = Instant::now();
    let guess = initial_guess(lags, semivariance)?;
    let initial_guess_time = start.elapsed();

    let t = Instant::now();
    let fitter = VariogramFitter::new(lags, semivariance, family);
    let solver = NelderMead::new(initial_simplex(&guess))
        .with_sd_tolerance(SD_TOLERANCE)
        .map_err(|e| FitError::Optimizer(e.to_string()))?;

    let res = Executor::new(fitter, solver)
        .configure(|state| state.max_iters(MAX_ITERS))
        .run()
        .map_err(|e| FitError::Optimizer(e.to_string()))?;

    let state = res.state();
    let best = state
        .get_best_param()
        .map(|p| ModelParameters::from_slice(p))
        .unwrap_or(guess);
    let residual = state.get_best_cost();
    let iterations = state.get_iter();

    if !residual.is_finite() || !best.is_feasible() {
        return Err(FitError::Infeasible);
    }
    let fit_time = t.elapsed();

    let fitted = FittedVariogram {
        model: family.build(best),
        initial: guess,
        residual,
        iterations,
        profile: FitProfile {
            initial_guess: initial_guess_time,
            fit: fit_time,
            total: start.elapsed(),
        },
    };

    debug!(
        model = fitted.name(),
        range = best.range,
        sill = best.sill,
        nugget = best.nugget,
        residual,
        iterations,
        "variogram fitted"
    );

    Ok(fitted)
}
