//! Run configuration shared by the estimation workflows.

use serde::{Deserialize, Serialize};

use crate::error::{GeostatError, Result};
use crate::geometry::aabb::GridSpacing;
use crate::geometry::metric::MetricKind;
use crate::kriging::KrigingParameters;
use crate::simulation::sgs::SGSParameters;
use crate::variography::experimental::VariogramParams;
use crate::variography::model_variograms::ModelFamily;

/// Every tunable of a run in one place.
///
/// ### Default Values
/// - `variogram`: 10 lags, unbounded, euclidean, matheron
/// - `model`: spherical
/// - `kriging`: 100 points, no range gate
/// - `simulation`: 100 points, neighbor restriction on, unseeded
/// - `grid`: unit spacing
/// - `realizations`: `1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeostatConfig {
    pub variogram: VariogramParams,
    pub model: ModelFamily,
    pub kriging: KrigingParameters,
    pub simulation: SGSParameters,
    /// Spacing of the dense target grid.
    pub grid: GridSpacing,
    pub realizations: usize,
}

impl Default for GeostatConfig {
    fn default() -> Self {
        Self {
            variogram: VariogramParams::default(),
            model: ModelFamily::default(),
            kriging: KrigingParameters::default(),
            simulation: SGSParameters::default(),
            grid: GridSpacing::default(),
            realizations: 1,
        }
    }
}

impl GeostatConfig {
    /// Use the same distance metric for every stage.
    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.variogram.metric = metric;
        self.kriging.metric = metric;
        self.simulation.metric = metric;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(GeostatError::Input(msg.to_string()));

        if self.variogram.num_lags == 0 {
            return invalid("number of lags must be at least one");
        }
        if let Some(max_lag) = self.variogram.max_lag {
            if !(max_lag.is_finite() && max_lag > 0.0) {
                return invalid("maximum lag must be positive and finite");
            }
        }
        if let ModelFamily::Matern { nu } = self.model {
            if !(nu.is_finite() && nu > 0.0) {
                return invalid("matern smoothness must be positive and finite");
            }
        }
        if self.kriging.max_points == 0 || self.simulation.max_points == 0 {
            return invalid("maximum conditioning points must be at least one");
        }
        if self.realizations == 0 {
            return invalid("number of realizations must be at least one");
        }
        self.grid.validate()
    }
}
