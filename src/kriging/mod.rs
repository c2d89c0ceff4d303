use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::metric::MetricKind;

pub mod ordinary_kriging;

/// Why a single target could not be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EstimationError {
    #[default]
    None,
    NoConditionPoints,
    SingularMatrix,
}

/// Prediction at one target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimation {
    pub field: f64,
    pub variance: f64,
    pub error: EstimationError,
}

impl Estimation {
    pub fn new(field: f64, variance: f64) -> Self {
        Self {
            field,
            variance,
            error: EstimationError::None,
        }
    }

    /// NaN estimation tagged with `error`.
    pub fn failed(error: EstimationError) -> Self {
        Self {
            field: f64::NAN,
            variance: f64::NAN,
            error,
        }
    }

    #[inline(always)]
    pub fn is_ok(&self) -> bool {
        self.error == EstimationError::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KrigingParameters {
    /// Maximum number of nearest conditioning points per target.
    pub max_points: usize,
    /// Reject targets whose farthest selected neighbor lies beyond the model range.
    pub in_range: bool,
    pub metric: MetricKind,
}

impl Default for KrigingParameters {
    fn default() -> Self {
        Self {
            max_points: 100,
            in_range: false,
            metric: MetricKind::default(),
        }
    }
}

/// Timings for one kriged target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepProfile {
    pub init: Duration,
    pub matrix: Duration,
    pub solve: Duration,
    pub total: Duration,
}

/// Aggregate timings of an interpolation batch.
///
/// Means are taken over successful targets only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KrigingProfile {
    pub fit: Duration,
    pub mean_init: Duration,
    pub mean_matrix: Duration,
    pub mean_solve: Duration,
    pub mean_total: Duration,
    pub successful: usize,
    pub failed: usize,
}

impl KrigingProfile {
    pub(crate) fn accumulate<'a>(
        fit: Duration,
        steps: impl IntoIterator<Item = &'a StepProfile>,
        failed: usize,
    ) -> Self {
        let mut profile = KrigingProfile {
            fit,
            failed,
            ..Default::default()
        };

        for step in steps {
            profile.mean_init += step.init;
            profile.mean_matrix += step.matrix;
            profile.mean_solve += step.solve;
            profile.mean_total += step.total;
            profile.successful += 1;
        }

        if profile.successful > 0 {
            let n = profile.successful as u32;
            profile.mean_init /= n;
            profile.mean_matrix /= n;
            profile.mean_solve /= n;
            profile.mean_total /= n;
        }

        profile
    }
}
