use std::fmt;
use std::str::FromStr;

use itertools::izip;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GeostatError;

/// Statistic used to reduce the differences of one lag to a semivariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Estimator {
    /// Classical method of moments, half the mean squared difference.
    #[default]
    Matheron,
    /// Cressie-Hawkins robust estimator.
    Cressie,
}

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Matheron => "matheron",
            Estimator::Cressie => "cressie",
        }
    }

    /// Semivariance of one lag. NaN when `differences` is empty.
    pub fn compute(&self, differences: &[f64]) -> f64 {
        if differences.is_empty() {
            return f64::NAN;
        }
        let n = differences.len() as f64;

        match self {
            Estimator::Matheron => differences.iter().map(|d| d * d).sum::<f64>() / (2.0 * n),
            Estimator::Cressie => {
                let mean_root = differences.iter().map(|d| d.abs().sqrt()).sum::<f64>() / n;
                mean_root.powi(4) / (2.0 * (0.457 + 0.494 / n + 0.045 / (n * n)))
            }
        }
    }

    /// Semivariance for every lag, each lag reduced independently in parallel.
    pub fn map(&self, differences: &[f64], bins: &[Option<usize>], num_lags: usize) -> Vec<f64> {
        let mut groups = vec![Vec::new(); num_lags];
        for (diff, bin) in izip!(differences, bins) {
            if let Some(j) = bin {
                groups[*j].push(*diff);
            }
        }

        groups
            .into_par_iter()
            .map(|group| self.compute(&group))
            .collect()
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Estimator {
    type Err = GeostatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matheron" => Ok(Estimator::Matheron),
            "cressie" => Ok(Estimator::Cressie),
            _ => Err(GeostatError::unknown("estimator", s)),
        }
    }
}
