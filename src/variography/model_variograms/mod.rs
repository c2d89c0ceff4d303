use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeostatError;

use self::iso_cubic::IsoCubic;
use self::iso_exponential::IsoExponential;
use self::iso_gaussian::IsoGaussian;
use self::iso_matern::IsoMatern;
use self::iso_spherical::IsoSpherical;

pub mod iso_cubic;
pub mod iso_exponential;
pub mod iso_fitter;
pub mod iso_gaussian;
pub mod iso_matern;
pub mod iso_spherical;

/// Smoothness used when a matérn model is requested by name.
pub const DEFAULT_MATERN_NU: f64 = 1.5;

/// Isotropic variogram model of lag distance.
///
/// `variogram(0)` equals the nugget and the variogram never exceeds `nugget + sill`.
pub trait IsoVariogramModel {
    fn range(&self) -> f64;
    fn sill(&self) -> f64;
    fn nugget(&self) -> f64;

    fn variogram(&self, h: f64) -> f64;

    /// Total variance, the covariance at lag zero.
    fn c_0(&self) -> f64 {
        self.nugget() + self.sill()
    }

    fn covariogram(&self, h: f64) -> f64 {
        self.c_0() - self.variogram(h)
    }
}

/// Range, partial sill and nugget shared by every family.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelParameters {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
}

impl ModelParameters {
    pub fn new(range: f64, sill: f64, nugget: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.range > 0.0 && self.sill > 0.0 && self.nugget >= 0.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.range, self.sill, self.nugget]
    }

    pub fn from_slice(params: &[f64]) -> Self {
        Self::new(params[0], params[1], params[2])
    }
}

/// Named variogram family.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    Spherical,
    Exponential,
    Gaussian,
    Cubic,
    Matern { nu: f64 },
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::Spherical => "spherical",
            ModelFamily::Exponential => "exponential",
            ModelFamily::Gaussian => "gaussian",
            ModelFamily::Cubic => "cubic",
            ModelFamily::Matern { .. } => "matern",
        }
    }

    /// Instantiate a model of this family.
    pub fn build(&self, params: ModelParameters) -> VariogramType {
        let ModelParameters {
            range,
            sill,
            nugget,
        } = params;

        match *self {
            ModelFamily::Spherical => {
                VariogramType::Spherical(IsoSpherical::new(range, sill, nugget))
            }
            ModelFamily::Exponential => {
                VariogramType::Exponential(IsoExponential::new(range, sill, nugget))
            }
            ModelFamily::Gaussian => VariogramType::Gaussian(IsoGaussian::new(range, sill, nugget)),
            ModelFamily::Cubic => VariogramType::Cubic(IsoCubic::new(range, sill, nugget)),
            ModelFamily::Matern { nu } => {
                VariogramType::Matern(IsoMatern::new(range, sill, nugget, nu))
            }
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Matern { nu } => write!(f, "matern(nu={nu})"),
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for ModelFamily {
    type Err = GeostatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spherical" => Ok(ModelFamily::Spherical),
            "exponential" => Ok(ModelFamily::Exponential),
            "gaussian" => Ok(ModelFamily::Gaussian),
            "cubic" => Ok(ModelFamily::Cubic),
            "matern" | "matérn" => Ok(ModelFamily::Matern {
                nu: DEFAULT_MATERN_NU,
            }),
            _ => Err(GeostatError::unknown("variogram model", s)),
        }
    }
}

/// Closed set of model families with their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariogramType {
    Spherical(IsoSpherical),
    Exponential(IsoExponential),
    Gaussian(IsoGaussian),
    Cubic(IsoCubic),
    Matern(IsoMatern),
}

impl VariogramType {
    pub fn family(&self) -> ModelFamily {
        match self {
            VariogramType::Spherical(_) => ModelFamily::Spherical,
            VariogramType::Exponential(_) => ModelFamily::Exponential,
            VariogramType::Gaussian(_) => ModelFamily::Gaussian,
            VariogramType::Cubic(_) => ModelFamily::Cubic,
            VariogramType::Matern(v) => ModelFamily::Matern { nu: v.nu },
        }
    }

    pub fn name(&self) -> &'static str {
        self.family().name()
    }

    pub fn params(&self) -> ModelParameters {
        ModelParameters::new(self.range(), self.sill(), self.nugget())
    }

    /// Variogram at every lag in `h`.
    pub fn evaluate_many(&self, h: &[f64]) -> Vec<f64> {
        h.iter().map(|h| self.variogram(*h)).collect()
    }
}

impl IsoVariogramModel for VariogramType {
    fn range(&self) -> f64 {
        match self {
            VariogramType::Spherical(v) => v.range,
            VariogramType::Exponential(v) => v.range,
            VariogramType::Gaussian(v) => v.range,
            VariogramType::Cubic(v) => v.range,
            VariogramType::Matern(v) => v.range,
        }
    }

    fn sill(&self) -> f64 {
        match self {
            VariogramType::Spherical(v) => v.sill,
            VariogramType::Exponential(v) => v.sill,
            VariogramType::Gaussian(v) => v.sill,
            VariogramType::Cubic(v) => v.sill,
            VariogramType::Matern(v) => v.sill,
        }
    }

    fn nugget(&self) -> f64 {
        match self {
            VariogramType::Spherical(v) => v.nugget,
            VariogramType::Exponential(v) => v.nugget,
            VariogramType::Gaussian(v) => v.nugget,
            VariogramType::Cubic(v) => v.nugget,
            VariogramType::Matern(v) => v.nugget,
        }
    }

    #[inline(always)]
    fn variogram(&self, h: f64) -> f64 {
        match self {
            VariogramType::Spherical(v) => v.variogram(h),
            VariogramType::Exponential(v) => v.variogram(h),
            VariogramType::Gaussian(v) => v.variogram(h),
            VariogramType::Cubic(v) => v.variogram(h),
            VariogramType::Matern(v) => v.variogram(h),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const FAMILIES: [ModelFamily; 8] = [
        ModelFamily::Spherical,
        ModelFamily::Exponential,
        ModelFamily::Gaussian,
        ModelFamily::Cubic,
        ModelFamily::Matern { nu: 1.5 },
        ModelFamily::Matern { nu: 0.8 },
        ModelFamily::Matern { nu: 2.0 },
        ModelFamily::Matern { nu: 3.0 },
    ];

    #[test]
    fn every_family_bounded_and_monotone() {
        let params = ModelParameters::new(25.0, 2.0, 0.3);
        let lags = (0..400).map(|i| i as f64 * 0.25).collect::<Vec<_>>();

        for family in FAMILIES {
            let model = family.build(params);
            let gamma = model.evaluate_many(&lags);

            assert_relative_eq!(gamma[0], 0.3, epsilon = 1e-12);
            for w in gamma.windows(2) {
                assert!(w[1] >= w[0] - 1e-9, "{family} decreases: {:?}", w);
            }
            assert!(gamma.iter().all(|g| *g <= 2.3 + 1e-12), "{family} exceeds sill");
        }
    }

    #[test]
    fn covariogram_complements_variogram() {
        let model = ModelFamily::Exponential.build(ModelParameters::new(10.0, 1.5, 0.5));
        assert_relative_eq!(model.c_0(), 2.0);
        assert_relative_eq!(model.covariogram(0.0), 1.5);
        assert_relative_eq!(model.covariogram(4.0) + model.variogram(4.0), 2.0);
    }

    #[test]
    fn parse_names() {
        assert_eq!("Spherical".parse::<ModelFamily>().unwrap(), ModelFamily::Spherical);
        assert_eq!("cubic".parse::<ModelFamily>().unwrap(), ModelFamily::Cubic);
        assert_eq!(
            "matern".parse::<ModelFamily>().unwrap(),
            ModelFamily::Matern { nu: DEFAULT_MATERN_NU }
        );
        assert!(matches!(
            "hole-effect".parse::<ModelFamily>(),
            Err(GeostatError::Config { .. })
        ));
    }

    #[test]
    fn build_round_trips_parameters() {
        let params = ModelParameters::new(3.0, 4.0, 0.0);
        for family in FAMILIES {
            let model = family.build(params);
            assert_eq!(model.params(), params);
            assert_eq!(model.family(), family);
        }
    }
}
