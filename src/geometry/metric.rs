use std::fmt;
use std::str::FromStr;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::GeostatError;

use super::{Dimension, SamplePoint};

/// Family of distance functions available for lag and neighbor computations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// L2 norm
    #[default]
    Euclidean,
    /// L1 norm
    Manhattan,
    /// L-infinity norm
    Chebyshev,
}

impl MetricKind {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::Euclidean => "euclidean",
            MetricKind::Manhattan => "manhattan",
            MetricKind::Chebyshev => "chebyshev",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = GeostatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euclidean" => Ok(MetricKind::Euclidean),
            "manhattan" => Ok(MetricKind::Manhattan),
            "chebyshev" => Ok(MetricKind::Chebyshev),
            _ => Err(GeostatError::unknown("distance metric", s)),
        }
    }
}

/// Stateless distance function with a 2D/3D toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistanceMetric {
    kind: MetricKind,
    dimension: Dimension,
}

impl DistanceMetric {
    pub fn new(kind: MetricKind, dimension: Dimension) -> Self {
        Self { kind, dimension }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_3d(&self) -> bool {
        self.dimension.is_3d()
    }

    /// Toggle whether the third ordinate participates.
    pub fn set_3d(&mut self, is_3d: bool) {
        self.dimension = Dimension::from_3d(is_3d);
    }

    #[inline(always)]
    pub fn compute(&self, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
        let d = p1 - p2;
        let dz = if self.dimension.is_3d() { d.z } else { 0.0 };

        match self.kind {
            MetricKind::Euclidean => (d.x * d.x + d.y * d.y + dz * dz).sqrt(),
            MetricKind::Manhattan => d.x.abs() + d.y.abs() + dz.abs(),
            MetricKind::Chebyshev => d.x.abs().max(d.y.abs()).max(dz.abs()),
        }
    }

    #[inline(always)]
    pub fn between(&self, p1: &SamplePoint, p2: &SamplePoint) -> f64 {
        self.compute(&p1.coords, &p2.coords)
    }
}
