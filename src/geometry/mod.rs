use std::time::SystemTime;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

pub mod aabb;
pub mod metric;

/// Number of ordinates that participate in distance computations.
///
/// Points always carry three ordinates; planar data keeps `z = 0` and metrics built for
/// [`Dimension::Planar`] never read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dimension {
    #[default]
    Planar,
    Spatial,
}

impl Dimension {
    pub fn from_3d(is_3d: bool) -> Self {
        if is_3d {
            Dimension::Spatial
        } else {
            Dimension::Planar
        }
    }

    #[inline(always)]
    pub fn is_3d(self) -> bool {
        matches!(self, Dimension::Spatial)
    }
}

/// A sampled (or to-be-estimated) location with a single scalar attribute.
///
/// An unobserved attribute is represented as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    pub coords: Point3<f64>,
    pub value: f64,
    pub time: Option<SystemTime>,
}

impl SamplePoint {
    pub fn new(coords: Point3<f64>, value: f64) -> Self {
        Self {
            coords,
            value,
            time: None,
        }
    }

    pub fn planar(x: f64, y: f64, value: f64) -> Self {
        Self::new(Point3::new(x, y, 0.0), value)
    }

    pub fn spatial(x: f64, y: f64, z: f64, value: f64) -> Self {
        Self::new(Point3::new(x, y, z), value)
    }

    /// Location without an observed attribute, e.g. a kriging target.
    pub fn unobserved(coords: Point3<f64>) -> Self {
        Self::new(coords, f64::NAN)
    }

    pub fn with_time(mut self, time: SystemTime) -> Self {
        self.time = Some(time);
        self
    }

    #[inline(always)]
    pub fn is_observed(&self) -> bool {
        !self.value.is_nan()
    }
}
