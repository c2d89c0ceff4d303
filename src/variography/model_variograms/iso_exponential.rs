use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

/// Exponential model with practical range `range` (scale `range / 3`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IsoExponential {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
}

impl IsoExponential {
    pub fn new(range: f64, sill: f64, nugget: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
        }
    }
}

impl IsoVariogramModel for IsoExponential {
    fn range(&self) -> f64 {
        self.range
    }

    fn sill(&self) -> f64 {
        self.sill
    }

    fn nugget(&self) -> f64 {
        self.nugget
    }

    #[inline(always)]
    fn variogram(&self, h: f64) -> f64 {
        let a = self.range / 3.0;
        self.nugget + self.sill * (1.0 - (-h / a).exp())
    }
}
