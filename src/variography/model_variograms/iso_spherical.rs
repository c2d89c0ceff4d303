use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

#[derive(Debug, Clone, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoSpherical {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
}

impl IsoSpherical {
    pub fn new(range: f64, sill: f64, nugget: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
        }
    }
}

impl IsoVariogramModel for IsoSpherical {
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
        if h < self.range {
            let u = h / self.range;
            return self.nugget + self.sill * (1.5 * u - 0.5 * u * u * u);
        }
        self.nugget + self.sill
    }
}
