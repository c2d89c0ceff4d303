use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

#[derive(Debug, Clone, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoCubic {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
}

impl IsoCubic {
    pub fn new(range: f64, sill: f64, nugget: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
        }
    }
}

impl IsoVariogramModel for IsoCubic {
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
            let u2 = u * u;
            let u3 = u2 * u;
            let u5 = u3 * u2;
            let u7 = u5 * u2;
            return self.nugget + self.sill * (7.0 * u2 - 8.75 * u3 + 3.5 * u5 - 0.75 * u7);
        }
        self.nugget + self.sill
    }
}
