use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

#[derive(Debug, Clone, Default, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoGaussian {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
}

impl IsoGaussian {
    pub fn new(range: f64, sill: f64, nugget: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
        }
    }
}

impl IsoVariogramModel for IsoGaussian {
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
        let a = self.range / 2.0;
        self.nugget + self.sill * (1.0 - (-(h / a) * (h / a)).exp())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn gaussian_values() {
        let v = IsoGaussian::new(10.0, 1.0, 0.1);

        assert_relative_eq!(v.variogram(0.0), 0.1);
        assert_relative_eq!(v.variogram(5.0), 0.1 + 1.0 - (-1f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(v.variogram(10.0), 0.1 + 1.0 - (-4f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn gaussian_parabolic_at_origin() {
        let v = IsoGaussian::new(10.0, 1.0, 0.0);
        let small = v.variogram(1e-3);
        assert!(small < 1e-7);
    }
}
