use std::f64::consts::{FRAC_PI_2, LN_2};

use mathru::special::gamma::gamma;
use serde::{Deserialize, Serialize};

use super::IsoVariogramModel;

//below this the model is treated as being at the origin
const ORIGIN_EPS: f64 = 1e-10;

const HALF_INTEGER_TOL: f64 = 1e-10;
const QUADRATURE_STEP: f64 = 0.05;
const QUADRATURE_MAX_STEPS: usize = 20_000;
//terms this far below the peak exponent no longer change the sum
const QUADRATURE_CUTOFF: f64 = -40.0;

/// Matérn model with fixed smoothness `nu`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoMatern {
    pub range: f64,
    pub sill: f64,
    pub nugget: f64,
    pub nu: f64,
}

impl IsoMatern {
    pub fn new(range: f64, sill: f64, nugget: f64, nu: f64) -> Self {
        Self {
            range,
            sill,
            nugget,
            nu,
        }
    }

    /// Correlation `2^(1-nu) / Γ(nu) * x^nu * K_nu(x)` for `x = h / range`, clamped to `[0, 1]`.
    pub fn correlation(&self, h: f64) -> f64 {
        let x = h / self.range;
        if h < ORIGIN_EPS || x < ORIGIN_EPS {
            return 1.0;
        }

        let nu = self.nu;
        let ln_c = (1.0 - nu) * LN_2 - gamma(nu).ln() + nu * x.ln() + ln_bessel_k(nu, x);
        let c = ln_c.exp();
        if c.is_nan() {
            return 0.0;
        }
        c.clamp(0.0, 1.0)
    }
}

impl Default for IsoMatern {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, super::DEFAULT_MATERN_NU)
    }
}

impl IsoVariogramModel for IsoMatern {
    fn range(&self) -> f64 {
        self.range
    }

    fn sill(&self) -> f64 {
        self.sill
    }

    fn nugget(&self) -> f64 {
        self.nugget
    }

    fn variogram(&self, h: f64) -> f64 {
        if h < ORIGIN_EPS {
            return self.nugget;
        }
        self.nugget + self.sill * (1.0 - self.correlation(h))
    }
}

/// Modified Bessel function of the second kind `K_nu(x)`.
///
/// Exact closed forms for `nu` in {0.5, 1.5, 2.5}, quadrature for every other order.
pub fn bessel_k(nu: f64, x: f64) -> f64 {
    if x < ORIGIN_EPS {
        return f64::INFINITY;
    }
    ln_bessel_k(nu, x).exp()
}

/// `ln K_nu(x)` for `x >= ORIGIN_EPS`.
///
/// Half-integer orders use their closed forms. Other orders integrate
/// `K_nu(x) = ∫₀^∞ exp(-x cosh t) cosh(nu t) dt` with the trapezoidal rule, which converges
/// geometrically for this integrand. Terms are scaled by the peak of the exponent at
/// `t* = asinh(nu / x)` so large orders and tiny arguments do not overflow.
fn ln_bessel_k(nu: f64, x: f64) -> f64 {
    let ln_base = 0.5 * (FRAC_PI_2 / x).ln() - x;

    if (nu - 0.5).abs() < HALF_INTEGER_TOL {
        return ln_base;
    }
    if (nu - 1.5).abs() < HALF_INTEGER_TOL {
        return ln_base + (1.0 + 1.0 / x).ln();
    }
    if (nu - 2.5).abs() < HALF_INTEGER_TOL {
        return ln_base + (1.0 + 3.0 / x + 3.0 / (x * x)).ln();
    }

    let nu = nu.abs();
    let exponent = |t: f64| -x * t.cosh() + nu * t + (0.5 * (1.0 + (-2.0 * nu * t).exp())).ln();
    let peak_t = (nu / x).asinh();
    let peak = exponent(peak_t);

    //t = 0 carries half weight
    let mut sum = 0.5 * (exponent(0.0) - peak).exp();
    for i in 1..QUADRATURE_MAX_STEPS {
        let t = i as f64 * QUADRATURE_STEP;
        let rel = exponent(t) - peak;
        sum += rel.exp();
        if t > peak_t && rel < QUADRATURE_CUTOFF {
            break;
        }
    }

    peak + (sum * QUADRATURE_STEP).ln()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn matern_three_halves_closed_form() {
        let v = IsoMatern::new(10.0, 2.0, 0.5, 1.5);

        for h in [0.5, 3.0, 10.0, 27.0] {
            let x: f64 = h / 10.0;
            let expected = 0.5 + 2.0 * (1.0 - (1.0 + x) * (-x).exp());
            assert_relative_eq!(v.variogram(h), expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn matern_half_is_exponential_scale() {
        let v = IsoMatern::new(4.0, 1.0, 0.0, 0.5);
        let x: f64 = 6.0 / 4.0;
        assert_relative_eq!(v.variogram(6.0), 1.0 - (-x).exp(), epsilon = 1e-10);
    }

    #[test]
    fn matern_origin_returns_nugget() {
        let v = IsoMatern::new(10.0, 2.0, 0.3, 1.5);
        assert_eq!(v.variogram(0.0), 0.3);
        assert_eq!(v.variogram(1e-12), 0.3);
    }

    #[test]
    fn bessel_closed_forms() {
        let x = 2.0f64;
        let base = (FRAC_PI_2 / x).sqrt() * (-x).exp();

        assert_relative_eq!(bessel_k(0.5, x), base);
        assert_relative_eq!(bessel_k(1.5, x), base * 1.5);
        assert_relative_eq!(bessel_k(2.5, x), base * (1.0 + 1.5 + 0.75));
        assert!(bessel_k(1.5, 0.0).is_infinite());
    }

    #[test]
    fn near_half_integer_orders_use_closed_form() {
        let x = 0.7;
        assert_eq!(bessel_k(1.5 + 2e-16, x), bessel_k(1.5, x));
        assert_eq!(bessel_k(0.5 - 1e-12, x), bessel_k(0.5, x));
    }

    #[test]
    fn quadrature_matches_reference_values() {
        //K_0(1), K_1(1), K_2(2), K_3(0.5)
        assert_relative_eq!(bessel_k(0.0, 1.0), 0.421_024_438_240_708_3, max_relative = 1e-9);
        assert_relative_eq!(bessel_k(1.0, 1.0), 0.601_907_230_197_234_6, max_relative = 1e-9);
        assert_relative_eq!(bessel_k(2.0, 2.0), 0.253_759_754_566_055_9, max_relative = 1e-9);
        assert_relative_eq!(bessel_k(3.0, 0.5), 62.057_909_529_930_29, max_relative = 1e-9);
    }

    #[test]
    fn quadrature_agrees_with_closed_form() {
        //the closed form branch is skipped just outside the tolerance
        for x in [0.01, 0.3, 2.0, 15.0] {
            assert_relative_eq!(
                bessel_k(1.5 + 1e-9, x),
                bessel_k(1.5, x),
                max_relative = 1e-6
            );
        }
    }

    #[test]
    fn integer_orders_decay_monotonically() {
        for nu in [1.0, 2.0, 3.0] {
            let v = IsoMatern::new(10.0, 1.0, 0.0, nu);
            let lags = [1e-6, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 200.0];
            let semivariance = lags.iter().map(|h| v.variogram(*h)).collect::<Vec<_>>();

            assert!(semivariance[0] < 1e-6, "nu {nu} starts at {}", semivariance[0]);
            for w in semivariance.windows(2) {
                assert!(w[1] >= w[0], "nu {nu} decreases: {:?}", w);
            }
            assert_relative_eq!(semivariance[semivariance.len() - 1], 1.0, epsilon = 1e-5);
        }
    }
}
