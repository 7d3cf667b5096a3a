use std::fmt;
use std::str::FromStr;

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::error::{PrecessionError, SimResult};

// ---------------------------------------------------------------------------
// Right-hand side interface
// ---------------------------------------------------------------------------

/// An autonomous or time-dependent first-order system dy/dt = f(y, t).
///
/// Implementations must be pure: the integrator calls `derivatives` four
/// times per step and assumes identical inputs give identical outputs.
pub trait OdeSystem<const N: usize> {
    fn derivatives(&self, y: &SVector<f64, N>, t: f64) -> SVector<f64, N>;
}

impl<const N: usize, F> OdeSystem<N> for F
where
    F: Fn(&SVector<f64, N>, f64) -> SVector<f64, N>,
{
    fn derivatives(&self, y: &SVector<f64, N>, t: f64) -> SVector<f64, N> {
        self(y, t)
    }
}

// ---------------------------------------------------------------------------
// Method selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    RungeKutta4,
}

impl FromStr for IntegrationMethod {
    type Err = PrecessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RungeKutta4" | "rk4" | "RK4" => Ok(Self::RungeKutta4),
            other => Err(PrecessionError::UnknownIntegrationMethod(other.to_string())),
        }
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RungeKutta4 => f.write_str("RungeKutta4"),
        }
    }
}

impl IntegrationMethod {
    /// Advance `y` from `t` to `t + h`.
    pub fn step<const N: usize, S: OdeSystem<N> + ?Sized>(
        self,
        system: &S,
        y: &SVector<f64, N>,
        t: f64,
        h: f64,
    ) -> SimResult<SVector<f64, N>> {
        match self {
            Self::RungeKutta4 => rk4_step(system, y, t, h),
        }
    }

    /// Theoretical global order of accuracy.
    pub const fn order(self) -> u32 {
        match self {
            Self::RungeKutta4 => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Classical 4th-order Runge-Kutta
// ---------------------------------------------------------------------------

fn ensure_finite<const N: usize>(v: &SVector<f64, N>, time: f64, stage: &'static str) -> SimResult<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(PrecessionError::NumericalDivergence { time, stage })
    }
}

/// Single RK4 step: advance `y` by `h`.
///
///   k1 = h f(y, t)
///   k2 = h f(y + k1/2, t + h/2)
///   k3 = h f(y + k2/2, t + h/2)
///   k4 = h f(y + k3, t + h)
///   y' = y + (k1 + 2 k2 + 2 k3 + k4) / 6
///
/// Negative `h` integrates backwards. Any non-finite stage or result is
/// reported as `NumericalDivergence` instead of being propagated.
pub fn rk4_step<const N: usize, S: OdeSystem<N> + ?Sized>(
    system: &S,
    y: &SVector<f64, N>,
    t: f64,
    h: f64,
) -> SimResult<SVector<f64, N>> {
    let half = h * 0.5;

    let k1 = system.derivatives(y, t) * h;
    ensure_finite(&k1, t, "derivative k1")?;
    let k2 = system.derivatives(&(y + k1 * 0.5), t + half) * h;
    ensure_finite(&k2, t + half, "derivative k2")?;
    let k3 = system.derivatives(&(y + k2 * 0.5), t + half) * h;
    ensure_finite(&k3, t + half, "derivative k3")?;
    let k4 = system.derivatives(&(y + k3), t + h) * h;
    ensure_finite(&k4, t + h, "derivative k4")?;

    let next = y + (k1 + k2 * 2.0 + k3 * 2.0 + k4) / 6.0;
    ensure_finite(&next, t + h, "state")?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector1, Vector2, Vector3};

    #[test]
    fn constant_derivative_is_exact() {
        let c = Vector3::new(1.5, -2.0, 0.25);
        let f = move |_: &Vector3<f64>, _: f64| c;
        let y = Vector3::new(10.0, 20.0, 30.0);
        let h = 0.125;
        let next = rk4_step(&f, &y, 0.0, h).unwrap();
        assert!((next - (y + c * h)).norm() < 1e-14, "{next}");
    }

    #[test]
    fn linear_time_derivative_is_exact() {
        // dy/dt = t, y(0) = 0  =>  y(h) = h^2 / 2
        let f = |_: &Vector1<f64>, t: f64| Vector1::new(t);
        let next = rk4_step(&f, &Vector1::new(0.0), 0.0, 0.5).unwrap();
        assert!((next[0] - 0.125).abs() < 1e-15);
    }

    #[test]
    fn local_error_is_fifth_order() {
        // dy/dt = y, exact y(h) = e^h
        let f = |y: &Vector1<f64>, _: f64| *y;
        let err = |h: f64| (rk4_step(&f, &Vector1::new(1.0), 0.0, h).unwrap()[0] - h.exp()).abs();
        let ratio = err(0.1) / err(0.05);
        // 2^5 = 32 asymptotically
        assert!(ratio > 28.0 && ratio < 36.0, "ratio {ratio}");
    }

    #[test]
    fn forward_then_backward_returns_near_start() {
        // Harmonic oscillator
        let f = |y: &Vector2<f64>, _: f64| Vector2::new(y[1], -y[0]);
        let y0 = Vector2::new(1.0, 0.0);
        for h in [0.1, 0.05] {
            let fwd = rk4_step(&f, &y0, 0.0, h).unwrap();
            let back = rk4_step(&f, &fwd, h, -h).unwrap();
            let err = (back - y0).norm();
            assert!(err < 10.0 * h.powi(5), "h = {h}: err {err:e}");
        }
    }

    #[test]
    fn non_finite_derivative_is_divergence() {
        let f = |y: &Vector1<f64>, _: f64| Vector1::new(1.0 / (y[0] - 1.0));
        let err = rk4_step(&f, &Vector1::new(1.0), 2.0, 0.1).unwrap_err();
        assert!(
            matches!(err, PrecessionError::NumericalDivergence { stage: "derivative k1", time } if time == 2.0),
            "{err:?}"
        );
    }

    #[test]
    fn overflow_in_result_is_divergence() {
        let f = |_: &Vector1<f64>, _: f64| Vector1::new(f64::MAX);
        let err = rk4_step(&f, &Vector1::new(f64::MAX), 0.0, 1.0).unwrap_err();
        assert!(matches!(err, PrecessionError::NumericalDivergence { .. }));
    }

    #[test]
    fn method_names() {
        assert_eq!("RungeKutta4".parse::<IntegrationMethod>().unwrap(), IntegrationMethod::RungeKutta4);
        assert_eq!("rk4".parse::<IntegrationMethod>().unwrap(), IntegrationMethod::RungeKutta4);
        let err = "Euler".parse::<IntegrationMethod>().unwrap_err();
        assert!(matches!(err, PrecessionError::UnknownIntegrationMethod(ref m) if m == "Euler"));
        assert_eq!(IntegrationMethod::RungeKutta4.to_string(), "RungeKutta4");
    }
}
