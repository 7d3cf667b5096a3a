use std::f64::consts::PI;

use nalgebra::{SVector, Vector2};

use super::equations::PrecessionModel;

// ---------------------------------------------------------------------------
// State vector layout
// ---------------------------------------------------------------------------

/// Number of scalar equations in the coupled system.
pub const N_EQUATIONS: usize = 8;

/// System state, ordered
/// `[r_p, theta_p, v_p, omega_p, r_m, theta_m, v_m, omega_m]`
/// where `v = dr/dt` and `omega = dtheta/dt`, planet first.
///
/// Every consumer indexes positionally, so this order is fixed.
pub type StateVector = SVector<f64, N_EQUATIONS>;

/// Append-only sequence of states; entry `i` is the state at `i * dt`.
pub type Trajectory = Vec<StateVector>;

pub const R_P: usize = 0;
pub const THETA_P: usize = 1;
pub const V_P: usize = 2;
pub const OMEGA_P: usize = 3;
pub const R_M: usize = 4;
pub const THETA_M: usize = 5;
pub const V_M: usize = 6;
pub const OMEGA_M: usize = 7;

/// Which of the two bodies a slice of the state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyId {
    Planet,
    Mercury,
}

impl BodyId {
    /// Index of the body's radius; the other three fields follow it.
    pub const fn offset(self) -> usize {
        match self {
            BodyId::Planet => R_P,
            BodyId::Mercury => R_M,
        }
    }
}

// ---------------------------------------------------------------------------
// Polar view of one body
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub r: f64,
    pub theta: f64,
    pub v: f64,     // radial velocity dr/dt
    pub omega: f64, // angular velocity dtheta/dt
}

impl BodyState {
    pub fn of(state: &StateVector, body: BodyId) -> Self {
        let i = body.offset();
        Self {
            r: state[i],
            theta: state[i + 1],
            v: state[i + 2],
            omega: state[i + 3],
        }
    }

    /// Position in the orbital plane: (r cos theta, r sin theta).
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.r * self.theta.cos(), self.r * self.theta.sin())
    }

    /// Cartesian velocity from the radial and tangential components.
    pub fn velocity(&self) -> Vector2<f64> {
        let (s, c) = self.theta.sin_cos();
        let vt = self.r * self.omega;
        Vector2::new(self.v * c - vt * s, self.v * s + vt * c)
    }

    /// Specific angular momentum r^2 omega.
    pub fn angular_momentum(&self) -> f64 {
        self.r * self.r * self.omega
    }
}

// ---------------------------------------------------------------------------
// Initial conditions
// ---------------------------------------------------------------------------

/// Both bodies start at perihelion, half a turn apart: the planet at
/// `theta = pi`, Mercury at `theta = 0`, each with zero radial velocity.
/// With `only_mercury` set the planet's slots are all zero.
pub fn initial_state(model: &PrecessionModel) -> StateVector {
    let m = &model.mercury;
    let p = &model.planet;
    let (r_p, theta_p, omega_p) = if model.features.only_mercury {
        (0.0, 0.0, 0.0)
    } else {
        (p.r_min, PI, p.perihelion_omega())
    };
    StateVector::from([
        r_p,
        theta_p,
        0.0,
        omega_p,
        m.r_min,
        0.0,
        0.0,
        m.perihelion_omega(),
    ])
}
