use std::f64::consts::TAU;

use nalgebra::Vector2;
use serde::Serialize;

use crate::dynamics::BodyState;

/// Planar osculating elements of one body about the central mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OsculatingElements {
    pub sma: f64,       // semi-major axis
    pub ecc: f64,       // eccentricity
    pub argp: f64,      // longitude of perihelion in [0, 2 pi)
    pub true_anom: f64, // angle from perihelion in [0, 2 pi)
}

impl OsculatingElements {
    /// Elements of the Keplerian orbit tangent to `state` under `mu`.
    pub fn from_state(state: &BodyState, mu: f64) -> Self {
        let pos = state.position();
        let vel = state.velocity();
        Self::from_cartesian(&pos, &vel, mu)
    }

    pub fn from_cartesian(pos: &Vector2<f64>, vel: &Vector2<f64>, mu: f64) -> Self {
        let r = pos.norm();
        let v2 = vel.norm_squared();
        let e_vec = eccentricity_vector(pos, vel, mu);
        let ecc = e_vec.norm();

        // Vis-viva energy
        let energy = 0.5 * v2 - mu / r;
        let sma = -mu / (2.0 * energy);

        let argp = if ecc > 1e-12 {
            e_vec.y.atan2(e_vec.x).rem_euclid(TAU)
        } else {
            0.0
        };
        let true_anom = (pos.y.atan2(pos.x) - argp).rem_euclid(TAU);

        Self {
            sma,
            ecc,
            argp,
            true_anom,
        }
    }

    pub fn r_min(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    pub fn r_max(&self) -> f64 {
        self.sma * (1.0 + self.ecc)
    }
}

/// Eccentricity (Laplace-Runge-Lenz) vector: points at perihelion, length
/// `e`. Constant on a Keplerian orbit, so it isolates apsidal drift.
pub fn eccentricity_vector(pos: &Vector2<f64>, vel: &Vector2<f64>, mu: f64) -> Vector2<f64> {
    let r = pos.norm();
    ((vel.norm_squared() - mu / r) * pos - pos.dot(vel) * vel) / mu
}

/// [`eccentricity_vector`] of a polar state.
pub fn state_eccentricity_vector(state: &BodyState, mu: f64) -> Vector2<f64> {
    eccentricity_vector(&state.position(), &state.velocity(), mu)
}
