use log::debug;
use serde::{Deserialize, Serialize};

use super::state::{StateVector, OMEGA_M, OMEGA_P, R_M, R_P, THETA_M, THETA_P, V_M, V_P};
use crate::config::SimulationConfig;
use crate::error::SimResult;
use crate::physics::{kepler_central_gm, Body, BodyParams};
use crate::sim::integrator::OdeSystem;

// ---------------------------------------------------------------------------
// Model switches
// ---------------------------------------------------------------------------

/// Physics switches, passed explicitly to constant derivation and to the
/// right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Planet frozen: its derivatives are identically zero.
    pub only_mercury: bool,
    /// No mutual pull between the planet and Mercury.
    pub decoupled_mercury: bool,
    /// Relativistic correction on Mercury.
    pub gr_mercury: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            only_mercury: false,
            decoupled_mercury: false,
            gr_mercury: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Two-body perturbed model
// ---------------------------------------------------------------------------

/// Everything the right-hand side reads. Built once per run (or per
/// convergence sweep) and shared immutably.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecessionModel {
    pub planet: Body,
    pub mercury: Body,
    pub features: Features,
    pub central_gm: f64,
}

impl PrecessionModel {
    /// Build the model from a loaded configuration and both body records.
    ///
    /// The central gravitational parameter is `config.central_gm` when set,
    /// otherwise Kepler's third law applied to the planet's orbit.
    pub fn new(config: &SimulationConfig, planet: &BodyParams, mercury: &BodyParams) -> SimResult<Self> {
        config.validate()?;
        let central_gm = match config.central_gm {
            Some(gm) => gm,
            None => kepler_central_gm(planet)?,
        };
        Self::from_params(planet, mercury, central_gm, config.features(), config.light_speed)
    }

    pub fn from_params(
        planet: &BodyParams,
        mercury: &BodyParams,
        central_gm: f64,
        features: Features,
        light_speed: f64,
    ) -> SimResult<Self> {
        let planet = Body::derive(planet, central_gm, None)?;
        let relativity = features.gr_mercury.then_some(light_speed);
        let mercury = Body::derive(mercury, central_gm, relativity)?;

        for b in [&planet, &mercury] {
            debug!(
                "{}: r_min = {:.7}, r_max = {:.7}, v_max = {:.7}, L = {:.7}, GM = {:.12e}, GMR = {:.12e}",
                b.name, b.r_min, b.r_max, b.v_max, b.angular_momentum, b.gm, b.gmr
            );
        }

        Ok(Self {
            planet,
            mercury,
            features,
            central_gm,
        })
    }
}

impl OdeSystem<8> for PrecessionModel {
    fn derivatives(&self, y: &StateVector, t: f64) -> StateVector {
        derivatives(self, y, t)
    }
}

// ---------------------------------------------------------------------------
// Equations of motion (planar, polar coordinates)
// ---------------------------------------------------------------------------

/// Time derivative of the system state.
///
/// Each body obeys the two-body radial/angular equations about the central
/// mass:
///   dv/dt     = r omega^2 - mu / r^2
///   domega/dt = -2 v omega / r
/// plus the pull of the other body through
/// `alpha = GM_other / r_mp^3`, where `r_mp` is the separation from the law
/// of cosines. Mercury optionally carries the relativistic terms scaled by
/// `gmr`; they vanish identically when `gmr = 0`.
///
/// A collision (`r_mp -> 0`) or a body at the origin is a singular input and
/// yields non-finite values; the integrator reports those as divergence.
/// `t` is unused: the system is autonomous.
pub fn derivatives(model: &PrecessionModel, y: &StateVector, _t: f64) -> StateVector {
    let (r_p, theta_p, v_p, omega_p) = (y[R_P], y[THETA_P], y[V_P], y[OMEGA_P]);
    let (r_m, theta_m, v_m, omega_m) = (y[R_M], y[THETA_M], y[V_M], y[OMEGA_M]);
    let planet = &model.planet;
    let mercury = &model.mercury;
    let features = model.features;

    let theta_mp = theta_m - theta_p;
    let (sin_mp, cos_mp) = theta_mp.sin_cos();

    let (alpha_p, alpha_m) = if features.decoupled_mercury {
        (0.0, 0.0)
    } else {
        let r_mp = (r_m * r_m + r_p * r_p - 2.0 * r_m * r_p * cos_mp).sqrt();
        let r_mp3 = r_mp * r_mp * r_mp;
        (planet.gm / r_mp3, mercury.gm / r_mp3)
    };

    let mut dy = StateVector::zeros();

    if !features.only_mercury {
        dy[R_P] = v_p;
        dy[THETA_P] = omega_p;
        dy[V_P] = r_p * omega_p * omega_p
            - planet.mu / (r_p * r_p)
            - alpha_m * (r_p - r_m * cos_mp);
        dy[OMEGA_P] = (-2.0 * v_p * omega_p) / r_p + alpha_m * (r_m / r_p) * sin_mp;
    }

    let mut dv_m = r_m * omega_m * omega_m - mercury.mu / (r_m * r_m);
    let mut domega_m = (-2.0 * v_m * omega_m) / r_m;

    if features.gr_mercury {
        let gmr = mercury.gmr;
        let r_red2 = r_m - 2.0 * gmr;
        let r_red3 = r_m - 3.0 * gmr;
        dv_m -= 2.0 * gmr * omega_m * omega_m;
        dv_m += (2.0 * mercury.mu * gmr) / (r_m * r_m * r_m);
        dv_m += (3.0 * gmr * v_m * v_m) / (r_m * r_red2);
        domega_m *= r_red3 / r_red2;
    }

    dv_m -= alpha_p * (r_m - r_p * cos_mp);
    domega_m -= alpha_p * (r_p / r_m) * sin_mp;

    dy[R_M] = v_m;
    dy[THETA_M] = omega_m;
    dy[V_M] = dv_m;
    dy[OMEGA_M] = domega_m;
    dy
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
