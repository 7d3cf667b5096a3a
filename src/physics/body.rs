use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PrecessionError, SimResult};
use crate::io::yaml;

// ---------------------------------------------------------------------------
// Raw body parameters (one YAML body file)
// ---------------------------------------------------------------------------

/// Orbital parameters of one body, in normalized units
/// (solar masses, years, AU).
///
/// Keys the crate does not know about are kept in `extra` and written
/// back on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyParams {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub mass: f64,
    #[serde(default, alias = "T", skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,
    #[serde(default, alias = "e")]
    pub eccentricity: f64,
    #[serde(default, alias = "a")]
    pub semi_major_axis: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_name() -> String {
    "unknown".into()
}

impl Default for BodyParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            mass: 0.0,
            period: None,
            eccentricity: 0.0,
            semi_major_axis: 0.0,
            extra: BTreeMap::new(),
        }
    }
}

impl BodyParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn mass(mut self, v: f64) -> Self { self.mass = v; self }
    pub fn period(mut self, v: f64) -> Self { self.period = Some(v); self }
    pub fn eccentricity(mut self, v: f64) -> Self { self.eccentricity = v; self }
    pub fn semi_major_axis(mut self, v: f64) -> Self { self.semi_major_axis = v; self }

    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        yaml::load(path)
    }

    pub fn from_yaml(text: &str) -> SimResult<Self> {
        yaml::from_str(text)
    }

    pub fn from_value(value: serde_yaml::Value) -> SimResult<Self> {
        yaml::from_value(value)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        yaml::save(path, self)
    }
}

// ---------------------------------------------------------------------------
// Derived body record
// ---------------------------------------------------------------------------

/// A body with every derived constant computed once.
///
/// Only [`Body::derive`] builds one, so a `Body` always satisfies
/// `0 < r_min <= semi_major_axis <= r_max` and `v_max > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub mass: f64,
    pub period: Option<f64>,
    pub eccentricity: f64,
    pub semi_major_axis: f64,
    pub r_min: f64,            // perihelion radius a(1-e)
    pub r_max: f64,            // aphelion radius a(1+e)
    pub v_max: f64,            // speed at perihelion
    pub angular_momentum: f64, // per unit mass, r_min * v_max
    pub gm: f64,               // this body's own gravitational parameter, pulls on the other body
    pub mu: f64,               // two-body parameter central_gm * (1 + mass)
    pub central_gm: f64,
    pub gmr: f64,              // relativistic length scale, zero when GR is off
}

impl Body {
    /// Derive all constants from raw parameters.
    ///
    /// `light_speed` enables the relativistic correction for this body;
    /// `None` forces `gmr = 0`.
    pub fn derive(params: &BodyParams, central_gm: f64, light_speed: Option<f64>) -> SimResult<Self> {
        let name = params.name.as_str();
        let a = params.semi_major_axis;
        let e = params.eccentricity;
        let m = params.mass;

        if !(central_gm.is_finite() && central_gm > 0.0) {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("central gravitational parameter {central_gm} must be positive"),
            ));
        }
        if !(a.is_finite() && a > 0.0) {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("semi-major axis {a} must be positive"),
            ));
        }
        if !e.is_finite() || e < 0.0 {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("eccentricity {e} must be non-negative"),
            ));
        }
        if e >= 1.0 {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("eccentricity {e} >= 1 is not a bound orbit"),
            ));
        }
        if !m.is_finite() || m < 0.0 {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("mass {m} must be non-negative"),
            ));
        }

        let r_min = a * (1.0 - e);
        let r_max = a * (1.0 + e);
        if r_min <= 0.0 {
            return Err(PrecessionError::invalid_orbit(
                name,
                format!("perihelion radius {r_min} must be positive"),
            ));
        }

        // Vis-viva at perihelion: v^2 = mu (1 + e) / r_min
        let mu = central_gm * (1.0 + m);
        let v_max = (((1.0 + e) * (1.0 + m)) / r_min * central_gm).sqrt();

        let gmr = match light_speed {
            Some(c) if c.is_finite() && c > 0.0 => central_gm / (c * c),
            Some(c) => {
                return Err(PrecessionError::invalid_config(format!(
                    "light speed {c} must be positive"
                )))
            }
            None => 0.0,
        };

        Ok(Self {
            name: params.name.clone(),
            mass: m,
            period: params.period,
            eccentricity: e,
            semi_major_axis: a,
            r_min,
            r_max,
            v_max,
            angular_momentum: r_min * v_max,
            gm: central_gm * m,
            mu,
            central_gm,
            gmr,
        })
    }

    pub fn is_relativistic(&self) -> bool {
        self.gmr != 0.0
    }

    /// Angular velocity at perihelion.
    pub fn perihelion_omega(&self) -> f64 {
        self.v_max / self.r_min
    }

    /// Keplerian period implied by `mu` and the semi-major axis.
    pub fn kepler_period(&self) -> f64 {
        2.0 * PI * (self.semi_major_axis.powi(3) / self.mu).sqrt()
    }
}

/// Central gravitational parameter implied by a body's period and
/// semi-major axis (Kepler's third law, 4 pi^2 a^3 / T^2).
pub fn kepler_central_gm(params: &BodyParams) -> SimResult<f64> {
    let a = params.semi_major_axis;
    let period = params.period.ok_or_else(|| {
        PrecessionError::invalid_orbit(
            &params.name,
            "orbital period is required to derive the central gravitational parameter",
        )
    })?;
    if !(period.is_finite() && period > 0.0) {
        return Err(PrecessionError::invalid_orbit(
            &params.name,
            format!("orbital period {period} must be positive"),
        ));
    }
    if !(a.is_finite() && a > 0.0) {
        return Err(PrecessionError::invalid_orbit(
            &params.name,
            format!("semi-major axis {a} must be positive"),
        ));
    }
    let v = 2.0 * PI * a / period;
    Ok(a * v * v)
}
