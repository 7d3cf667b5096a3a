//! Run configuration loaded from YAML.
//!
//! Keys use camelCase
//! (`tEnd`, `maxSteps`, `grMercury`, ...). Unknown keys are accepted and
//! kept, so older or newer files load and save without loss.
//!
//! ```yaml
//! tEnd: 450
//! maxSteps: 10000000
//! batchSteps: 10000
//! filePrefix: precession
//! onlyMercury: false
//! decoupledMercury: false
//! grMercury: true
//! enableConvergenceTest: true
//! dt: 0.00005
//! dtFactor: 2
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dynamics::Features;
use crate::error::{PrecessionError, SimResult};
use crate::io::yaml;
use crate::sim::{IntegrationMethod, RunLimits};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Simulated time bound, years.
    pub t_end: f64,
    /// Trajectory capacity including the initial state.
    pub max_steps: usize,
    /// Rows per flush when writing trajectories.
    pub batch_steps: usize,
    pub file_prefix: String,
    pub only_mercury: bool,
    pub decoupled_mercury: bool,
    pub gr_mercury: bool,
    pub enable_convergence_test: bool,
    /// Base step size, years.
    pub dt: f64,
    /// Refinement factor k of the convergence sweep.
    pub dt_factor: usize,
    /// Radius tolerance for excursion reports, AU.
    pub target_tolerance: f64,
    pub method: String,
    /// Central gravitational parameter. Unset means: derive it from the
    /// planet's period and semi-major axis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub central_gm: Option<f64>,
    /// Speed of light in AU/yr, scales the relativistic term.
    pub light_speed: f64,
    /// Length of the first and last perihelion windows, years.
    pub report_window: f64,
    /// Length of the final window checked for planet excursions, years.
    pub excursion_window: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_end: 1.0,
            max_steps: 1,
            batch_steps: 1,
            file_prefix: "precession".into(),
            only_mercury: false,
            decoupled_mercury: false,
            gr_mercury: true,
            enable_convergence_test: true,
            dt: 0.00005,
            dt_factor: 2,
            target_tolerance: 1.0e-7,
            method: IntegrationMethod::RungeKutta4.to_string(),
            central_gm: None,
            light_speed: 6.25e4,
            report_window: 50.0,
            excursion_window: 100.0,
            extra: BTreeMap::new(),
        }
    }
}

impl SimulationConfig {
    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let config: Self = yaml::load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> SimResult<Self> {
        let config: Self = yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_value(value: serde_yaml::Value) -> SimResult<Self> {
        let config: Self = yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        yaml::save(path, self)
    }

    pub fn to_yaml(&self) -> SimResult<String> {
        yaml::to_string(self)
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> SimResult<()> {
        if self.t_end.is_nan() || self.t_end < 0.0 {
            return Err(PrecessionError::invalid_config(format!(
                "tEnd must be non-negative, got {}",
                self.t_end
            )));
        }
        if self.max_steps == 0 {
            return Err(PrecessionError::invalid_config("maxSteps must be at least 1"));
        }
        if self.batch_steps == 0 {
            return Err(PrecessionError::invalid_config("batchSteps must be at least 1"));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(PrecessionError::invalid_config(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if self.dt_factor < 2 {
            return Err(PrecessionError::invalid_config(format!(
                "dtFactor must be at least 2, got {}",
                self.dt_factor
            )));
        }
        if !(self.light_speed.is_finite() && self.light_speed > 0.0) {
            return Err(PrecessionError::invalid_config(format!(
                "lightSpeed must be positive, got {}",
                self.light_speed
            )));
        }
        if let Some(gm) = self.central_gm {
            if !(gm.is_finite() && gm > 0.0) {
                return Err(PrecessionError::invalid_config(format!(
                    "centralGm must be positive, got {gm}"
                )));
            }
        }
        if self.target_tolerance.is_nan() || self.target_tolerance < 0.0 {
            return Err(PrecessionError::invalid_config("targetTolerance must be non-negative"));
        }
        Ok(())
    }

    pub fn features(&self) -> Features {
        Features {
            only_mercury: self.only_mercury,
            decoupled_mercury: self.decoupled_mercury,
            gr_mercury: self.gr_mercury,
        }
    }

    pub fn method(&self) -> SimResult<IntegrationMethod> {
        self.method.parse()
    }

    pub fn limits(&self) -> RunLimits {
        RunLimits::new(self.t_end, self.max_steps)
    }
}
