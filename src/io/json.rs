use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::dynamics::{BodyId, BodyState, Features, PrecessionModel};
use crate::error::SimResult;
use crate::orbital::{OrbitReport, OsculatingElements};
use crate::sim::{ConvergenceSummary, IntegrationMethod, Run};

/// Derived constants of one body as they enter the equations.
#[derive(Debug, Clone, Serialize)]
pub struct BodySummary {
    pub name: String,
    pub mass: f64,
    pub r_min: f64,
    pub r_max: f64,
    pub v_max: f64,
    pub angular_momentum: f64,
    pub gm: f64,
    pub mu: f64,
    pub gmr: f64,
    /// Osculating elements at the last stored state.
    pub final_elements: OsculatingElements,
}

/// Everything a run reports, in one document.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub method: IntegrationMethod,
    pub features: Features,
    pub central_gm: f64,
    pub dt: f64,
    pub t_end: f64,
    pub steps: usize,
    pub elapsed: f64,
    pub stopped_early: bool,
    pub planet: BodySummary,
    pub mercury: BodySummary,
    pub final_state: [f64; 8],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<OrbitReport>,
}

impl RunSummary {
    /// Summarize `run`, the base-step solution of `model`.
    pub fn new(
        method: IntegrationMethod,
        model: &PrecessionModel,
        config: &SimulationConfig,
        run: &Run<8>,
    ) -> Self {
        let last = run.final_state();
        let body = |id: BodyId| {
            let b = match id {
                BodyId::Planet => &model.planet,
                BodyId::Mercury => &model.mercury,
            };
            BodySummary {
                name: b.name.clone(),
                mass: b.mass,
                r_min: b.r_min,
                r_max: b.r_max,
                v_max: b.v_max,
                angular_momentum: b.angular_momentum,
                gm: b.gm,
                mu: b.mu,
                gmr: b.gmr,
                final_elements: OsculatingElements::from_state(&BodyState::of(last, id), b.mu),
            }
        };

        let mut final_state = [0.0; 8];
        final_state.copy_from_slice(last.as_slice());

        Self {
            method,
            features: model.features,
            central_gm: model.central_gm,
            dt: run.dt,
            t_end: config.t_end,
            steps: run.steps,
            elapsed: run.elapsed,
            stopped_early: run.stopped_early,
            planet: body(BodyId::Planet),
            mercury: body(BodyId::Mercury),
            final_state,
            convergence: None,
            report: None,
        }
    }

    pub fn with_convergence(mut self, summary: ConvergenceSummary) -> Self {
        self.convergence = Some(summary);
        self
    }

    pub fn with_report(mut self, report: OrbitReport) -> Self {
        self.report = Some(report);
        self
    }
}

/// Write the run summary as pretty-printed JSON.
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> SimResult<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the run summary JSON to a file.
pub fn write_summary_file<P: AsRef<Path>>(path: P, summary: &RunSummary) -> SimResult<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_summary(&mut file, summary)
}
