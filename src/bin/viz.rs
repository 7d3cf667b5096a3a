use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points};

use precession::dynamics::{initial_state, BodyId, BodyState, PrecessionModel};
use precession::orbital::{
    cartesian_track, find_apsides, unwrapped_longitudes, Apsis, ApsisRecord, PrecessionEstimate,
};
use precession::physics::presets;
use precession::sim::{solve, Run};
use precession::{SimResult, SimulationConfig};

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = match simulate(std::env::args().nth(1)) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("precession-viz: {e}");
            std::process::exit(1);
        }
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Perihelion Precession", options, Box::new(|_| Ok(Box::new(app))))
}

/// Run the configured problem once at the base step. Without a config
/// path, ten years of Mercury and Jupiter at dt = 1e-4.
fn simulate(config_path: Option<String>) -> SimResult<SimViz> {
    let config = match config_path {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig {
            t_end: 10.0,
            max_steps: 1_000_000,
            dt: 1.0e-4,
            ..Default::default()
        },
    };
    let model = PrecessionModel::new(&config, &presets::jupiter(), &presets::mercury())?;
    let run = solve(config.method()?, &model, &initial_state(&model), config.dt, config.limits())?;
    let perihelia = find_apsides(&run.trajectory, run.dt, BodyId::Mercury, Apsis::Perihelion);
    let estimate = PrecessionEstimate::from_passages(&perihelia);
    Ok(SimViz {
        model,
        run,
        perihelia,
        estimate,
    })
}

struct SimViz {
    model: PrecessionModel,
    run: Run<8>,
    perihelia: Vec<ApsisRecord>,
    estimate: Option<PrecessionEstimate>,
}

impl SimViz {
    /// Perihelion longitude relative to the first passage, unwrapped, in
    /// arcseconds.
    fn drift_points(&self) -> Vec<[f64; 2]> {
        let longitudes = unwrapped_longitudes(&self.perihelia);
        let Some(&first) = longitudes.first() else {
            return Vec::new();
        };
        self.perihelia
            .iter()
            .zip(&longitudes)
            .map(|(p, l)| [p.time, (l - first).to_degrees() * 3600.0])
            .collect()
    }
}

impl eframe::App for SimViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.run.trajectory.len() / 4000).max(1);
        let sampled: Vec<_> = self.run.trajectory.iter().step_by(step).copied().collect();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading(format!("Mercury with {}", self.model.planet.name));
            let rate = self
                .estimate
                .map_or("n/a".to_string(), |e| format!("{:.2} arcsec/century", e.arcsec_per_century));
            ui.label(format!(
                "Simulated: {:.2} yr  |  Steps: {}  |  dt: {}  |  GR: {}  |  Perihelia: {}  |  Precession: {}",
                self.run.elapsed,
                self.run.steps,
                self.run.dt,
                self.model.features.gr_mercury,
                self.perihelia.len(),
                rate,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Both orbits in the plane
                ui.vertical(|ui| {
                    ui.label("Orbits (AU)");
                    let mercury: PlotPoints = cartesian_track(&sampled, BodyId::Mercury).into();
                    let planet: PlotPoints = cartesian_track(&sampled, BodyId::Planet).into();
                    Plot::new("orbits")
                        .width(half_w)
                        .height(available.y - 16.0)
                        .data_aspect(1.0)
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Mercury", mercury));
                            if !self.model.features.only_mercury {
                                plot_ui.line(Line::new(self.model.planet.name.as_str(), planet));
                            }
                            plot_ui.points(Points::new("Sun", vec![[0.0, 0.0]]).radius(4.0));
                        });
                });

                ui.vertical(|ui| {
                    // Mercury's radius vs time
                    ui.label("Mercury radius (AU)");
                    let points: PlotPoints = sampled
                        .iter()
                        .enumerate()
                        .map(|(i, y)| [(i * step) as f64 * self.run.dt, BodyState::of(y, BodyId::Mercury).r])
                        .collect();
                    Plot::new("radius")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (yr)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("r", points));
                        });

                    // Perihelion longitude drift
                    ui.label("Perihelion drift (arcsec)");
                    let drift = self.drift_points();
                    Plot::new("drift")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (yr)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("drift", PlotPoints::from(drift.clone())));
                            plot_ui.points(Points::new("passages", drift).radius(2.0));
                        });
                });
            });
        });
    }
}
