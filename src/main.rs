use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

use precession::dynamics::{initial_state, BodyId, BodyState, PrecessionModel};
use precession::io::{csv, json::RunSummary, write_summary_file};
use precession::orbital::{state_eccentricity_vector, OrbitReport, PrecessionEstimate};
use precession::physics::{presets, BodyParams};
use precession::sim::{convergence_test, solve, ConvergenceSummary, Run};
use precession::SimulationConfig;

const MERCURY_ECCENTRICITY_VECTOR: &str = "mercuryEccentricityVector";

#[derive(Parser, Debug)]
#[command(version, about = "Integrate Mercury's orbit under a perturbing planet and relativity")]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Perturbing planet: a YAML body file or a preset name
    #[arg(short, long, default_value = "jupiter.yml")]
    planet: String,

    /// Mercury: a YAML body file or a preset name (built-in Mercury if omitted)
    #[arg(short, long)]
    mercury: Option<String>,

    /// Directory for the summary and trajectory files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write trajectories as CSV
    #[arg(long)]
    csv: bool,
}

/// A body from a file if it exists, otherwise a preset named after the
/// argument's file stem.
fn load_body(arg: &str) -> Result<BodyParams> {
    let path = Path::new(arg);
    if path.is_file() {
        return BodyParams::load(path).with_context(|| format!("failed to load body file {arg}"));
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(arg);
    presets::by_name(stem).ok_or_else(|| anyhow!("{arg} is neither a body file nor a known preset"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = SimulationConfig::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let planet = load_body(&args.planet)?;
    let mercury = match &args.mercury {
        Some(arg) => load_body(arg)?,
        None => presets::mercury(),
    };

    let model = PrecessionModel::new(&config, &planet, &mercury).context("invalid physical model")?;
    let method = config.method()?;
    let initial = initial_state(&model);
    let limits = config.limits();

    // -----------------------------------------------------------------------
    // Integrate
    // -----------------------------------------------------------------------
    let (runs, convergence): (Vec<Run<8>>, Option<ConvergenceSummary>) = if config.enable_convergence_test {
        let report = convergence_test(method, &model, &initial, config.dt, config.dt_factor, limits)
            .context("convergence sweep failed")?;
        let mu = model.mercury.mu;
        let apsidal = report.observable_norms(|y| state_eccentricity_vector(&BodyState::of(y, BodyId::Mercury), mu));
        let summary = report.summary().with_observable(MERCURY_ECCENTRICITY_VECTOR, apsidal);
        (report.runs.into(), Some(summary))
    } else {
        let run = solve(method, &model, &initial, config.dt, limits).context("integration failed")?;
        (vec![run], None)
    };
    let base = &runs[0];

    // -----------------------------------------------------------------------
    // Report
    // -----------------------------------------------------------------------
    let report = OrbitReport::build(&model, &config, base);
    print_report(&model, base, &report, convergence.as_ref());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    let mut summary = RunSummary::new(method, &model, &config, base).with_report(report);
    if let Some(c) = convergence {
        summary = summary.with_convergence(c);
    }
    let summary_path = args.output_dir.join(format!("{}_summary.json", config.file_prefix));
    write_summary_file(&summary_path, &summary)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;
    info!("summary written to {}", summary_path.display());

    if args.csv {
        for (i, run) in runs.iter().enumerate() {
            let name = match i {
                0 => format!("{}_trajectory.csv", config.file_prefix),
                _ => format!("{}_trajectory_dt{i}.csv", config.file_prefix),
            };
            let path = args.output_dir.join(name);
            csv::write_trajectory_file(&path, &run.trajectory, run.dt, config.batch_steps)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("trajectory written to {}", path.display());
        }
    }

    Ok(())
}

fn print_report(
    model: &PrecessionModel,
    run: &Run<8>,
    report: &OrbitReport,
    convergence: Option<&ConvergenceSummary>,
) {
    let rule = "  ──────────────────────────────────────────────────────────────────";

    println!();
    println!("====================================================================");
    println!("  PERIHELION PRECESSION: Mercury with {}", model.planet.name);
    println!("====================================================================");
    println!();
    println!("  Bodies");
    println!("{rule}");
    println!(
        "  {:<10} {:>12} {:>12} {:>12} {:>14}",
        "", "r_min (AU)", "r_max (AU)", "v_max", "GMR"
    );
    for b in [&model.planet, &model.mercury] {
        println!(
            "  {:<10} {:>12.7} {:>12.7} {:>12.7} {:>14.6e}",
            b.name, b.r_min, b.r_max, b.v_max, b.gmr
        );
    }
    println!(
        "  Central GM: {:.7}   only Mercury: {}   decoupled: {}   GR: {}",
        model.central_gm, model.features.only_mercury, model.features.decoupled_mercury, model.features.gr_mercury
    );
    println!();

    println!("  Run");
    println!("{rule}");
    println!(
        "  {} steps of dt = {} yr, {:.4} yr simulated{}",
        run.steps,
        run.dt,
        run.elapsed,
        if run.stopped_early { " (stopped early)" } else { "" }
    );
    println!();

    println!("  Mercury Perihelia");
    println!("{rule}");
    println!("  {:>12}  {:>12}  {:>14}", "t (yr)", "r (AU)", "longitude (rad)");
    let late: Vec<_> = report
        .late_perihelia
        .iter()
        .filter(|p| !report.early_perihelia.contains(*p))
        .collect();
    for p in report.early_perihelia.iter().chain(late) {
        println!("  {:>12.6}  {:>12.9}  {:>14.9}", p.time, p.radius, p.longitude);
    }
    match report.precession {
        Some(PrecessionEstimate { passages, drift, arcsec_per_century, .. }) => println!(
            "  {passages} passages, drift {drift:.6e} rad, {arcsec_per_century:.3} arcsec/century"
        ),
        None => println!("  fewer than two perihelion passages"),
    }
    if !report.planet_excursions.is_empty() {
        println!(
            "  {} planet samples outside tolerance in the final window",
            report.planet_excursions.len()
        );
    }
    println!();

    if let Some(c) = convergence {
        println!("  Convergence");
        println!("{rule}");
        println!(
            "  dt = {:?}   aligned samples: {}",
            c.step_sizes, c.aligned_samples
        );
        println!(
            "  |d(h, kh)| = {:.6e}   |d(kh, k²h)| = {:.6e}",
            c.fine_norm, c.coarse_norm
        );
        println!(
            "  state ratio {:.4} (expected {:.0}), observed order {:.4}",
            c.ratio, c.expected_ratio, c.observed_order
        );
        let labels = ["r_p", "theta_p", "v_p", "omega_p", "r_m", "theta_m", "v_m", "omega_m"];
        for (label, p) in labels.iter().zip(&c.components) {
            println!("    {label:<8} ratio {:>10.4}   order {:>7.4}", p.ratio, p.observed_order);
        }
        for (name, p) in &c.observables {
            println!(
                "  {name}: ratio {:.4}, observed order {:.4} ({:.3e} / {:.3e})",
                p.ratio, p.observed_order, p.coarse_norm, p.fine_norm
            );
        }
        println!();
    }
    println!("====================================================================");
    println!();
}
