use log::{info, warn};
use nalgebra::SVector;

use super::integrator::{IntegrationMethod, OdeSystem};
use super::stop::{NeverStop, StopCondition};
use crate::error::{PrecessionError, SimResult};

// Pre-allocation ceiling; longer runs grow the buffer as they go.
const MAX_PREALLOCATED_STATES: usize = 1 << 20;

// ---------------------------------------------------------------------------
// Run limits and result
// ---------------------------------------------------------------------------

/// Whichever limit is reached first ends the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    /// Simulated time bound.
    pub t_end: f64,
    /// Trajectory capacity including the initial state, so at most
    /// `max_steps - 1` steps are taken.
    pub max_steps: usize,
}

impl RunLimits {
    pub fn new(t_end: f64, max_steps: usize) -> Self {
        Self { t_end, max_steps }
    }

    fn validate(&self) -> SimResult<()> {
        if self.t_end.is_nan() {
            return Err(PrecessionError::invalid_config("tEnd must be a number"));
        }
        if self.max_steps == 0 {
            return Err(PrecessionError::invalid_config(
                "maxSteps must be at least 1 to hold the initial state",
            ));
        }
        Ok(())
    }
}

/// Output of one solver invocation. Owned by the caller; never touched by
/// the solver again.
#[derive(Debug, Clone, PartialEq)]
pub struct Run<const N: usize> {
    /// Simulated time at the last stored state, `steps * dt`.
    pub elapsed: f64,
    /// `trajectory[i]` is the state at time `i * dt`; entry 0 is the
    /// initial condition, so `trajectory.len() == steps + 1`.
    pub trajectory: Vec<SVector<f64, N>>,
    pub steps: usize,
    pub dt: f64,
    /// True when a [`StopCondition`] cut the run short.
    pub stopped_early: bool,
}

impl<const N: usize> Run<N> {
    pub fn final_state(&self) -> &SVector<f64, N> {
        // The initial state is always present.
        &self.trajectory[self.trajectory.len() - 1]
    }

    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.dt
    }
}

// ---------------------------------------------------------------------------
// Fixed-step solver loop
// ---------------------------------------------------------------------------

/// Integrate from `t = 0` until `max_steps - 1` steps are taken or the
/// time reaches `t_end`.
pub fn solve<const N: usize, S>(
    method: IntegrationMethod,
    system: &S,
    initial: &SVector<f64, N>,
    dt: f64,
    limits: RunLimits,
) -> SimResult<Run<N>>
where
    S: OdeSystem<N> + ?Sized,
{
    solve_with(method, system, initial, dt, limits, &mut NeverStop)
}

/// [`solve`] with a cooperative stop check before every step.
///
/// Errors abort the whole run; no partial trajectory is returned.
pub fn solve_with<const N: usize, S>(
    method: IntegrationMethod,
    system: &S,
    initial: &SVector<f64, N>,
    dt: f64,
    limits: RunLimits,
    stop: &mut dyn StopCondition<N>,
) -> SimResult<Run<N>>
where
    S: OdeSystem<N> + ?Sized,
{
    if !(dt.is_finite() && dt > 0.0) {
        return Err(PrecessionError::invalid_config(format!(
            "step size {dt} must be positive"
        )));
    }
    limits.validate()?;

    let step_limit = limits.max_steps - 1;
    let by_time = (limits.t_end.max(0.0) / dt).ceil();
    let capacity = if by_time.is_finite() && by_time < MAX_PREALLOCATED_STATES as f64 {
        (by_time as usize + 1).min(limits.max_steps)
    } else {
        limits.max_steps.min(MAX_PREALLOCATED_STATES)
    };

    info!(
        "solving with {method}, dt {dt:.7}, tEnd {:.7}, maxSteps {}",
        limits.t_end, limits.max_steps
    );

    let mut trajectory = Vec::with_capacity(capacity);
    trajectory.push(*initial);

    let mut state = *initial;
    let mut steps = 0usize;
    let mut t = 0.0;
    let mut stopped_early = false;

    while steps < step_limit && t < limits.t_end {
        if stop.should_stop(steps, t, &state) {
            stopped_early = true;
            break;
        }
        state = method.step(system, &state, t, dt)?;
        steps += 1;
        t = steps as f64 * dt;
        trajectory.push(state);
    }

    if stopped_early {
        warn!("run stopped early after {steps} steps at t = {t:.7}");
    }
    info!("completed {steps} steps, t = {t:.7}");

    Ok(Run {
        elapsed: t,
        trajectory,
        steps,
        dt,
        stopped_early,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::stop::StepBudget;
    use nalgebra::{Vector1, Vector2};

    const RK4: IntegrationMethod = IntegrationMethod::RungeKutta4;

    fn oscillator(y: &Vector2<f64>, _t: f64) -> Vector2<f64> {
        Vector2::new(y[1], -y[0])
    }

    #[test]
    fn zero_end_time_yields_only_initial_state() {
        let y0 = Vector2::new(1.0, 0.0);
        let run = solve(RK4, &oscillator, &y0, 0.01, RunLimits::new(0.0, 100)).unwrap();
        assert_eq!(run.trajectory, vec![y0]);
        assert_eq!(run.steps, 0);
        assert_eq!(run.elapsed, 0.0);
    }

    #[test]
    fn step_limit_leaves_room_for_initial_state() {
        let run = solve(RK4, &oscillator, &Vector2::new(1.0, 0.0), 0.01, RunLimits::new(100.0, 10))
            .unwrap();
        assert_eq!(run.steps, 9);
        assert_eq!(run.trajectory.len(), 10);
        assert!((run.elapsed - 0.09).abs() < 1e-15);
    }

    #[test]
    fn time_limit_halts_first() {
        let run = solve(RK4, &oscillator, &Vector2::new(1.0, 0.0), 0.25, RunLimits::new(1.0, 1000))
            .unwrap();
        assert_eq!(run.steps, 4);
        assert_eq!(run.trajectory.len(), 5);
        assert_eq!(run.elapsed, 1.0);
    }

    #[test]
    fn single_slot_buffer_takes_no_steps() {
        let run = solve(RK4, &oscillator, &Vector2::new(1.0, 0.0), 0.1, RunLimits::new(10.0, 1))
            .unwrap();
        assert_eq!(run.trajectory.len(), 1);
    }

    #[test]
    fn entries_are_sampled_at_multiples_of_dt() {
        // dy/dt = 1 integrates exactly, so y[i] = i * dt.
        let f = |_: &Vector1<f64>, _: f64| Vector1::new(1.0);
        let run = solve(RK4, &f, &Vector1::new(0.0), 0.1, RunLimits::new(1.0, 100)).unwrap();
        for (i, y) in run.trajectory.iter().enumerate() {
            assert!((y[0] - run.time_at(i)).abs() < 1e-12, "entry {i}: {}", y[0]);
        }
    }

    #[test]
    fn oscillator_period_closes() {
        let tau = 2.0 * std::f64::consts::PI;
        let dt = tau / 1000.0;
        let run = solve(RK4, &oscillator, &Vector2::new(1.0, 0.0), dt, RunLimits::new(tau - dt / 2.0, 10_000))
            .unwrap();
        assert_eq!(run.steps, 1000);
        let err = (run.final_state() - Vector2::new(1.0, 0.0)).norm();
        assert!(err < 1e-9, "err {err:e}");
    }

    #[test]
    fn stop_condition_returns_consistent_prefix() {
        let y0 = Vector2::new(1.0, 0.0);
        let limits = RunLimits::new(10.0, 10_000);
        let full = solve(RK4, &oscillator, &y0, 0.01, limits).unwrap();
        let cut = solve_with(RK4, &oscillator, &y0, 0.01, limits, &mut StepBudget::new(25)).unwrap();
        assert!(cut.stopped_early);
        assert_eq!(cut.steps, 25);
        assert_eq!(cut.trajectory.len(), 26);
        assert_eq!(&cut.trajectory[..], &full.trajectory[..26]);
    }

    #[test]
    fn divergence_aborts_the_run() {
        // dy/dt = y^2 blows up at t = 1 for y(0) = 1.
        let f = |y: &Vector1<f64>, _: f64| Vector1::new(y[0] * y[0]);
        let err = solve(RK4, &f, &Vector1::new(1.0), 0.01, RunLimits::new(5.0, 10_000)).unwrap_err();
        assert!(matches!(err, PrecessionError::NumericalDivergence { .. }), "{err:?}");
    }

    #[test]
    fn rejects_bad_limits() {
        let y0 = Vector2::new(1.0, 0.0);
        assert!(solve(RK4, &oscillator, &y0, 0.0, RunLimits::new(1.0, 10)).is_err());
        assert!(solve(RK4, &oscillator, &y0, -0.1, RunLimits::new(1.0, 10)).is_err());
        assert!(solve(RK4, &oscillator, &y0, 0.1, RunLimits::new(1.0, 0)).is_err());
        assert!(solve(RK4, &oscillator, &y0, 0.1, RunLimits::new(f64::NAN, 10)).is_err());
    }

    #[test]
    fn identical_inputs_reproduce_identical_output() {
        let y0 = Vector2::new(0.3, -0.7);
        let a = solve(RK4, &oscillator, &y0, 0.003, RunLimits::new(3.0, 5000)).unwrap();
        let b = solve(RK4, &oscillator, &y0, 0.003, RunLimits::new(3.0, 5000)).unwrap();
        assert_eq!(a, b);
    }
}
