use std::time::{Duration, Instant};

use nalgebra::SVector;

// ---------------------------------------------------------------------------
// Cooperative early stop
// ---------------------------------------------------------------------------

/// Checked once per step, before the step is taken. Returning `true` ends
/// the run with the trajectory computed so far.
pub trait StopCondition<const N: usize> {
    fn should_stop(&mut self, step: usize, time: f64, state: &SVector<f64, N>) -> bool;
}

/// Never stops; the run ends on its step or time limit.
pub struct NeverStop;

impl<const N: usize> StopCondition<N> for NeverStop {
    fn should_stop(&mut self, _step: usize, _time: f64, _state: &SVector<f64, N>) -> bool {
        false
    }
}

/// Stops once a fixed number of steps has been taken.
pub struct StepBudget {
    pub max_steps: usize,
}

impl StepBudget {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl<const N: usize> StopCondition<N> for StepBudget {
    fn should_stop(&mut self, step: usize, _time: f64, _state: &SVector<f64, N>) -> bool {
        step >= self.max_steps
    }
}

/// Stops once a wall-clock budget is spent. The clock starts on the first
/// check, not at construction.
pub struct WallClockBudget {
    pub budget: Duration,
    started: Option<Instant>,
}

impl WallClockBudget {
    pub fn new(budget: Duration) -> Self {
        Self { budget, started: None }
    }
}

impl<const N: usize> StopCondition<N> for WallClockBudget {
    fn should_stop(&mut self, _step: usize, _time: f64, _state: &SVector<f64, N>) -> bool {
        let started = *self.started.get_or_insert_with(Instant::now);
        started.elapsed() >= self.budget
    }
}

impl<const N: usize, F> StopCondition<N> for F
where
    F: FnMut(usize, f64, &SVector<f64, N>) -> bool,
{
    fn should_stop(&mut self, step: usize, time: f64, state: &SVector<f64, N>) -> bool {
        self(step, time, state)
    }
}
