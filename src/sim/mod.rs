pub mod convergence;
pub mod integrator;
pub mod runner;
pub mod stop;

pub use convergence::{convergence_test, ConvergenceReport, ConvergenceSummary, PairComparison};
pub use integrator::{rk4_step, IntegrationMethod, OdeSystem};
pub use runner::{solve, solve_with, Run, RunLimits};
pub use stop::{NeverStop, StepBudget, StopCondition, WallClockBudget};
