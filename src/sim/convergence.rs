//! Empirical order-of-convergence check.
//!
//! The same initial-value problem is solved at `h`, `h·k` and `h·k²`. The
//! two finer trajectories are subsampled at stride `k` and `k²` so that all
//! three compare states at the same physical times, and the two difference
//! series are reduced to norms. For a method of order `p` the ratio of the
//! coarse-pair norm to the fine-pair norm tends to `k^p` as `h -> 0`.
//!
//! The raw state norm mixes fast angles with slow orbit shape, and on long
//! eccentric orbits its error expansion has competing `h^4` and `h^5`
//! terms. [`ConvergenceReport::observable_norms`] compares any smooth
//! function of the state instead; [`ConvergenceReport::component_norms`]
//! compares each component separately.
//!
//! This is a diagnostic only; no extrapolation is applied to any run.

use std::collections::BTreeMap;

use log::info;
use nalgebra::SVector;
use serde::Serialize;

use super::integrator::{IntegrationMethod, OdeSystem};
use super::runner::{solve, Run, RunLimits};
use crate::error::{PrecessionError, SimResult};

#[derive(Debug, Clone)]
pub struct ConvergenceReport<const N: usize> {
    pub method: IntegrationMethod,
    pub base_dt: f64,
    pub factor: usize,
    /// Runs at `h`, `h·k`, `h·k²`, finest first.
    pub runs: [Run<N>; 3],
    /// Aligned `run(h) - run(h·k)`.
    pub fine_diff: Vec<SVector<f64, N>>,
    /// Aligned `run(h·k) - run(h·k²)`.
    pub coarse_diff: Vec<SVector<f64, N>>,
    /// Largest Euclidean norm over `fine_diff`.
    pub fine_norm: f64,
    /// Largest Euclidean norm over `coarse_diff`.
    pub coarse_norm: f64,
}

/// Largest difference norms of the fine pair `(h, hk)` and the coarse pair
/// `(hk, hk²)` for one compared quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairComparison {
    pub fine_norm: f64,
    pub coarse_norm: f64,
    pub ratio: f64,
    pub observed_order: f64,
}

impl PairComparison {
    pub fn new(fine_norm: f64, coarse_norm: f64, factor: usize) -> Self {
        let ratio = coarse_norm / fine_norm;
        Self {
            fine_norm,
            coarse_norm,
            ratio,
            observed_order: ratio.ln() / (factor as f64).ln(),
        }
    }
}

/// Scalar results of a sweep, for logs and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceSummary {
    pub method: IntegrationMethod,
    pub step_sizes: [f64; 3],
    pub steps: [usize; 3],
    pub aligned_samples: usize,
    pub fine_norm: f64,
    pub coarse_norm: f64,
    pub ratio: f64,
    pub expected_ratio: f64,
    pub observed_order: f64,
    /// One entry per state component, in state-vector order.
    pub components: Vec<PairComparison>,
    /// Named derived quantities, see [`ConvergenceReport::observable_norms`].
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub observables: BTreeMap<String, PairComparison>,
}

impl ConvergenceSummary {
    pub fn with_observable(mut self, name: impl Into<String>, comparison: PairComparison) -> Self {
        self.observables.insert(name.into(), comparison);
        self
    }
}

impl<const N: usize> ConvergenceReport<N> {
    /// `coarse_norm / fine_norm`; about `k^4` for RK4 in the asymptotic
    /// regime.
    pub fn ratio(&self) -> f64 {
        self.coarse_norm / self.fine_norm
    }

    pub fn expected_ratio(&self) -> f64 {
        (self.factor as f64).powi(self.method.order() as i32)
    }

    /// `log_k(ratio)`.
    pub fn observed_order(&self) -> f64 {
        self.ratio().ln() / (self.factor as f64).ln()
    }

    pub fn aligned_samples(&self) -> usize {
        self.fine_diff.len()
    }

    /// Run `i` (finest first) subsampled onto the coarse grid.
    fn aligned(&self, i: usize) -> impl Iterator<Item = &SVector<f64, N>> + '_ {
        let stride = self.factor.pow(2 - i as u32);
        self.runs[i].trajectory.iter().step_by(stride).take(self.aligned_samples())
    }

    /// Per-component comparison: largest `|Δy_c|` over the aligned samples
    /// for each component `c`.
    pub fn component_norms(&self) -> [PairComparison; N] {
        std::array::from_fn(|c| {
            let largest = |diffs: &[SVector<f64, N>]| diffs.iter().map(|d| d[c].abs()).fold(0.0_f64, f64::max);
            PairComparison::new(largest(&self.fine_diff), largest(&self.coarse_diff), self.factor)
        })
    }

    /// Compare a derived quantity instead of the raw state. `observable` is
    /// evaluated on every aligned sample of each run and the pair norms are
    /// the largest Euclidean norms of the differences.
    pub fn observable_norms<const M: usize, F>(&self, observable: F) -> PairComparison
    where
        F: Fn(&SVector<f64, N>) -> SVector<f64, M>,
    {
        let [fine, mid, coarse] = [0, 1, 2].map(|i| self.aligned(i).map(&observable).collect::<Vec<_>>());
        let largest = |a: &[SVector<f64, M>], b: &[SVector<f64, M>]| {
            a.iter().zip(b).map(|(x, y)| (x - y).norm()).fold(0.0_f64, f64::max)
        };
        PairComparison::new(largest(&fine, &mid), largest(&mid, &coarse), self.factor)
    }

    pub fn summary(&self) -> ConvergenceSummary {
        ConvergenceSummary {
            method: self.method,
            step_sizes: [self.runs[0].dt, self.runs[1].dt, self.runs[2].dt],
            steps: [self.runs[0].steps, self.runs[1].steps, self.runs[2].steps],
            aligned_samples: self.aligned_samples(),
            fine_norm: self.fine_norm,
            coarse_norm: self.coarse_norm,
            ratio: self.ratio(),
            expected_ratio: self.expected_ratio(),
            observed_order: self.observed_order(),
            components: self.component_norms().to_vec(),
            observables: BTreeMap::new(),
        }
    }
}

fn max_norm<const N: usize>(diffs: &[SVector<f64, N>]) -> f64 {
    diffs.iter().map(|d| d.norm()).fold(0.0_f64, f64::max)
}

/// Aligned differences `a[i·stride_a] - b[i·stride_b]`, truncated to the
/// shorter of the two subsampled sequences.
fn aligned_diff<const N: usize>(
    a: &[SVector<f64, N>],
    stride_a: usize,
    b: &[SVector<f64, N>],
    stride_b: usize,
    len: usize,
) -> Vec<SVector<f64, N>> {
    a.iter()
        .step_by(stride_a)
        .zip(b.iter().step_by(stride_b))
        .take(len)
        .map(|(x, y)| x - y)
        .collect()
}

/// Solve the problem at `dt`, `dt·factor` and `dt·factor²` and compare.
///
/// The three runs are independent and execute on scoped threads, each with
/// its own trajectory buffer; alignment starts only after all three
/// finished. If any run fails the whole sweep fails.
pub fn convergence_test<const N: usize, S>(
    method: IntegrationMethod,
    system: &S,
    initial: &SVector<f64, N>,
    dt: f64,
    factor: usize,
    limits: RunLimits,
) -> SimResult<ConvergenceReport<N>>
where
    S: OdeSystem<N> + Sync + ?Sized,
{
    if factor < 2 {
        return Err(PrecessionError::invalid_config(format!(
            "refinement factor {factor} must be an integer greater than 1"
        )));
    }
    let stride2 = factor
        .checked_mul(factor)
        .ok_or_else(|| PrecessionError::invalid_config(format!("refinement factor {factor} is too large")))?;
    let k = factor as f64;
    let step_sizes = [dt, dt * k, dt * k * k];

    let [fine, mid, coarse] = std::thread::scope(|s| {
        step_sizes
            .map(|h| s.spawn(move || solve(method, system, initial, h, limits)))
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
    });
    let (fine, mid, coarse) = (fine?, mid?, coarse?);

    let fine_strided = fine.trajectory.len().div_ceil(stride2);
    let mid_strided = mid.trajectory.len().div_ceil(factor);
    let len = coarse.trajectory.len().min(mid_strided).min(fine_strided);

    let fine_diff = aligned_diff(&fine.trajectory, stride2, &mid.trajectory, factor, len);
    let coarse_diff = aligned_diff(&mid.trajectory, factor, &coarse.trajectory, 1, len);
    let fine_norm = max_norm(&fine_diff);
    let coarse_norm = max_norm(&coarse_diff);

    let report = ConvergenceReport {
        method,
        base_dt: dt,
        factor,
        runs: [fine, mid, coarse],
        fine_diff,
        coarse_diff,
        fine_norm,
        coarse_norm,
    };
    info!(
        "convergence: {} aligned samples, |d(h, {factor}h)| = {:.3e}, |d({factor}h, {}h)| = {:.3e}, ratio {:.3} (expected {:.0}), order {:.3}",
        len,
        fine_norm,
        stride2,
        coarse_norm,
        report.ratio(),
        report.expected_ratio(),
        report.observed_order()
    );
    Ok(report)
}
