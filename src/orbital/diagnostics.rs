use std::f64::consts::{PI, TAU};

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::dynamics::{BodyId, BodyState, PrecessionModel, StateVector};
use crate::sim::Run;

const ARCSEC_PER_RADIAN: f64 = 180.0 * 3600.0 / PI;

// ---------------------------------------------------------------------------
// Orbit-geometry records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Apsis {
    Perihelion,
    Aphelion,
}

/// One apsis passage, interpolated between the two samples that bracket
/// the radial-velocity sign change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ApsisRecord {
    pub kind: Apsis,
    /// Sample just before the passage.
    pub index: usize,
    pub time: f64,
    pub radius: f64,
    /// Unwrapped polar angle.
    pub theta: f64,
    /// `theta` reduced to [0, 2 pi).
    pub longitude: f64,
}

/// A sample whose radius lies outside `reference ± tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExcursionRecord {
    pub index: usize,
    pub time: f64,
    pub radius: f64,
    pub theta: f64,
    pub longitude: f64,
    /// Signed distance outside the band.
    pub deviation: f64,
}

/// Cartesian `(x, y)` track of one body.
pub fn cartesian_track(trajectory: &[StateVector], body: BodyId) -> Vec<[f64; 2]> {
    trajectory
        .iter()
        .map(|y| {
            let p = BodyState::of(y, body).position();
            [p.x, p.y]
        })
        .collect()
}

/// All passages of the requested apsis, in time order.
///
/// A perihelion is where the radial velocity turns from negative to
/// non-negative, an aphelion the reverse.
pub fn find_apsides(trajectory: &[StateVector], dt: f64, body: BodyId, kind: Apsis) -> Vec<ApsisRecord> {
    let mut out = Vec::new();
    for (i, pair) in trajectory.windows(2).enumerate() {
        let a = BodyState::of(&pair[0], body);
        let b = BodyState::of(&pair[1], body);
        let crossing = match kind {
            Apsis::Perihelion => a.v < 0.0 && b.v >= 0.0,
            Apsis::Aphelion => a.v > 0.0 && b.v <= 0.0,
        };
        if !crossing {
            continue;
        }
        let f = a.v / (a.v - b.v);
        let theta = a.theta + f * (b.theta - a.theta);
        out.push(ApsisRecord {
            kind,
            index: i,
            time: (i as f64 + f) * dt,
            radius: a.r + f * (b.r - a.r),
            theta,
            longitude: theta.rem_euclid(TAU),
        });
    }
    out
}

/// Samples at or after `since` whose radius leaves the band
/// `[reference - tolerance, reference + tolerance]`.
pub fn out_of_tolerance(
    trajectory: &[StateVector],
    dt: f64,
    body: BodyId,
    reference: f64,
    tolerance: f64,
    since: f64,
) -> Vec<ExcursionRecord> {
    let lo = reference - tolerance;
    let hi = reference + tolerance;
    trajectory
        .iter()
        .enumerate()
        .filter_map(|(i, y)| {
            let time = i as f64 * dt;
            if time < since {
                return None;
            }
            let s = BodyState::of(y, body);
            let deviation = if s.r < lo {
                s.r - lo
            } else if s.r > hi {
                s.r - hi
            } else {
                return None;
            };
            Some(ExcursionRecord {
                index: i,
                time,
                radius: s.r,
                theta: s.theta,
                longitude: s.theta.rem_euclid(TAU),
                deviation,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Precession estimate
// ---------------------------------------------------------------------------

/// Perihelion advance from a series of passages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrecessionEstimate {
    pub passages: usize,
    /// Unwrapped longitude change from first to last passage, radians.
    pub drift: f64,
    /// Least-squares slope of longitude against time, radians per year.
    pub rate: f64,
    pub arcsec_per_century: f64,
}

/// Wrap an angle difference into (-pi, pi].
pub fn wrap_angle(d: f64) -> f64 {
    let w = d.rem_euclid(TAU);
    if w > PI {
        w - TAU
    } else {
        w
    }
}

/// Passage longitudes made continuous: each one differs from the previous
/// by the wrapped step, starting from the first passage's longitude.
pub fn unwrapped_longitudes(passages: &[ApsisRecord]) -> Vec<f64> {
    let Some(first) = passages.first() else {
        return Vec::new();
    };
    let mut acc = first.longitude;
    let mut out = Vec::with_capacity(passages.len());
    out.push(acc);
    for pair in passages.windows(2) {
        acc += wrap_angle(pair[1].longitude - pair[0].longitude);
        out.push(acc);
    }
    out
}

impl PrecessionEstimate {
    /// Needs at least two passages.
    pub fn from_passages(passages: &[ApsisRecord]) -> Option<Self> {
        if passages.len() < 2 {
            return None;
        }
        let unwrapped = unwrapped_longitudes(passages);

        let n = passages.len() as f64;
        let t_mean = passages.iter().map(|p| p.time).sum::<f64>() / n;
        let l_mean = unwrapped.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (p, l) in passages.iter().zip(&unwrapped) {
            let dx = p.time - t_mean;
            sxy += dx * (l - l_mean);
            sxx += dx * dx;
        }
        let rate = if sxx > 0.0 { sxy / sxx } else { 0.0 };

        Some(Self {
            passages: passages.len(),
            drift: unwrapped[unwrapped.len() - 1] - unwrapped[0],
            rate,
            arcsec_per_century: rate * 100.0 * ARCSEC_PER_RADIAN,
        })
    }
}

// ---------------------------------------------------------------------------
// Report for one run
// ---------------------------------------------------------------------------

/// Structured replacement for console diagnostics of one run.
#[derive(Debug, Clone, Serialize)]
pub struct OrbitReport {
    pub planet: String,
    pub samples: usize,
    pub dt: f64,
    pub elapsed: f64,
    pub relativistic: bool,
    /// Mercury perihelia within the first `reportWindow` years.
    pub early_perihelia: Vec<ApsisRecord>,
    /// Mercury perihelia within the last `reportWindow` years.
    pub late_perihelia: Vec<ApsisRecord>,
    /// Planet samples outside `semi_major_axis ± targetTolerance` during
    /// the last `excursionWindow` years. Empty when the planet is frozen.
    pub planet_excursions: Vec<ExcursionRecord>,
    pub precession: Option<PrecessionEstimate>,
}

impl OrbitReport {
    pub fn build(model: &PrecessionModel, config: &SimulationConfig, run: &Run<8>) -> Self {
        let trajectory = &run.trajectory;
        let perihelia = find_apsides(trajectory, run.dt, BodyId::Mercury, Apsis::Perihelion);

        let early_perihelia = perihelia
            .iter()
            .copied()
            .filter(|p| p.time <= config.report_window)
            .collect();
        let late_perihelia = perihelia
            .iter()
            .copied()
            .filter(|p| p.time >= run.elapsed - config.report_window)
            .collect();

        let planet_excursions = if model.features.only_mercury {
            Vec::new()
        } else {
            out_of_tolerance(
                trajectory,
                run.dt,
                BodyId::Planet,
                model.planet.semi_major_axis,
                config.target_tolerance,
                run.elapsed - config.excursion_window,
            )
        };

        Self {
            planet: model.planet.name.clone(),
            samples: trajectory.len(),
            dt: run.dt,
            elapsed: run.elapsed,
            relativistic: model.mercury.is_relativistic(),
            early_perihelia,
            late_perihelia,
            planet_excursions,
            precession: PrecessionEstimate::from_passages(&perihelia),
        }
    }
}
