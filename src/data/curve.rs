//! Numeric routines over stress/strain curves.
//!
//! Everything here is a pure function of its inputs; curves are never
//! modified in place.

use crate::config::{IntegrationMethod, RegressionWindow};
use crate::error::ComputationError;

use super::model::Curve;

/// Keep the leading `ceil(n × pct / 100)` points.
pub fn truncate(curve: &Curve, pct: u8) -> Curve {
    debug_assert!(pct <= 100, "truncation percentage {pct} above 100");
    let pct = usize::from(pct.min(100));
    let keep = (curve.len() * pct).div_ceil(100);
    Curve {
        strain: curve.strain[..keep].to_vec(),
        stress: curve.stress[..keep].to_vec(),
    }
}

/// Index of the element closest to `target`. Ties go to the lower index.
pub fn nearest_index(series: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in series.iter().enumerate() {
        let dist = (v - target).abs();
        if dist.is_nan() {
            continue;
        }
        match best {
            Some((_, d)) if dist >= d => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

/// Least-squares line through a part of a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Inclusive index range the fit was computed over.
    pub first: usize,
    pub last: usize,
}

/// Fit stress over strain between the points nearest to `window.start` and
/// `window.end` (both inclusive).
pub fn linear_regression(
    curve: &Curve,
    window: RegressionWindow,
) -> Result<Regression, ComputationError> {
    let degenerate = |points| ComputationError::DegenerateWindow {
        start: window.start,
        end: window.end,
        points,
    };

    let first = nearest_index(&curve.strain, window.start).ok_or_else(|| degenerate(0))?;
    let last = nearest_index(&curve.strain, window.end).ok_or_else(|| degenerate(0))?;
    log::debug!("Regression range: {first}..={last}");
    if last < first {
        return Err(degenerate(0));
    }

    let x = &curve.strain[first..=last];
    let y = &curve.stress[first..=last];
    let n = x.len() as f64;
    if x.len() < 2 {
        return Err(degenerate(x.len()));
    }

    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_xx: f64 = x.iter().map(|a| a * a).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(degenerate(x.len()));
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    Ok(Regression {
        slope,
        intercept,
        first,
        last,
    })
}

/// Highest stress and the strain recorded at that same point.
pub fn max_stress(curve: &Curve) -> Result<(f64, f64), ComputationError> {
    let mut best: Option<usize> = None;
    for (i, &s) in curve.stress.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        if best.map_or(true, |b| s > curve.stress[b]) {
            best = Some(i);
        }
    }
    best.map(|i| (curve.stress[i], curve.strain[i]))
        .ok_or(ComputationError::EmptyCurve)
}

/// Largest strain on the curve. Curves are expected to be strain-monotonic,
/// so this is the strain of the last point.
pub fn strain_at_break(curve: &Curve) -> Result<f64, ComputationError> {
    curve
        .strain
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .reduce(f64::max)
        .ok_or(ComputationError::EmptyCurve)
}

/// Area under the stress/strain curve divided by the stress scaling factor.
pub fn integrate(curve: &Curve, method: IntegrationMethod, stress_scaling: f64) -> f64 {
    let area = match method {
        IntegrationMethod::Trapezoid => trapezoid(&curve.strain, &curve.stress),
        IntegrationMethod::Simpson => simpson(&curve.strain, &curve.stress),
    };
    area / stress_scaling
}

fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Composite Simpson's rule for unevenly spaced samples. An odd trailing
/// interval is closed with a trapezoid.
fn simpson(x: &[f64], y: &[f64]) -> f64 {
    let intervals = x.len().saturating_sub(1);
    let mut area = 0.0;
    let mut i = 0;
    while i + 2 <= intervals {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        if h0 == 0.0 || h1 == 0.0 {
            area += trapezoid(&x[i..=i + 2], &y[i..=i + 2]);
        } else {
            let h = h0 + h1;
            area += h / 6.0
                * ((2.0 - h1 / h0) * y[i]
                    + h * h / (h0 * h1) * y[i + 1]
                    + (2.0 - h0 / h1) * y[i + 2]);
        }
        i += 2;
    }
    if i < intervals {
        area += trapezoid(&x[i..=i + 1], &y[i..=i + 1]);
    }
    area
}
