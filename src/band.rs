//! Ensemble uncertainty statistics over the behavioral subset.
//!
//! The percentile band is the envelope between the p-th and (100-p)-th
//! percentile of the behavioral runs' simulated series at each timestep.
//! Percentiles use linear interpolation between closest ranks. The marginal
//! parameter densities are a best-effort extra for downstream visualization:
//! a near-constant parameter has a singular kernel covariance, so density
//! estimation degrades to "no curve" instead of failing the analysis.

use crate::{Error, Result};

/// Number of grid points a density curve is evaluated on.
const DENSITY_GRID_POINTS: usize = 1001;

/// Per-timestep percentile envelope across the behavioral ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    /// Lower percentile series (default p5)
    pub low: Vec<f64>,
    /// Upper percentile series (default p95)
    pub high: Vec<f64>,
}

/// A marginal density curve for one calibrated parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityCurve {
    /// Evaluation grid spanning the parameter's behavioral range
    pub x: Vec<f64>,
    /// Estimated density at each grid point
    pub y: Vec<f64>,
}

/// Index of the run with the maximum objective value. First occurrence wins
/// on ties.
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] for an empty column.
pub fn best_run(objective: &[f64]) -> Result<usize> {
    objective
        .iter()
        .enumerate()
        .reduce(|best, cur| if cur.1 > best.1 { cur } else { best })
        .map(|(i, _)| i)
        .ok_or_else(|| Error::InsufficientData("best run of an empty table".to_string()))
}

/// Percentile envelope of the accepted runs' series at each timestep.
///
/// All series must share one length (a table invariant).
///
/// # Errors
///
/// Returns [`Error::InsufficientData`] if `accepted` is empty; the
/// percentile of an empty set is undefined and must be surfaced, not
/// silently zeroed.
pub fn percentile_band(accepted: &[Vec<f64>], p_low: f64, p_high: f64) -> Result<Band> {
    if accepted.is_empty() {
        return Err(Error::InsufficientData(
            "percentile band over zero behavioral runs".to_string(),
        ));
    }
    let len = accepted[0].len();
    let mut low = Vec::with_capacity(len);
    let mut high = Vec::with_capacity(len);
    let mut column = vec![0.0; accepted.len()];
    for t in 0..len {
        for (i, series) in accepted.iter().enumerate() {
            column[i] = series[t];
        }
        column.sort_by(f64::total_cmp);
        low.push(percentile_of_sorted(&column, p_low));
        high.push(percentile_of_sorted(&column, p_high));
    }
    Ok(Band { low, high })
}

/// Linear-interpolation percentile of an ascending slice. `p` in [0, 100].
fn percentile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    #[allow(clippy::cast_precision_loss)]
    let rank = p / 100.0 * (n - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor().clamp(0.0, (n - 1) as f64) as usize;
    if lo + 1 >= n {
        return sorted[n - 1];
    }
    #[allow(clippy::cast_precision_loss)]
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

/// Gaussian kernel density estimate of a parameter's behavioral values,
/// evaluated on a uniform grid over their range.
///
/// Returns `None` for degenerate inputs: fewer than two samples, zero
/// variance, zero-width support, or non-finite values. Callers treat `None`
/// as "no density curve available".
#[must_use]
pub fn parameter_density(values: &[f64]) -> Option<DensityCurve> {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n_f = n as f64;
    let mean = values.iter().sum::<f64>() / n_f;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n_f - 1.0);
    if variance <= 0.0 {
        return None;
    }
    // Scott's factor, the scipy gaussian_kde default for one dimension.
    let bandwidth = variance.sqrt() * n_f.powf(-0.2);

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let step = (max - min) / (DENSITY_GRID_POINTS - 1) as f64;
    let norm = 1.0 / (n_f * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let mut x = Vec::with_capacity(DENSITY_GRID_POINTS);
    let mut y = Vec::with_capacity(DENSITY_GRID_POINTS);
    for i in 0..DENSITY_GRID_POINTS {
        #[allow(clippy::cast_precision_loss)]
        let xi = min + step * i as f64;
        let density: f64 = values
            .iter()
            .map(|v| (-0.5 * ((xi - v) / bandwidth).powi(2)).exp())
            .sum::<f64>()
            * norm;
        x.push(xi);
        y.push(density);
    }
    Some(DensityCurve { x, y })
}
