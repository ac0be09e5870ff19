//! Goodness-of-fit metrics for discharge series.
//!
//! Both metrics take aligned observed and simulated slices and return a
//! scalar score. Degenerate inputs (empty slices, zero-variance or
//! zero-volume observations) yield `NaN` so callers can report the score as
//! undefined instead of dividing by zero.

/// Nash-Sutcliffe Efficiency. Range: (-inf, 1], 1 = perfect.
///
/// `NaN` when the slices are empty or the observed series has zero variance.
#[must_use]
pub fn nse(observed: &[f64], simulated: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), simulated.len());
    let n = observed.len();
    if n == 0 {
        return f64::NAN;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean_obs: f64 = observed.iter().sum::<f64>() / n as f64;
    let numerator: f64 = observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| (o - s).powi(2))
        .sum();
    let denominator: f64 = observed.iter().map(|o| (o - mean_obs).powi(2)).sum();
    if denominator == 0.0 {
        return f64::NAN;
    }
    1.0 - numerator / denominator
}

/// Percent bias between observed and simulated cumulative volumes.
/// Optimal = 0. Positive = underestimation of the observed volume.
///
/// `NaN` when the slices are empty or the observed volume sums to zero.
#[must_use]
pub fn pbias(observed: &[f64], simulated: &[f64]) -> f64 {
    debug_assert_eq!(observed.len(), simulated.len());
    if observed.is_empty() {
        return f64::NAN;
    }
    let sum_obs: f64 = observed.iter().sum();
    if sum_obs == 0.0 {
        return f64::NAN;
    }
    let diff_sum: f64 = observed
        .iter()
        .zip(simulated)
        .map(|(o, s)| o - s)
        .sum();
    100.0 * diff_sum / sum_obs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nse_perfect_match_is_one() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(nse(&obs, &obs), 1.0);
    }

    #[test]
    fn nse_mean_simulation_gives_zero() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [3.0; 5];
        assert_relative_eq!(nse(&obs, &sim), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn nse_constant_observed_is_nan() {
        let obs = [5.0; 5];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(nse(&obs, &sim).is_nan());
    }

    #[test]
    fn nse_empty_slices_are_nan() {
        assert!(nse(&[], &[]).is_nan());
    }

    #[test]
    fn nse_known_value() {
        // num = 0.01+0.04+0.04+0.01+0.01 = 0.11, den = 10
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let sim = [1.1, 2.2, 2.8, 4.1, 4.9];
        assert_relative_eq!(nse(&obs, &sim), 0.989, epsilon = 1e-10);
    }

    #[test]
    fn pbias_perfect_match_is_zero() {
        let obs = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(pbias(&obs, &obs), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pbias_underestimation_positive() {
        let obs = [2.0, 3.0, 4.0, 5.0, 6.0];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(pbias(&obs, &sim) > 0.0);
    }

    #[test]
    fn pbias_known_value() {
        // diff = -2 - 2 + 2 = -2, sum_obs = 60
        let obs = [10.0, 20.0, 30.0];
        let sim = [12.0, 22.0, 28.0];
        assert_relative_eq!(pbias(&obs, &sim), -100.0 * 2.0 / 60.0, epsilon = 1e-10);
    }

    #[test]
    fn pbias_zero_volume_is_nan() {
        let obs = [0.0; 5];
        let sim = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(pbias(&obs, &sim).is_nan());
    }

    #[test]
    fn pbias_empty_slices_are_nan() {
        assert!(pbias(&[], &[]).is_nan());
    }
}
