//! Calibration/validation period handling.
//!
//! A run-record table stores one goodness-of-fit value per objective, split
//! by period: the calibration range runs from Jan 1 of the calibration start
//! year to Jan 1 of the validation start year, the validation range from
//! there to the end of the series. Years are converted once into row offsets
//! against the observed series start date (fixed daily step).

use chrono::NaiveDate;

use crate::metrics::{nse, pbias};
use crate::{Error, Result};

/// Calibration and validation period boundaries (calendar years).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periods {
    calibration_start_year: i32,
    validation_start_year: i32,
}

impl Periods {
    /// Create period boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPeriod`] if the calibration start does not
    /// precede the validation start.
    pub fn new(calibration_start_year: i32, validation_start_year: i32) -> Result<Self> {
        if calibration_start_year >= validation_start_year {
            return Err(Error::InvalidPeriod {
                year: calibration_start_year,
                reason: format!(
                    "calibration start must precede validation start {validation_start_year}"
                ),
            });
        }
        Ok(Self {
            calibration_start_year,
            validation_start_year,
        })
    }

    /// Calibration start year (Jan 1 opens the calibration range).
    #[must_use]
    pub const fn calibration_start_year(&self) -> i32 {
        self.calibration_start_year
    }

    /// Validation start year (Jan 1 closes calibration, opens validation).
    #[must_use]
    pub const fn validation_start_year(&self) -> i32 {
        self.validation_start_year
    }

    /// Split a daily series into calibration and validation slices.
    ///
    /// The pre-calibration head of the series (spin-up) is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPeriod`] if either boundary falls outside the
    /// series.
    pub fn split<'a>(
        &self,
        series: &'a [f64],
        series_start: NaiveDate,
    ) -> Result<(&'a [f64], &'a [f64])> {
        let c_start = checked_offset(self.calibration_start_year, series_start, series.len())?;
        let v_start = checked_offset(self.validation_start_year, series_start, series.len())?;
        Ok((&series[c_start..v_start], &series[v_start..]))
    }
}

fn checked_offset(year: i32, series_start: NaiveDate, len: usize) -> Result<usize> {
    let offset = offset_of(year, series_start)?;
    if offset > len {
        return Err(Error::InvalidPeriod {
            year,
            reason: format!("day offset {offset} exceeds series length {len}"),
        });
    }
    Ok(offset)
}

/// Row offset of Jan 1 of `year` inside a daily series beginning at
/// `series_start`.
///
/// # Errors
///
/// Returns [`Error::InvalidPeriod`] if Jan 1 of `year` precedes the series
/// start.
pub fn offset_of(year: i32, series_start: NaiveDate) -> Result<usize> {
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(Error::InvalidPeriod {
        year,
        reason: "not a representable calendar year".to_string(),
    })?;
    let days = (jan_first - series_start).num_days();
    usize::try_from(days).map_err(|_| Error::InvalidPeriod {
        year,
        reason: format!("Jan 1 precedes series start {series_start}"),
    })
}

/// Per-period goodness-of-fit vector for one run, in the conventional
/// objective order `[NSE_c, NSE_v, PBIAS_c, PBIAS_v]`.
///
/// # Errors
///
/// Returns [`Error::InvalidPeriod`] if the boundaries fall outside the
/// series. Degenerate slices yield `NaN` entries, not errors.
pub fn objective_scores(
    observed: &[f64],
    simulated: &[f64],
    series_start: NaiveDate,
    periods: Periods,
) -> Result<[f64; 4]> {
    let (obs_c, obs_v) = periods.split(observed, series_start)?;
    let (sim_c, sim_v) = periods.split(simulated, series_start)?;
    Ok([
        nse(obs_c, sim_c),
        nse(obs_v, sim_v),
        pbias(obs_c, sim_c),
        pbias(obs_v, sim_v),
    ])
}
