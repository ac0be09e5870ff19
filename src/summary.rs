//! Analysis orchestration and the persisted result summary.
//!
//! `analyze` is a pure function of the table contents: threshold search over
//! the primary objective, best-run extraction, percentile envelope, and
//! best-effort parameter densities, collected into one [`Analysis`]. The
//! [`Summary`] part is persisted as a small JSON document next to the table
//! and consumed by the reporting collaborators; plotting inputs (band, best
//! series, densities) stay in memory.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::band::{self, Band, DensityCurve};
use crate::periods::{self, Periods};
use crate::table::RunTable;
use crate::threshold::{self, SearchParams};
use crate::{Error, Result};

/// Explicit configuration for one analysis session.
///
/// Replaces any implicit coupling to a live simulation setup: everything the
/// analysis needs besides the table itself is passed here by value.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Observed discharge series, aligned 1:1 with the simulated series
    pub observed: Vec<f64>,
    /// Date of the first value of the observed series (fixed daily step)
    pub series_start: NaiveDate,
    /// Calibration/validation period boundaries
    pub periods: Periods,
    /// Threshold relaxation parameters
    pub search: SearchParams,
    /// Lower percentile of the uncertainty band
    pub percentile_low: f64,
    /// Upper percentile of the uncertainty band
    pub percentile_high: f64,
}

impl AnalysisConfig {
    /// Config with default search parameters and the p5/p95 band.
    #[must_use]
    pub fn new(observed: Vec<f64>, series_start: NaiveDate, periods: Periods) -> Self {
        Self {
            observed,
            series_start,
            periods,
            search: SearchParams::default(),
            percentile_low: 5.0,
            percentile_high: 95.0,
        }
    }
}

/// Persisted result summary, one per analysis session.
///
/// Field names match the keys the report templates substitute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of behavioral runs at the final threshold
    pub n: usize,
    /// Total number of runs in the table
    pub total: usize,
    /// Final acceptance threshold on the primary objective
    pub threshold: f64,
    /// Row index of the best run, absent for an empty table
    pub best_run_id: Option<usize>,
    /// Best run's calibration NSE
    #[serde(rename = "NSE_c")]
    pub nse_c: Option<f64>,
    /// Best run's validation NSE
    #[serde(rename = "NSE_v")]
    pub nse_v: Option<f64>,
    /// Best run's calibration percent bias
    #[serde(rename = "PBIAS_c")]
    pub pbias_c: Option<f64>,
    /// Best run's validation percent bias
    #[serde(rename = "PBIAS_v")]
    pub pbias_v: Option<f64>,
}

impl Summary {
    /// Write the summary as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| Error::StorageWriteError(format!("summary serialization failed: {e}")))?;
        Ok(())
    }

    /// Read a summary back from JSON (the reporting side does this).
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the file is missing or not a
    /// valid summary document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| Error::StorageUnavailable {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::open(path).map_err(|e| unavailable(format!("cannot open file: {e}")))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| unavailable(format!("not a valid summary document: {e}")))
    }
}

/// Summary filename for a model/session name: `<name>.result.json`.
pub fn summary_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{name}.result.json"))
}

/// Full analysis output: the persistable summary plus the in-memory series
/// the plotting collaborators need.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Persisted part of the result
    pub summary: Summary,
    /// p-low/p-high envelope over the behavioral runs; `None` when no run is
    /// behavioral
    pub band: Option<Band>,
    /// Simulated series of the best run; empty for an empty table
    pub best_series: Vec<f64>,
    /// Marginal density per parameter name; `None` where estimation failed
    /// (degenerate values)
    pub densities: BTreeMap<String, Option<DensityCurve>>,
}

/// Analyze a completed ensemble.
///
/// Idempotent: calling it twice on an unchanged table yields identical
/// output. A table with zero behavioral runs still completes with a degraded
/// but valid summary (`n = 0`, no band).
///
/// # Errors
///
/// Returns storage errors if columns cannot be read, or
/// [`Error::InsufficientData`] if the observed series length disagrees with
/// the table's series length.
pub fn analyze(table: &RunTable, config: &AnalysisConfig) -> Result<Analysis> {
    if table.row_count() > 0 && config.observed.len() != table.series_len() {
        return Err(Error::InsufficientData(format!(
            "observed series has {} values, table stores {} per run",
            config.observed.len(),
            table.series_len()
        )));
    }

    let objective = table.primary_objective()?;
    let state = threshold::search(&objective, &config.search);
    let accepted = table.filter_rows(|v| v >= state.threshold)?;

    let band = if accepted.is_empty() {
        None
    } else {
        let series = table.simulations(&accepted)?;
        Some(band::percentile_band(
            &series,
            config.percentile_low,
            config.percentile_high,
        )?)
    };

    let mut densities = BTreeMap::new();
    for name in table.parameter_names() {
        let column = table.parameter(name)?;
        let behavioral: Vec<f64> = accepted.iter().map(|&i| column[i]).collect();
        densities.insert(name.clone(), band::parameter_density(&behavioral));
    }

    let (best_run_id, best_series, best_objectives) = match band::best_run(&objective) {
        Ok(best) => (
            Some(best),
            table.simulation(best)?,
            Some(table.objectives_for_row(best)?),
        ),
        Err(_) => (None, Vec::new(), None),
    };
    let objective_at = |i: usize| best_objectives.as_ref().and_then(|o| o.get(i).copied());

    let summary = Summary {
        n: state.accepted_count,
        total: table.row_count(),
        threshold: state.threshold,
        best_run_id,
        nse_c: objective_at(0),
        nse_v: objective_at(1),
        pbias_c: objective_at(2),
        pbias_v: objective_at(3),
    };
    info!(
        n = summary.n,
        total = summary.total,
        threshold = summary.threshold,
        "analysis complete"
    );

    Ok(Analysis {
        summary,
        band,
        best_series,
        densities,
    })
}

/// Re-derive the per-period objective vector `[NSE_c, NSE_v, PBIAS_c,
/// PBIAS_v]` of a stored run from its simulated series, for documentation of
/// a single run independent of the stored objective columns.
///
/// # Errors
///
/// Returns [`Error::InvalidPeriod`] for boundaries outside the series, or
/// storage errors if the row cannot be read.
pub fn period_scores_for_row(
    table: &RunTable,
    row: usize,
    config: &AnalysisConfig,
) -> Result<[f64; 4]> {
    let simulated = table.simulation(row)?;
    periods::objective_scores(
        &config.observed,
        &simulated,
        config.series_start,
        config.periods,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss)]
    fn config(series_len: usize) -> AnalysisConfig {
        // Daily series starting 1999-01-01; calibration 2000, validation 2001.
        let start = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        let observed: Vec<f64> = (0..series_len).map(|i| (i as f64 * 0.07).sin() + 2.0).collect();
        AnalysisConfig::new(observed, start, Periods::new(2000, 2001).unwrap())
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn table_with_objectives(objectives: &[f64], series_len: usize) -> RunTable {
        let mut table = RunTable::create(4, &["Vmax".to_string()], series_len);
        let rows: Vec<_> = objectives
            .iter()
            .enumerate()
            .map(|(i, &like1)| crate::table::RunRow {
                run_id: i as i64,
                objectives: vec![like1, like1 - 0.1, 5.0, -5.0],
                parameters: vec![like1 * 3.0],
                simulation: (0..series_len).map(|t| like1 + t as f64 * 1e-3).collect(),
            })
            .collect();
        table.append_rows(&rows).unwrap();
        table
    }

    #[test]
    fn analyze_is_idempotent() {
        let series_len = 900;
        let objectives: Vec<f64> = (0..60).map(|i| f64::from(i) / 40.0 - 0.5).collect();
        let table = table_with_objectives(&objectives, series_len);
        let cfg = config(series_len);

        let first = analyze(&table, &cfg).unwrap();
        let second = analyze(&table, &cfg).unwrap();
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.band, second.band);
        assert_eq!(first.best_series, second.best_series);
    }

    #[test]
    fn analyze_empty_table_degrades_gracefully() {
        let table = table_with_objectives(&[], 900);
        let analysis = analyze(&table, &config(900)).unwrap();
        assert_eq!(analysis.summary.n, 0);
        assert_eq!(analysis.summary.total, 0);
        assert_eq!(analysis.summary.threshold, -2.0);
        assert_eq!(analysis.summary.best_run_id, None);
        assert!(analysis.band.is_none());
        assert!(analysis.best_series.is_empty());
    }

    #[test]
    fn analyze_reports_best_run_objectives() {
        let objectives = vec![0.2, 0.95, 0.4];
        let table = table_with_objectives(&objectives, 900);
        let analysis = analyze(&table, &config(900)).unwrap();
        assert_eq!(analysis.summary.best_run_id, Some(1));
        assert_eq!(analysis.summary.nse_c, Some(0.95));
        assert_eq!(analysis.summary.nse_v, Some(0.95 - 0.1));
        assert_eq!(analysis.summary.pbias_c, Some(5.0));
        assert_eq!(analysis.summary.pbias_v, Some(-5.0));
    }

    #[test]
    fn analyze_rejects_misaligned_observed_series() {
        let table = table_with_objectives(&[0.5], 900);
        let mut cfg = config(900);
        cfg.observed.truncate(100);
        assert!(analyze(&table, &cfg).is_err());
    }

    #[test]
    fn summary_json_round_trip() {
        let summary = Summary {
            n: 42,
            total: 100,
            threshold: 0.55,
            best_run_id: Some(7),
            nse_c: Some(0.91),
            nse_v: Some(0.83),
            pbias_c: Some(-3.2),
            pbias_v: Some(6.8),
        };
        let path = std::env::temp_dir().join("hydroglue_summary_roundtrip.json");
        summary.save(&path).unwrap();
        let loaded = Summary::load(&path).unwrap();
        assert_eq!(summary, loaded);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn summary_json_uses_report_keys() {
        let summary = Summary {
            n: 1,
            total: 1,
            threshold: 0.7,
            best_run_id: Some(0),
            nse_c: Some(1.0),
            nse_v: None,
            pbias_c: Some(0.0),
            pbias_v: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"NSE_c\""));
        assert!(json.contains("\"PBIAS_v\""));
    }

    #[test]
    fn summary_path_naming() {
        assert_eq!(
            summary_path("/out", "fulda"),
            PathBuf::from("/out/fulda.result.json")
        );
    }

    #[test]
    fn period_scores_round_trip_for_perfect_run() {
        let series_len = 365 + 366 + 365; // 1999..2002, 2000 is a leap year
        let cfg = config(series_len);
        let mut table = RunTable::create(4, &[], series_len);
        table
            .append_rows(&[crate::table::RunRow {
                run_id: 0,
                objectives: vec![1.0, 1.0, 0.0, 0.0],
                parameters: vec![],
                simulation: cfg.observed.clone(),
            }])
            .unwrap();

        let scores = period_scores_for_row(&table, 0, &cfg).unwrap();
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!((scores[1] - 1.0).abs() < 1e-12);
        assert!(scores[2].abs() < 1e-9);
        assert!(scores[3].abs() < 1e-9);
    }
}
