//! # Hydroglue: GLUE ensemble result analysis
//!
//! Hydroglue analyzes completed calibration ensembles of lumped
//! rainfall-runoff models. The calibration driver persists one row per
//! simulation run (objectives, parameters, simulated discharge series) in a
//! columnar Parquet table; this crate classifies runs as behavioral via an
//! iterative GLUE threshold search, computes the per-timestep uncertainty
//! envelope across the behavioral subset, and physically prunes the table to
//! the retained rows without ever touching the original file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use hydroglue::periods::Periods;
//! use hydroglue::summary::{analyze, AnalysisConfig};
//! use hydroglue::table::RunTable;
//!
//! let table = RunTable::open("data/fulda.runs.parquet")?;
//! let config = AnalysisConfig::new(
//!     vec![0.0; table.series_len()],
//!     NaiveDate::from_ymd_opt(1991, 1, 1).unwrap(),
//!     Periods::new(2000, 2010)?,
//! );
//! let analysis = analyze(&table, &config)?;
//! println!(
//!     "NSE >= {:.2}, n = {} of {}",
//!     analysis.summary.threshold, analysis.summary.n, analysis.summary.total
//! );
//!
//! // Keep only the behavioral rows, as a new file next to the original.
//! let pruned = hydroglue::prune::prune(&table, analysis.summary.threshold)?;
//! println!("pruned table at {}", pruned.display());
//! # Ok::<(), hydroglue::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod band;
pub mod error;
pub mod metrics;
pub mod periods;
pub mod prune;
pub mod summary;
pub mod table;
pub mod threshold;

pub use error::{Error, Result};
