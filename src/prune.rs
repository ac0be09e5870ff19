//! Physical pruning of a run-record table.
//!
//! A pruned table contains only the rows passing the keep predicate,
//! written to a sibling file with a `.pruned` marker. The original file is
//! never mutated or deleted, so a failed prune leaves everything intact and
//! the caller decides when to point future reads at the pruned copy.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::table::RunTable;
use crate::Result;

/// Path of the pruned sibling of a table file:
/// `<name>.runs.parquet` becomes `<name>.runs.pruned.parquet`.
#[must_use]
pub fn pruned_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let ext = path
        .extension()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    path.with_file_name(format!("{stem}.pruned.{ext}"))
}

/// Rewrite `table` keeping only rows whose primary objective meets
/// `keep_threshold`, and return the path of the new file.
///
/// An empty keep set still produces a valid, schema-correct empty table:
/// a fully non-behavioral ensemble is a reportable state, not an error.
///
/// # Errors
///
/// Returns [`crate::Error::StorageWriteError`] if the rewrite fails (the
/// original table is untouched), or [`crate::Error::StorageUnavailable`] if
/// the table was never persisted and has no path to derive from.
pub fn prune(table: &RunTable, keep_threshold: f64) -> Result<PathBuf> {
    let path = table.path().ok_or_else(|| crate::Error::StorageUnavailable {
        path: PathBuf::new(),
        reason: "cannot prune a table that has never been persisted".to_string(),
    })?;
    let new_path = pruned_path(path);
    let keep = table.filter_rows(|v| v >= keep_threshold)?;
    table.rewrite(&keep, &new_path)?;
    info!(
        from = %path.display(),
        to = %new_path.display(),
        kept = keep.len(),
        total = table.row_count(),
        keep_threshold,
        "pruned run-record table"
    );
    Ok(new_path)
}
