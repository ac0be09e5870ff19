//! Run-record table storage (Arrow/Parquet).
//!
//! One row per simulation run: an integer run id, one `Float64` column per
//! objective (`like1`, `like2`, ..., `like1` is the primary objective), one
//! `Float64` column per calibrated parameter (`par` prefix disambiguates
//! from objectives), and a `FixedSizeList<Float64>` column holding the full
//! simulated discharge series. Every row in a table shares the same
//! parameter set and series length; the list type enforces the latter.
//!
//! Write pattern is append-only: the calibration driver accumulates rows and
//! saves, the analysis side reads columns and rewrites filtered copies. A
//! rewrite always targets a new file and never touches the original, so a
//! failed rewrite can never corrupt prior results.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, FixedSizeListArray, Float64Array, Int64Array, UInt32Array};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info};

use crate::{Error, Result};

/// Column name of the run identifier.
pub const RUN_ID_COLUMN: &str = "run_id";
/// Column name prefix of objective (goodness-of-fit) columns.
pub const OBJECTIVE_PREFIX: &str = "like";
/// Column name prefix of calibrated-parameter columns.
pub const PARAMETER_PREFIX: &str = "par";
/// Column name of the simulated series.
pub const SIMULATION_COLUMN: &str = "simulation";

/// Table filename for a model/session name: `<name>.runs.parquet`.
pub fn table_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{name}.runs.parquet"))
}

/// One run record on its way into the table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    /// Run identifier assigned by the calibration driver
    pub run_id: i64,
    /// Goodness-of-fit values, one per objective column, `like1` first
    pub objectives: Vec<f64>,
    /// Parameter values in the table's declared parameter order
    pub parameters: Vec<f64>,
    /// Simulated discharge series, one value per timestep
    pub simulation: Vec<f64>,
}

/// A columnar run-record table.
///
/// Opened read-only by the analysis subsystem, or created empty and appended
/// to by the calibration driver. Batches live in memory after open; the file
/// handle is released as soon as the load completes.
#[derive(Debug)]
pub struct RunTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    objective_names: Vec<String>,
    parameter_names: Vec<String>,
    series_len: usize,
    path: Option<PathBuf>,
}

impl RunTable {
    /// Create an empty in-memory table for the given layout.
    ///
    /// `parameter_names` are the bare names; the `par` column prefix is
    /// applied internally.
    #[must_use]
    pub fn create(objective_count: usize, parameter_names: &[String], series_len: usize) -> Self {
        let objective_names: Vec<String> = (1..=objective_count)
            .map(|i| format!("{OBJECTIVE_PREFIX}{i}"))
            .collect();
        let schema = Arc::new(build_schema(&objective_names, parameter_names, series_len));
        Self {
            schema,
            batches: Vec::new(),
            objective_names,
            parameter_names: parameter_names.to_vec(),
            series_len,
            path: None,
        }
    }

    /// Open an existing table from a Parquet file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageUnavailable`] if the file is missing,
    /// unreadable, or its schema does not match the expected column layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| Error::StorageUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let file =
            File::open(path).map_err(|e| unavailable(format!("cannot open file: {e}")))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| unavailable(format!("not a readable Parquet file: {e}")))?;
        let schema = builder.schema().clone();
        let layout = TableLayout::from_schema(&schema).map_err(unavailable)?;

        let reader = builder
            .build()
            .map_err(|e| unavailable(format!("cannot create reader: {e}")))?;
        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch.map_err(|e| unavailable(format!("decode failed: {e}")))?);
        }

        let table = Self {
            schema,
            batches,
            objective_names: layout.objective_names,
            parameter_names: layout.parameter_names,
            series_len: layout.series_len,
            path: Some(path.to_path_buf()),
        };
        debug!(
            path = %path.display(),
            rows = table.row_count(),
            objectives = table.objective_names.len(),
            parameters = table.parameter_names.len(),
            series_len = table.series_len,
            "opened run-record table"
        );
        Ok(table)
    }

    /// Append run rows as one record batch.
    ///
    /// # Errors
    ///
    /// Returns an error if any row's objective, parameter, or series length
    /// disagrees with the table layout.
    pub fn append_rows(&mut self, rows: &[RunRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        for row in rows {
            if row.objectives.len() != self.objective_names.len()
                || row.parameters.len() != self.parameter_names.len()
                || row.simulation.len() != self.series_len
            {
                return Err(Error::StorageWriteError(format!(
                    "row {} does not match table layout \
                     ({} objectives, {} parameters, series length {})",
                    row.run_id,
                    self.objective_names.len(),
                    self.parameter_names.len(),
                    self.series_len,
                )));
            }
        }

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.schema.fields().len());
        columns.push(Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.run_id),
        )));
        for i in 0..self.objective_names.len() {
            columns.push(Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.objectives[i]),
            )));
        }
        for i in 0..self.parameter_names.len() {
            columns.push(Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.parameters[i]),
            )));
        }
        columns.push(Arc::new(simulation_array(
            rows.iter().map(|r| r.simulation.as_slice()),
            self.series_len,
        )?));

        let batch = RecordBatch::try_new(self.schema.clone(), columns)?;
        self.batches.push(batch);
        Ok(())
    }

    /// Persist the table to a Parquet file and remember the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWriteError`] on I/O failure.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        write_parquet(&self.schema, &self.batches, path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Path the table was opened from or last saved to.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Total number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Objective column names in table order (`like1` first).
    #[must_use]
    pub fn objective_names(&self) -> &[String] {
        &self.objective_names
    }

    /// Bare calibrated-parameter names in table order.
    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Length of the simulated series shared by all rows.
    #[must_use]
    pub const fn series_len(&self) -> usize {
        self.series_len
    }

    /// Run id column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column cannot be decoded.
    pub fn run_ids(&self) -> Result<Vec<i64>> {
        let idx = self.column_index(RUN_ID_COLUMN)?;
        let mut out = Vec::with_capacity(self.row_count());
        for batch in &self.batches {
            let array = downcast::<Int64Array>(batch.column(idx), RUN_ID_COLUMN)?;
            out.extend(array.values().iter().copied());
        }
        Ok(out)
    }

    /// Full objective column by name (e.g. `like1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or cannot be decoded.
    pub fn objective(&self, name: &str) -> Result<Vec<f64>> {
        self.float_column(name)
    }

    /// The primary objective column (`like1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the column cannot be decoded.
    pub fn primary_objective(&self) -> Result<Vec<f64>> {
        self.float_column(&format!("{OBJECTIVE_PREFIX}1"))
    }

    /// Full parameter column by bare name (the `par` prefix is applied here).
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or cannot be decoded.
    pub fn parameter(&self, name: &str) -> Result<Vec<f64>> {
        self.float_column(&format!("{PARAMETER_PREFIX}{name}"))
    }

    /// All objective values of a single row, in table order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if the row index is out of range.
    pub fn objectives_for_row(&self, row: usize) -> Result<Vec<f64>> {
        let (batch, local) = self.locate(row)?;
        self.objective_names
            .iter()
            .map(|name| {
                let idx = self.column_index(name)?;
                let array = downcast::<Float64Array>(batch.column(idx), name)?;
                Ok(array.value(local))
            })
            .collect()
    }

    /// The simulated series of a single row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if the row index is out of range.
    pub fn simulation(&self, row: usize) -> Result<Vec<f64>> {
        let (batch, local) = self.locate(row)?;
        let idx = self.column_index(SIMULATION_COLUMN)?;
        let list = downcast::<FixedSizeListArray>(batch.column(idx), SIMULATION_COLUMN)?;
        let values = list.value(local);
        let floats = downcast::<Float64Array>(&values, SIMULATION_COLUMN)?;
        Ok(floats.values().to_vec())
    }

    /// Simulated series of the selected rows, in selection order.
    ///
    /// # Errors
    ///
    /// Returns an error if any index is out of range.
    pub fn simulations(&self, rows: &[usize]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|&r| self.simulation(r)).collect()
    }

    /// Indices of rows whose primary objective passes `predicate`, in
    /// original order.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary objective column cannot be decoded.
    pub fn filter_rows(&self, predicate: impl Fn(f64) -> bool) -> Result<Vec<usize>> {
        let objective = self.primary_objective()?;
        Ok(objective
            .iter()
            .enumerate()
            .filter(|(_, &v)| predicate(v))
            .map(|(i, _)| i)
            .collect())
    }

    /// Write a new table at `new_path` containing only `keep` rows, in their
    /// original order, with identical schema.
    ///
    /// The original file is never touched; on failure the caller keeps a
    /// fully intact table. An empty `keep` produces a valid empty table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWriteError`] on I/O or encoding failure.
    pub fn rewrite(&self, keep: &[usize], new_path: impl AsRef<Path>) -> Result<()> {
        let new_path = new_path.as_ref();
        let total = self.row_count();
        let write_failed = |e: String| Error::StorageWriteError(e);

        let batches = if keep.is_empty() {
            Vec::new()
        } else {
            let indices: Vec<u32> = keep
                .iter()
                .map(|&i| {
                    if i >= total {
                        return Err(write_failed(format!(
                            "keep index {i} out of range for {total} rows"
                        )));
                    }
                    u32::try_from(i).map_err(|_| write_failed(format!("keep index {i} too large")))
                })
                .collect::<Result<_>>()?;
            let indices = UInt32Array::from(indices);

            let merged = compute::concat_batches(&self.schema, &self.batches)
                .map_err(|e| write_failed(format!("concat failed: {e}")))?;
            let columns: Vec<ArrayRef> = merged
                .columns()
                .iter()
                .map(|col| compute::take(col, &indices, None))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| write_failed(format!("row selection failed: {e}")))?;
            let batch = RecordBatch::try_new(self.schema.clone(), columns)
                .map_err(|e| write_failed(format!("batch assembly failed: {e}")))?;
            vec![batch]
        };

        write_parquet(&self.schema, &batches, new_path)?;
        info!(
            new_path = %new_path.display(),
            kept = keep.len(),
            total,
            "rewrote run-record table"
        );
        Ok(())
    }

    /// Release the in-memory batches. Safe to call multiple times; further
    /// reads see an empty table. Dropping the table has the same effect.
    pub fn close(&mut self) {
        self.batches.clear();
    }

    fn float_column(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        let mut out = Vec::with_capacity(self.row_count());
        for batch in &self.batches {
            let array = downcast::<Float64Array>(batch.column(idx), name)?;
            out.extend(array.values().iter().copied());
        }
        Ok(out)
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.schema.index_of(name).map_err(Error::from)
    }

    fn locate(&self, row: usize) -> Result<(&RecordBatch, usize)> {
        let mut remaining = row;
        for batch in &self.batches {
            if remaining < batch.num_rows() {
                return Ok((batch, remaining));
            }
            remaining -= batch.num_rows();
        }
        Err(Error::InsufficientData(format!(
            "row {row} out of range for {} rows",
            self.row_count()
        )))
    }
}

/// Validated column layout of a run-record table.
#[derive(Debug)]
struct TableLayout {
    objective_names: Vec<String>,
    parameter_names: Vec<String>,
    series_len: usize,
}

impl TableLayout {
    /// Check a schema against the expected layout, in field order.
    fn from_schema(schema: &SchemaRef) -> std::result::Result<Self, String> {
        let mut objective_names = Vec::new();
        let mut parameter_names = Vec::new();
        let mut has_run_id = false;
        let mut series_len = None;

        for field in schema.fields() {
            let name = field.name().as_str();
            match name {
                RUN_ID_COLUMN => {
                    if field.data_type() != &DataType::Int64 {
                        return Err(format!("column {name} must be Int64"));
                    }
                    has_run_id = true;
                }
                SIMULATION_COLUMN => match field.data_type() {
                    DataType::FixedSizeList(inner, len)
                        if inner.data_type() == &DataType::Float64 =>
                    {
                        series_len = Some(usize::try_from(*len).map_err(|_| {
                            format!("column {name} has negative list size {len}")
                        })?);
                    }
                    other => {
                        return Err(format!(
                            "column {name} must be FixedSizeList<Float64>, got {other}"
                        ));
                    }
                },
                _ if name.starts_with(OBJECTIVE_PREFIX) => {
                    if field.data_type() != &DataType::Float64 {
                        return Err(format!("objective column {name} must be Float64"));
                    }
                    objective_names.push(name.to_string());
                }
                _ if name.starts_with(PARAMETER_PREFIX) => {
                    if field.data_type() != &DataType::Float64 {
                        return Err(format!("parameter column {name} must be Float64"));
                    }
                    parameter_names.push(name[PARAMETER_PREFIX.len()..].to_string());
                }
                _ => return Err(format!("unexpected column {name}")),
            }
        }

        if !has_run_id {
            return Err(format!("missing {RUN_ID_COLUMN} column"));
        }
        if objective_names.is_empty() {
            return Err(format!("no {OBJECTIVE_PREFIX}* objective columns"));
        }
        let Some(series_len) = series_len else {
            return Err(format!("missing {SIMULATION_COLUMN} column"));
        };
        Ok(Self {
            objective_names,
            parameter_names,
            series_len,
        })
    }
}

fn build_schema(
    objective_names: &[String],
    parameter_names: &[String],
    series_len: usize,
) -> Schema {
    let mut fields = Vec::with_capacity(objective_names.len() + parameter_names.len() + 2);
    fields.push(Field::new(RUN_ID_COLUMN, DataType::Int64, false));
    for name in objective_names {
        fields.push(Field::new(name.as_str(), DataType::Float64, false));
    }
    for name in parameter_names {
        fields.push(Field::new(
            format!("{PARAMETER_PREFIX}{name}"),
            DataType::Float64,
            false,
        ));
    }
    fields.push(Field::new(
        SIMULATION_COLUMN,
        DataType::FixedSizeList(
            Arc::new(Field::new("item", DataType::Float64, false)),
            i32::try_from(series_len).unwrap_or(i32::MAX),
        ),
        false,
    ));
    Schema::new(fields)
}

fn simulation_array<'a>(
    rows: impl Iterator<Item = &'a [f64]>,
    series_len: usize,
) -> Result<FixedSizeListArray> {
    let mut values = Vec::new();
    for row in rows {
        values.extend_from_slice(row);
    }
    let size = i32::try_from(series_len)
        .map_err(|_| Error::StorageWriteError(format!("series length {series_len} too large")))?;
    FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float64, false)),
        size,
        Arc::new(Float64Array::from(values)),
        None,
    )
    .map_err(Error::from)
}

fn write_parquet(schema: &SchemaRef, batches: &[RecordBatch], path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::StorageWriteError(format!("cannot create {}: {e}", path.display())))?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
        .map_err(|e| Error::StorageWriteError(format!("cannot start writer: {e}")))?;
    for batch in batches {
        writer
            .write(batch)
            .map_err(|e| Error::StorageWriteError(format!("write failed: {e}")))?;
    }
    writer
        .close()
        .map_err(|e| Error::StorageWriteError(format!("finalize failed: {e}")))?;
    Ok(())
}

fn downcast<'a, T: Array + 'static>(array: &'a dyn Array, name: &str) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::StorageUnavailable {
            path: PathBuf::new(),
            reason: format!("column {name} has unexpected in-memory type"),
        }
    })
}
