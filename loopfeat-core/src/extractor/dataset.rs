//! Dataset Writer
//!
//! Appends feature records to a single comma-separated dataset file shared
//! across all invocations of the tool. The 21-column header is written
//! exactly once, when the file is empty; reopening an already-populated
//! file never rewrites or duplicates it.
//!
//! Every record is flushed before the write returns, trading throughput
//! for crash-safety: a crash mid-run loses at most the in-flight record.
//!
//! Function and loop header names are written verbatim, unescaped. Names
//! containing commas shift the columns of their row; downstream consumers
//! must tolerate this. The dataset file is also shared mutable state
//! across processes with no locking. Both are known limitations.

use crate::extractor::error::ExtractorError;
use crate::extractor::features::LoopFeatures;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Fixed dataset header. Column order is normative; `num_preds` and
/// `num_unique_predicates` carry the same value.
pub const DATASET_HEADER: &str = "CodeID,Function,LoopHeader,num_instr,num_phis,num_calls,\
num_preds,num_succ,ends_with_unreachable,ends_with_return,ends_with_cond_branch,\
ends_with_branch,num_float_ops,nums_branchs,num_operands,num_memory_ops,\
num_unique_predicates,trip_count,num_uses,num_blocks_in_lp,loop_depth";

/// One immutable dataset row: a loop's feature vector keyed by
/// (run id, function name, loop header name).
///
/// Keys are not guaranteed globally unique when header names collide
/// across unrelated units in one run; duplicates are not deduplicated.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub run_id: u32,
    pub function: String,
    pub loop_header: String,
    pub features: LoopFeatures,
}

impl FeatureRecord {
    /// Serialize as one dataset row in header column order.
    /// Booleans are serialized as `1`/`0`.
    pub fn to_csv_row(&self) -> String {
        let f = &self.features;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.run_id,
            self.function,
            self.loop_header,
            f.num_instr,
            f.num_phis,
            f.num_calls,
            f.num_preds,
            f.num_succ,
            f.ends_with_unreachable as u8,
            f.ends_with_return as u8,
            f.ends_with_cond_branch as u8,
            f.ends_with_branch as u8,
            f.num_float_ops,
            f.nums_branchs,
            f.num_operands,
            f.num_memory_ops,
            f.num_unique_predicates,
            f.trip_count,
            f.num_uses,
            f.num_blocks_in_lp,
            f.loop_depth
        )
    }
}

/// Append-only writer for the feature dataset.
#[derive(Debug)]
pub struct DatasetWriter {
    path: PathBuf,
    file: File,
}

impl DatasetWriter {
    /// Open the dataset file in append mode, creating it if needed, and
    /// write the header if the file is empty.
    ///
    /// # Errors
    /// Returns `DatasetOpen` if the file cannot be opened or the header
    /// cannot be written. Open failure is fatal for the run: no record
    /// could be durably recorded.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ExtractorError> {
        let path = path.into();
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| ExtractorError::dataset_open(path.clone(), e))?;

        let is_empty = file.metadata().map(|m| m.len() == 0).unwrap_or(false);
        if is_empty {
            writeln!(file, "{}", DATASET_HEADER)
                .and_then(|_| file.flush())
                .map_err(|e| ExtractorError::dataset_open(path.clone(), e))?;
            log::info!("Initialized dataset {} with header", path.display());
        } else {
            log::info!("Appending to existing dataset {}", path.display());
        }

        Ok(Self { path, file })
    }

    /// Append one record and flush it to disk.
    ///
    /// # Errors
    /// Returns `DatasetWrite` on failure; the engine logs and counts the
    /// failure and continues with the remaining loops.
    pub fn write_record(&mut self, record: &FeatureRecord) -> Result<(), ExtractorError> {
        writeln!(self.file, "{}", record.to_csv_row())
            .and_then(|_| self.file.flush())
            .map_err(|e| ExtractorError::DatasetWrite {
                path: self.path.clone(),
                source: e,
            })
    }
}
