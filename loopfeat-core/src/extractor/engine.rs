//! Extraction Engine
//!
//! Orchestrates a run: for each compilation unit, walk every function's
//! loop forest and hand one feature record per loop to the dataset writer.
//! The engine owns the run counter and the writer outright; there is no
//! process-global state.
//!
//! # Control Flow
//! 1. Claim the run identifier (once per process, on first use)
//! 2. For each function with a body, build or receive its loop forest and
//!    bound oracle
//! 3. Recursively analyze every loop in the forest, writing each record
//!    immediately upon completing that loop
//! 4. At shutdown, persist the counter and report run statistics
//!
//! Single-threaded and synchronous: all processing for one unit completes
//! before the next is accepted. A failed row write is logged and counted,
//! never allowed to abort sibling or parent loops. The engine never
//! mutates the analyzed program.

use crate::extractor::bounds::{BackedgeBounds, BoundOracle};
use crate::extractor::dataset::{DatasetWriter, FeatureRecord};
use crate::extractor::error::ExtractorError;
use crate::extractor::features::FeatureAnalyzer;
use crate::extractor::forest::{ForestBuilder, Loop, LoopForest};
use crate::extractor::ir::{CompilationUnit, Function};
use crate::extractor::run_id::RunCounter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Statistics collected during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub units: usize,
    pub functions_analyzed: usize,
    pub declarations_skipped: usize,
    pub loops_analyzed: usize,
    pub records_written: usize,
    pub records_failed: usize,
}

/// Loop feature extraction engine.
///
/// Constructed once by the host driver and fed compilation units one at a
/// time; `shutdown` persists the run counter.
#[derive(Debug)]
pub struct ExtractionEngine {
    counter: RunCounter,
    writer: DatasetWriter,
    stats: ExtractionStats,
}

impl ExtractionEngine {
    /// Open the dataset and load the run counter.
    ///
    /// # Errors
    /// Fails only if the dataset cannot be opened; a missing counter file
    /// is the normal first-run state.
    pub fn new(dataset_path: &Path, counter_path: &Path) -> Result<Self, ExtractorError> {
        let writer = DatasetWriter::open(dataset_path)?;
        let counter = RunCounter::load(counter_path);
        Ok(Self::with_parts(counter, writer))
    }

    /// Assemble an engine from host-constructed parts.
    pub fn with_parts(counter: RunCounter, writer: DatasetWriter) -> Self {
        Self {
            counter,
            writer,
            stats: ExtractionStats::default(),
        }
    }

    /// Analyze one compilation unit.
    ///
    /// Declarations are skipped; functions without loops contribute zero
    /// rows. Loop forests are built from each function's block graph and
    /// bound oracles from its host-supplied backedge counts.
    pub fn analyze_unit(&mut self, unit: &CompilationUnit) {
        let run_id = self.counter.current_run_id();
        log::info!("Analyzing unit {} with run id {}", unit.name, run_id);

        for function in unit.functions.iter() {
            if function.is_declaration() {
                log::debug!("Skipping declaration {}", function.name);
                self.stats.declarations_skipped += 1;
                continue;
            }
            let forest = ForestBuilder::build(function);
            let bounds = BackedgeBounds::for_function(function);
            self.analyze_function(function, &forest, &bounds, run_id);
        }

        self.stats.units += 1;
    }

    /// Analyze one function against an explicit forest and oracle.
    ///
    /// Entry point for hosts that carry their own loop analysis; the
    /// forest and oracle from `analyze_unit` take this same path.
    pub fn analyze_function(
        &mut self,
        function: &Function,
        forest: &LoopForest,
        oracle: &dyn BoundOracle,
        run_id: u32,
    ) {
        self.stats.functions_analyzed += 1;
        let loop_count = forest.loop_count();
        log::info!("{} loops detected in {}", loop_count, function.name);
        if forest.is_empty() {
            log::debug!("No loops found in function {}", function.name);
            return;
        }

        for lp in forest.roots.iter() {
            self.analyze_loop(function, lp, oracle, run_id);
        }
    }

    /// Analyze one loop, write its record, then recurse into sub-loops.
    ///
    /// Each nesting level produces its own record over its own member-block
    /// set. A write failure is logged and counted; traversal continues.
    fn analyze_loop(&mut self, function: &Function, lp: &Loop, oracle: &dyn BoundOracle, run_id: u32) {
        let header_name = function
            .block(lp.header)
            .map(|b| b.name.clone())
            .unwrap_or_default();
        log::debug!("Processing loop in {}, header: {}", function.name, header_name);

        let features = FeatureAnalyzer::analyze_loop(function, lp, oracle);
        self.stats.loops_analyzed += 1;

        let record = FeatureRecord {
            run_id,
            function: function.name.clone(),
            loop_header: header_name,
            features,
        };
        match self.writer.write_record(&record) {
            Ok(()) => {
                self.stats.records_written += 1;
                log::debug!(
                    "Wrote features for loop in {}, header: {}, run id: {}",
                    record.function,
                    record.loop_header,
                    run_id
                );
            }
            Err(e) => {
                self.stats.records_failed += 1;
                log::warn!(
                    "Failed to write record for loop {} in {}: {}",
                    record.loop_header,
                    record.function,
                    e
                );
            }
        }

        for child in lp.children.iter() {
            self.analyze_loop(function, child, oracle, run_id);
        }
    }

    /// The run identifier for this process, claiming it if necessary.
    pub fn current_run_id(&mut self) -> u32 {
        self.counter.current_run_id()
    }

    /// Statistics so far.
    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// Persist the run counter and finish the run.
    ///
    /// A counter save failure is reported but does not roll back dataset
    /// rows already written.
    pub fn shutdown(self) -> ExtractionStats {
        if let Err(e) = self.counter.save() {
            log::warn!("Could not persist run counter: {}", e);
        }
        log::info!(
            "Run complete: {} units, {} functions, {} loops, {} records written, {} failed",
            self.stats.units,
            self.stats.functions_analyzed,
            self.stats.loops_analyzed,
            self.stats.records_written,
            self.stats.records_failed
        );
        self.stats
    }
}
