//! Loop Feature Extraction
//!
//! This module provides static loop-feature extraction for compiled program
//! units: loop forest construction over a function's block graph, per-loop
//! feature vector computation (including symbolic trip-count lookup), and
//! the persistent run-identifier and dataset bookkeeping shared across
//! repeated invocations of the tool.

pub mod bounds;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod features;
pub mod forest;
pub mod ir;
pub mod run_id;

// Re-export commonly used types
pub use bounds::{BackedgeBounds, BoundOracle};
pub use dataset::{DatasetWriter, FeatureRecord, DATASET_HEADER};
pub use engine::{ExtractionEngine, ExtractionStats};
pub use error::ExtractorError;
pub use features::{FeatureAnalyzer, LoopFeatures};
pub use forest::{ForestBuilder, Loop, LoopForest};
pub use ir::{BasicBlock, CompilationUnit, Function, InstrRef, Instruction, OpcodeClass};
