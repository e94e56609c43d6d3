//! CLI Commands
//!
//! Host-driver command bodies: `analyze` runs the extraction engine over
//! unit JSON files against a dataset and counter path; `inspect` prints a
//! unit's loop-forest summary without touching the dataset.

use anyhow::{Context, Result};
use loopfeat_core::extractor::engine::{ExtractionEngine, ExtractionStats};
use loopfeat_core::extractor::forest::{ForestBuilder, Loop};
use loopfeat_core::extractor::ir::CompilationUnit;
use std::path::Path;

/// Analyze one or more compilation units and append their loop features
/// to the dataset.
///
/// Units are processed in order; all loop records for one unit are written
/// before the next unit is loaded. The engine's run counter is persisted
/// when the last unit is done.
pub fn analyze_units(
    unit_paths: &[std::path::PathBuf],
    dataset_path: &Path,
    counter_path: &Path,
) -> Result<ExtractionStats> {
    let mut engine = ExtractionEngine::new(dataset_path, counter_path)
        .context("failed to initialize extraction engine")?;

    for path in unit_paths {
        let unit = CompilationUnit::from_json_file(path)
            .with_context(|| format!("failed to load unit {}", path.display()))?;
        engine.analyze_unit(&unit);
    }

    Ok(engine.shutdown())
}

/// Print a loop-forest summary for one unit without writing the dataset.
pub fn inspect_unit(path: &Path) -> Result<()> {
    let unit = CompilationUnit::from_json_file(path)
        .with_context(|| format!("failed to load unit {}", path.display()))?;

    println!("unit: {}", unit.name);
    for function in unit.functions.iter() {
        if function.is_declaration() {
            println!("  fn {} (declaration, skipped)", function.name);
            continue;
        }
        let forest = ForestBuilder::build(function);
        println!(
            "  fn {} ({} blocks, {} loops)",
            function.name,
            function.blocks.len(),
            forest.loop_count()
        );
        for lp in forest.roots.iter() {
            print_loop(function, lp);
        }
    }
    Ok(())
}

fn print_loop(function: &loopfeat_core::extractor::ir::Function, lp: &Loop) {
    let header = function
        .block(lp.header)
        .map(|b| b.name.as_str())
        .unwrap_or("<unknown>");
    println!(
        "    {}loop header={} depth={} blocks={} back_edges={}",
        "  ".repeat(lp.depth.saturating_sub(1) as usize),
        header,
        lp.depth,
        lp.num_blocks(),
        lp.back_edges.len()
    );
    for child in lp.children.iter() {
        print_loop(function, child);
    }
}
