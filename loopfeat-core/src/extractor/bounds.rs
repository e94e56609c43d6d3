//! Symbolic Bound Oracle
//!
//! The extractor does not compute trip counts itself; it asks an oracle
//! whether a loop's backedge-taken count is a compile-time constant. The
//! trait is the seam a host compiler plugs its symbolic-bound machinery
//! into; `BackedgeBounds` is the map-backed implementation fed from
//! host-supplied constants in the unit file.

use crate::extractor::forest::Loop;
use crate::extractor::ir::Function;
use std::collections::HashMap;

/// Capability to prove a loop's backedge-taken count constant.
pub trait BoundOracle {
    /// The constant backedge-taken count of this loop, or `None` when the
    /// bound is unknown, unbounded, or symbolic.
    fn constant_backedge_count(&self, lp: &Loop) -> Option<u64>;
}

/// Map-backed bound oracle keyed by loop header block id.
#[derive(Debug, Clone, Default)]
pub struct BackedgeBounds {
    counts: HashMap<u32, u64>,
}

impl BackedgeBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the oracle for one function by resolving its name-keyed
    /// `backedge_counts` to header block ids. Names that match no block
    /// are logged and dropped.
    pub fn for_function(function: &Function) -> Self {
        let mut counts: HashMap<u32, u64> = HashMap::new();
        for (header_name, &count) in function.backedge_counts.iter() {
            match function.blocks.iter().find(|b| &b.name == header_name) {
                Some(block) => {
                    counts.insert(block.id, count);
                }
                None => {
                    log::warn!(
                        "Backedge count for unknown block {} in function {}",
                        header_name,
                        function.name
                    );
                }
            }
        }
        Self { counts }
    }

    /// Record a constant backedge-taken count for a header block.
    pub fn set(&mut self, header: u32, count: u64) {
        self.counts.insert(header, count);
    }
}

impl BoundOracle for BackedgeBounds {
    fn constant_backedge_count(&self, lp: &Loop) -> Option<u64> {
        self.counts.get(&lp.header).copied()
    }
}
