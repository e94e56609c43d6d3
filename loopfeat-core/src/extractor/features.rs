//! Loop Feature Computation
//!
//! Computes the per-loop feature vector over exactly the loop's member
//! blocks (blocks shared with nested sub-loops included). One record is
//! produced per loop per nesting level; a sub-loop's blocks are counted
//! again in its own record.
//!
//! # Terminator Flag Semantics
//! `ends_with_return` and `ends_with_unreachable` are OR'd across *every*
//! member block's terminator, not just the loop's exit blocks. This is the
//! behavior the downstream dataset was built with, so it is kept even
//! though an exit-block-only reading would be the more conventional one.
//! `ends_with_branch` / `ends_with_cond_branch` are likewise set by any
//! branch / any conditional branch instruction in the loop.

use crate::extractor::bounds::BoundOracle;
use crate::extractor::forest::Loop;
use crate::extractor::ir::{Function, OpcodeClass};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Feature vector of a single loop.
///
/// Field order matches the dataset column order; `num_preds` and
/// `num_unique_predicates` are the same value serialized under two column
/// names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopFeatures {
    /// Instructions in the loop's member blocks
    pub num_instr: u32,
    /// Phi nodes
    pub num_phis: u32,
    /// Call-class instructions
    pub num_calls: u32,
    /// Distinct predecessor blocks of member blocks, in-loop ones included
    pub num_preds: u32,
    /// Distinct successor blocks of member blocks, in-loop ones included
    pub num_succ: u32,
    /// Any member block terminates in unreachable
    pub ends_with_unreachable: bool,
    /// Any member block terminates in a return
    pub ends_with_return: bool,
    /// Any conditional branch in the loop
    pub ends_with_cond_branch: bool,
    /// Any branch in the loop
    pub ends_with_branch: bool,
    /// Floating-point add/sub/mul/div instructions
    pub num_float_ops: u32,
    /// Branch instructions of any kind
    pub nums_branchs: u32,
    /// Sum of operand counts over all instructions
    pub num_operands: u32,
    /// Load + store instructions
    pub num_memory_ops: u32,
    /// Alias of `num_preds`
    pub num_unique_predicates: u32,
    /// Constant backedge-taken count + 1, or 0 when not provably constant
    pub trip_count: u64,
    /// (instruction, user) pairs with both endpoints inside the loop
    pub num_uses: u32,
    /// Member block count
    pub num_blocks_in_lp: u32,
    /// Nesting depth, 1 = top-level
    pub loop_depth: u32,
}

/// Computes feature vectors for loops.
pub struct FeatureAnalyzer;

impl FeatureAnalyzer {
    /// Compute the feature vector of one loop.
    ///
    /// # Algorithm
    /// Single pass over the loop's member blocks:
    /// - per instruction: opcode-class counters, operand sum, and use edges
    ///   whose user also sits inside the loop
    /// - per block: terminator flags and predecessor/successor blocks into
    ///   distinct sets (`BitVec` over the function's blocks)
    /// Afterwards the trip count is taken from the bound oracle:
    /// constant backedge-taken count + 1, or the 0 sentinel.
    ///
    /// Never fails: an unprovable trip count is the sentinel, not an error,
    /// and malformed edges are skipped by bounds checks.
    pub fn analyze_loop(function: &Function, lp: &Loop, oracle: &dyn BoundOracle) -> LoopFeatures {
        let num_blocks = function.blocks.len();
        let mut unique_preds: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        let mut unique_succs: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        let mut features = LoopFeatures::default();

        for block_idx in lp.blocks.iter_ones() {
            let block = match function.block(block_idx as u32) {
                Some(block) => block,
                None => continue,
            };
            features.num_blocks_in_lp += 1;

            for instr in block.instructions.iter() {
                features.num_instr += 1;
                features.num_operands += instr.num_operands;

                match instr.opcode {
                    OpcodeClass::Phi => features.num_phis += 1,
                    OpcodeClass::Call => features.num_calls += 1,
                    OpcodeClass::Load | OpcodeClass::Store => features.num_memory_ops += 1,
                    OpcodeClass::Branch => {
                        features.nums_branchs += 1;
                        features.ends_with_branch = true;
                    }
                    OpcodeClass::CondBranch => {
                        features.nums_branchs += 1;
                        features.ends_with_branch = true;
                        features.ends_with_cond_branch = true;
                    }
                    OpcodeClass::FloatArith => features.num_float_ops += 1,
                    _ => {}
                }

                for user in instr.uses.iter() {
                    if lp.contains(user.block) {
                        features.num_uses += 1;
                    }
                }
            }

            if let Some(terminator) = block.terminator() {
                match terminator.opcode {
                    OpcodeClass::Return => features.ends_with_return = true,
                    OpcodeClass::Unreachable => features.ends_with_unreachable = true,
                    _ => {}
                }
            }

            for &pred in block.predecessors.iter() {
                if (pred as usize) < num_blocks {
                    unique_preds.set(pred as usize, true);
                }
            }
            for &succ in block.successors.iter() {
                if (succ as usize) < num_blocks {
                    unique_succs.set(succ as usize, true);
                }
            }
        }

        features.num_preds = unique_preds.count_ones() as u32;
        features.num_unique_predicates = features.num_preds;
        features.num_succ = unique_succs.count_ones() as u32;

        features.trip_count = match oracle.constant_backedge_count(lp) {
            Some(count) => count.saturating_add(1),
            None => {
                log::debug!(
                    "Trip count not constant for loop with header {} in {}",
                    lp.header,
                    function.name
                );
                0u64
            }
        };

        features.loop_depth = lp.depth;
        features
    }
}
