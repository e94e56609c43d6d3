// Unit tests for per-loop feature computation
mod utils;

use bitvec::prelude::*;
use loopfeat_core::extractor::bounds::BackedgeBounds;
use loopfeat_core::extractor::features::FeatureAnalyzer;
use loopfeat_core::extractor::forest::{ForestBuilder, Loop};
use loopfeat_core::extractor::ir::OpcodeClass;
use smallvec::SmallVec;
use utils::{block, function, function_with_bounds, instr, instr_with_uses};

#[test]
fn test_single_loop_with_constant_bound() {
    // entry -> loop -> exit, with the loop branching back to itself.
    // The loop body holds a phi, a load, a store, and a conditional branch;
    // the host proved a constant backedge-taken count of 9.
    let f = function_with_bounds(
        "f",
        vec![
            block(0, "entry", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(
                1,
                "loop",
                vec![
                    // phi used by the store below (in-loop) and by the exit block (out-of-loop)
                    instr_with_uses(OpcodeClass::Phi, 2, &[(1, 2), (2, 0)]),
                    instr(OpcodeClass::Load, 1),
                    instr(OpcodeClass::Store, 2),
                    instr(OpcodeClass::CondBranch, 3),
                ],
                &[1, 2],
            ),
            block(2, "exit", vec![instr(OpcodeClass::Return, 1)], &[]),
        ],
        &[("loop", 9)],
    );

    let forest = ForestBuilder::build(&f);
    assert_eq!(forest.loop_count(), 1);
    let lp = &forest.roots[0];

    let bounds = BackedgeBounds::for_function(&f);
    let features = FeatureAnalyzer::analyze_loop(&f, lp, &bounds);

    assert_eq!(features.num_instr, 4);
    assert_eq!(features.num_phis, 1);
    assert_eq!(features.num_calls, 0);
    assert_eq!(features.num_memory_ops, 2);
    assert_eq!(features.nums_branchs, 1);
    assert!(features.ends_with_branch);
    assert!(features.ends_with_cond_branch);
    assert!(!features.ends_with_return);
    assert!(!features.ends_with_unreachable);
    assert_eq!(features.num_operands, 8);
    // predecessors of the loop block: entry and itself
    assert_eq!(features.num_preds, 2);
    assert_eq!(features.num_unique_predicates, features.num_preds);
    // successors of the loop block: itself and exit
    assert_eq!(features.num_succ, 2);
    // only the in-loop user of the phi counts
    assert_eq!(features.num_uses, 1);
    assert_eq!(features.trip_count, 10);
    assert_eq!(features.num_blocks_in_lp, 1);
    assert_eq!(features.loop_depth, 1);
}

#[test]
fn test_unknown_bound_records_sentinel() {
    let f = function(
        "f",
        vec![
            block(0, "entry", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(1, "loop", vec![instr(OpcodeClass::CondBranch, 3)], &[1, 2]),
            block(2, "exit", vec![instr(OpcodeClass::Return, 1)], &[]),
        ],
    );
    let forest = ForestBuilder::build(&f);
    let bounds = BackedgeBounds::for_function(&f);
    let features = FeatureAnalyzer::analyze_loop(&f, &forest.roots[0], &bounds);
    assert_eq!(features.trip_count, 0);
}

#[test]
fn test_nested_loops_produce_independent_vectors() {
    // 0 -> 1; 1 -> {2, 4}; 2 -> {3, 1}; 3 -> 2; 4 exit.
    // Outer loop {1, 2, 3} (header 1), inner loop {2, 3} (header 2).
    let f = function_with_bounds(
        "nested",
        vec![
            block(0, "entry", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(
                1,
                "outer",
                vec![instr(OpcodeClass::Phi, 2), instr(OpcodeClass::CondBranch, 3)],
                &[2, 4],
            ),
            block(
                2,
                "inner",
                vec![
                    instr(OpcodeClass::Phi, 2),
                    instr(OpcodeClass::Load, 1),
                    instr(OpcodeClass::CondBranch, 3),
                ],
                &[3, 1],
            ),
            block(3, "latch", vec![instr(OpcodeClass::Branch, 1)], &[2]),
            block(4, "exit", vec![instr(OpcodeClass::Return, 1)], &[]),
        ],
        &[("inner", 4)],
    );

    let forest = ForestBuilder::build(&f);
    assert_eq!(forest.loop_count(), 2);
    let outer = &forest.roots[0];
    let inner = &outer.children[0];

    let bounds = BackedgeBounds::for_function(&f);
    let outer_features = FeatureAnalyzer::analyze_loop(&f, outer, &bounds);
    let inner_features = FeatureAnalyzer::analyze_loop(&f, inner, &bounds);

    // Each level counts its own member-block set; the outer set includes
    // the inner blocks.
    assert_eq!(outer_features.num_blocks_in_lp, 3);
    assert_eq!(inner_features.num_blocks_in_lp, 2);
    assert!(outer_features.num_blocks_in_lp >= inner_features.num_blocks_in_lp);
    assert_eq!(outer_features.loop_depth, 1);
    assert_eq!(inner_features.loop_depth, 2);
    // Outer instruction count includes the inner loop's instructions
    assert_eq!(outer_features.num_instr, 6);
    assert_eq!(inner_features.num_instr, 4);
    // Only the inner header has a constant bound
    assert_eq!(outer_features.trip_count, 0);
    assert_eq!(inner_features.trip_count, 5);
}

#[test]
fn test_pred_succ_sets_deduplicate_across_blocks() {
    // Both loop blocks share the header as a predecessor source; the sets
    // must collapse duplicates.
    let f = function(
        "dedup",
        vec![
            block(0, "entry", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(1, "head", vec![instr(OpcodeClass::CondBranch, 3)], &[2, 3]),
            block(2, "body", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(3, "exit", vec![instr(OpcodeClass::Return, 1)], &[]),
        ],
    );
    let forest = ForestBuilder::build(&f);
    let lp = &forest.roots[0];
    assert_eq!(lp.num_blocks(), 2);

    let bounds = BackedgeBounds::for_function(&f);
    let features = FeatureAnalyzer::analyze_loop(&f, lp, &bounds);
    // preds of {1, 2}: {0, 2} for the header, {1} for the body
    assert_eq!(features.num_preds, 3);
    // succs of {1, 2}: {2, 3} and {1}
    assert_eq!(features.num_succ, 3);
}

#[test]
fn test_return_and_unreachable_flagged_from_any_member_block() {
    // Hosts may hand the engine forests built by their own loop analysis,
    // including bodies holding blocks that terminate in ret/unreachable.
    // The flags are OR'd across every member block, not just exits.
    let f = function(
        "flags",
        vec![
            block(0, "entry", vec![instr(OpcodeClass::Branch, 1)], &[1]),
            block(1, "head", vec![instr(OpcodeClass::CondBranch, 3)], &[1, 2]),
            block(2, "dead_end", vec![instr(OpcodeClass::Unreachable, 0)], &[]),
            block(3, "ret_block", vec![instr(OpcodeClass::Return, 1)], &[]),
        ],
    );

    let mut blocks: BitVec<u32> = bitvec![u32, Lsb0; 0; 4];
    blocks.set(1, true);
    blocks.set(2, true);
    blocks.set(3, true);
    let lp = Loop {
        header: 1,
        depth: 1,
        back_edges: SmallVec::from_slice(&[(1u32, 1u32)]),
        blocks,
        children: Vec::new(),
    };

    // A host-built oracle works the same as one resolved from unit data.
    let mut bounds = BackedgeBounds::new();
    bounds.set(1, 2);
    let features = FeatureAnalyzer::analyze_loop(&f, &lp, &bounds);
    assert!(features.ends_with_return);
    assert!(features.ends_with_unreachable);
    assert_eq!(features.num_blocks_in_lp, 3);
    assert_eq!(features.trip_count, 3);
}

#[test]
fn test_opcode_classification() {
    assert_eq!(OpcodeClass::classify("phi", 2), OpcodeClass::Phi);
    assert_eq!(OpcodeClass::classify("call", 3), OpcodeClass::Call);
    assert_eq!(OpcodeClass::classify("invoke", 3), OpcodeClass::Call);
    assert_eq!(OpcodeClass::classify("load", 1), OpcodeClass::Load);
    assert_eq!(OpcodeClass::classify("store", 2), OpcodeClass::Store);
    assert_eq!(OpcodeClass::classify("br", 1), OpcodeClass::Branch);
    assert_eq!(OpcodeClass::classify("br", 3), OpcodeClass::CondBranch);
    assert_eq!(OpcodeClass::classify("fadd", 2), OpcodeClass::FloatArith);
    assert_eq!(OpcodeClass::classify("fdiv", 2), OpcodeClass::FloatArith);
    assert_eq!(OpcodeClass::classify("ret", 1), OpcodeClass::Return);
    assert_eq!(OpcodeClass::classify("unreachable", 0), OpcodeClass::Unreachable);
    // switches and integer arithmetic are not branch- or float-class
    assert_eq!(OpcodeClass::classify("switch", 4), OpcodeClass::Other);
    assert_eq!(OpcodeClass::classify("add", 2), OpcodeClass::Other);
}
