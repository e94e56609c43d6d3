//! Test Utilities
//!
//! Builders for hand-made compilation units: blocks, instructions, and
//! functions with derived predecessor lists.

use loopfeat_core::extractor::ir::{
    BasicBlock, CompilationUnit, Function, InstrRef, Instruction, OpcodeClass,
};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Create an instruction with no recorded uses.
pub fn instr(opcode: OpcodeClass, num_operands: u32) -> Instruction {
    Instruction::new(opcode, num_operands)
}

/// Create an instruction whose result is used at the given
/// (block, instruction) locations.
pub fn instr_with_uses(opcode: OpcodeClass, num_operands: u32, uses: &[(u32, u32)]) -> Instruction {
    let mut i = Instruction::new(opcode, num_operands);
    i.uses = uses
        .iter()
        .map(|&(block, instr)| InstrRef { block, instr })
        .collect();
    i
}

/// Create a block with the given instructions and successor ids.
pub fn block(id: u32, name: &str, instructions: Vec<Instruction>, succs: &[u32]) -> BasicBlock {
    BasicBlock {
        id,
        name: name.to_string(),
        instructions,
        successors: SmallVec::from_slice(succs),
        predecessors: SmallVec::new(),
    }
}

/// Create a function and derive its predecessor lists.
pub fn function(name: &str, blocks: Vec<BasicBlock>) -> Function {
    let mut f = Function {
        name: name.to_string(),
        blocks,
        backedge_counts: HashMap::new(),
    };
    f.populate_predecessors();
    f
}

/// Create a function with constant backedge-taken counts keyed by header
/// block name.
pub fn function_with_bounds(
    name: &str,
    blocks: Vec<BasicBlock>,
    bounds: &[(&str, u64)],
) -> Function {
    let mut f = function(name, blocks);
    f.backedge_counts = bounds
        .iter()
        .map(|&(header, count)| (header.to_string(), count))
        .collect();
    f
}

/// Wrap functions into a unit.
pub fn unit(name: &str, functions: Vec<Function>) -> CompilationUnit {
    CompilationUnit {
        name: name.to_string(),
        functions,
    }
}
