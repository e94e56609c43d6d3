//! Intermediate Representation View
//!
//! This module defines the read-only view of a compilation unit that the
//! feature extractor consumes. The extractor never mutates the analyzed
//! program; the host driver constructs these structures (or deserializes
//! them from JSON) and hands them to the engine by reference.
//!
//! # Memory Optimizations
//! - `OpcodeClass` uses `#[repr(u8)]` to save 3 bytes per instruction tag
//! - `BasicBlock.successors` and `predecessors` use `SmallVec<[u32; 2]>`
//!   (most blocks have ≤2 edges in either direction)
//! - Block ids use `u32` instead of `usize` to save 4 bytes on 64-bit systems
//!
//! # Structural Invariants
//! - A function's blocks are indexed by id: `blocks[i].id == i`
//! - Successor/predecessor ids and use-edge targets are in range
//! - A declaration is a function with no blocks; it carries no loop forest
//!
//! `CompilationUnit::from_json_file` validates these invariants on load and
//! derives predecessor lists from successor lists, so hand-written unit
//! files only need to spell out forward edges.

use crate::extractor::error::ExtractorError;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::path::Path;

/// Opcode class of an instruction.
///
/// Replaces run-time type tests over an instruction hierarchy with a tagged
/// enumeration: every instruction the extractor sees is classified into
/// exactly one of these buckets. Conditional and unconditional branches are
/// separate variants so branch-kind checks stay data-driven.
///
/// # Memory Optimization
/// Uses `#[repr(u8)]` to reduce size from the default enum size to 1 byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)] // Save 3 bytes per instruction tag
pub enum OpcodeClass {
    /// SSA phi node
    Phi = 0,
    /// Call-class instruction (direct or indirect call, invoke)
    Call = 1,
    /// Memory load
    Load = 2,
    /// Memory store
    Store = 3,
    /// Unconditional branch
    Branch = 4,
    /// Conditional branch
    CondBranch = 5,
    /// Floating-point arithmetic (add, sub, mul, div)
    FloatArith = 6,
    /// Function return
    Return = 7,
    /// Unreachable terminator
    Unreachable = 8,
    /// Anything else (integer arithmetic, compares, casts, switches, ...)
    Other = 9,
}

impl OpcodeClass {
    /// Classify a textual mnemonic into an opcode class.
    ///
    /// # Algorithm
    /// Maps the mnemonics a host with a textual IR would emit:
    /// - `br` is conditional when it carries a condition operand plus two
    ///   targets (3 operands), unconditional with a single target
    /// - `call`, `invoke`, and `callbr` all land in the call class
    /// - only the four float arithmetic ops count as `FloatArith`;
    ///   `switch` and everything else fall into `Other`
    pub fn classify(mnemonic: &str, num_operands: u32) -> Self {
        match mnemonic {
            "phi" => Self::Phi,
            "call" | "invoke" | "callbr" => Self::Call,
            "load" => Self::Load,
            "store" => Self::Store,
            "br" => {
                if num_operands >= 3 {
                    Self::CondBranch
                } else {
                    Self::Branch
                }
            }
            "fadd" | "fsub" | "fmul" | "fdiv" => Self::FloatArith,
            "ret" => Self::Return,
            "unreachable" => Self::Unreachable,
            _ => Self::Other,
        }
    }
}

/// Function-wide location of an instruction, used for use edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrRef {
    /// Id of the block containing the using instruction
    pub block: u32,
    /// Index of the using instruction within that block
    pub instr: u32,
}

/// Single instruction in the extractor's view.
///
/// Only the properties the feature metrics need are modeled: the opcode
/// class, the operand count, and the function-wide set of instructions that
/// use this instruction's result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    /// Opcode class tag (1 byte enum)
    pub opcode: OpcodeClass,
    /// Number of operands this instruction carries
    #[serde(default)]
    pub num_operands: u32,
    /// Instructions using this instruction's result, function-wide
    /// Uses SmallVec - most results have few users
    #[serde(default)]
    pub uses: SmallVec<[InstrRef; 2]>,
}

impl Instruction {
    /// Construct an instruction with no recorded uses.
    pub fn new(opcode: OpcodeClass, num_operands: u32) -> Self {
        Self {
            opcode,
            num_operands,
            uses: SmallVec::new(),
        }
    }
}

/// Basic block: an ordered instruction sequence plus its CFG edges.
///
/// The last instruction is the block's terminator. Predecessor and
/// successor sets are function-wide, not restricted to any loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Block id, equal to the block's index in its function
    pub id: u32,
    /// Block label, written verbatim into the dataset for loop headers
    pub name: String,
    /// Instructions in execution order; the last one is the terminator
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    /// Successor block ids
    /// Uses SmallVec with inline capacity for 2 (most blocks have ≤2)
    #[serde(default)]
    pub successors: SmallVec<[u32; 2]>,
    /// Predecessor block ids, derived from successors on load
    #[serde(default)]
    pub predecessors: SmallVec<[u32; 2]>,
}

impl BasicBlock {
    /// The block terminator, if the block is non-empty.
    #[inline]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last()
    }
}

/// Function with an optional body.
///
/// A function with no blocks is a declaration and is skipped by the engine.
/// `backedge_counts` carries the host's symbolic-bound results: for each
/// loop whose backedge-taken count is a compile-time constant, the count
/// keyed by the loop header's block name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Function name, written verbatim into the dataset
    pub name: String,
    /// Basic blocks, indexed by id; empty for declarations
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
    /// Constant backedge-taken counts by loop header name
    #[serde(default)]
    pub backedge_counts: HashMap<String, u64>,
}

impl Function {
    /// True if this function has no body.
    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by id.
    #[inline]
    pub fn block(&self, id: u32) -> Option<&BasicBlock> {
        self.blocks.get(id as usize)
    }

    /// Rebuild every block's predecessor list from the successor lists.
    ///
    /// Clears existing predecessor lists first, so it is safe to call on
    /// units that spell out only forward edges.
    pub fn populate_predecessors(&mut self) {
        for block in self.blocks.iter_mut() {
            block.predecessors.clear();
        }
        let mut edges: Vec<(u32, u32)> = Vec::new();
        for block in self.blocks.iter() {
            for &succ in block.successors.iter() {
                edges.push((block.id, succ));
            }
        }
        for (from, to) in edges {
            if let Some(block) = self.blocks.get_mut(to as usize) {
                if !block.predecessors.contains(&from) {
                    block.predecessors.push(from);
                }
            }
        }
    }

    /// Check the structural invariants the extractor relies on.
    ///
    /// # Errors
    /// Returns `ExtractorError::MalformedUnit` if block ids are not their
    /// indices, or an edge or use edge points outside the function.
    pub fn validate(&self) -> Result<(), ExtractorError> {
        let num_blocks = self.blocks.len() as u32;
        for (idx, block) in self.blocks.iter().enumerate() {
            if block.id != idx as u32 {
                return Err(ExtractorError::malformed(format!(
                    "function {}: block at index {} has id {}",
                    self.name, idx, block.id
                )));
            }
            for &succ in block.successors.iter() {
                if succ >= num_blocks {
                    return Err(ExtractorError::malformed(format!(
                        "function {}: block {} has out-of-range successor {}",
                        self.name, block.id, succ
                    )));
                }
            }
            for (instr_idx, instr) in block.instructions.iter().enumerate() {
                for user in instr.uses.iter() {
                    let in_range = self
                        .block(user.block)
                        .map(|b| (user.instr as usize) < b.instructions.len())
                        .unwrap_or(false);
                    if !in_range {
                        return Err(ExtractorError::malformed(format!(
                            "function {}: instruction {}:{} has out-of-range user {}:{}",
                            self.name, block.id, instr_idx, user.block, user.instr
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Compilation unit: an ordered collection of functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// Unit name (source path or module identifier), used only for logging
    pub name: String,
    /// Functions in the unit, declarations included
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl CompilationUnit {
    /// Load a compilation unit from a JSON file.
    ///
    /// Validates structural invariants and derives predecessor lists, so
    /// the file only needs forward edges.
    ///
    /// # Errors
    /// Returns `UnitLoad` if the file cannot be read or parsed, and
    /// `MalformedUnit` if validation fails.
    pub fn from_json_file(path: &Path) -> Result<Self, ExtractorError> {
        let text = std::fs::read_to_string(path).map_err(|e| ExtractorError::UnitLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut unit: CompilationUnit =
            serde_json::from_str(&text).map_err(|e| ExtractorError::UnitLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        for function in unit.functions.iter_mut() {
            function.validate()?;
            function.populate_predecessors();
        }
        log::debug!(
            "Loaded compilation unit {} ({} functions) from {}",
            unit.name,
            unit.functions.len(),
            path.display()
        );
        Ok(unit)
    }
}
