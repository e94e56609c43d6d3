//! Loop Forest
//!
//! This module provides the loop-nest representation the feature extractor
//! walks, plus construction of that representation from a function's block
//! graph.
//!
//! # Loop Detection Algorithm
//! 1. **Back edges**: depth-first search from the entry block; an edge to a
//!    block on the current DFS path is a back edge and names a loop header
//! 2. **Loop bodies**: for each back edge `latch -> header`, the natural
//!    loop body is the header plus every block that reaches the latch
//!    backwards without passing through the header
//! 3. **Merging**: back edges sharing a header describe one loop; their
//!    bodies and back edges are unioned
//! 4. **Nesting**: a loop is a child of the smallest other loop that
//!    strictly contains its body; depths are assigned top-down (1 = top
//!    level)
//!
//! A loop's member-block set includes the blocks of its nested sub-loops,
//! matching standard loop-nest semantics.
//!
//! # Memory Optimizations
//! - `Loop.blocks` uses `BitVec` for efficient membership testing
//! - `Loop.back_edges` uses `SmallVec` (most loops have 1-2 back edges)

use crate::extractor::ir::Function;
use bitvec::prelude::*;
use smallvec::SmallVec;

/// Single loop in a function's loop forest.
#[derive(Debug, Clone)]
pub struct Loop {
    /// Loop header block id (entry point of the loop)
    pub header: u32,
    /// Nesting depth; 1 = top-level
    pub depth: u32,
    /// Back edges (edges from the loop body to the header)
    /// Uses SmallVec - most loops have 1-2 back edges
    pub back_edges: SmallVec<[(u32, u32); 2]>,
    /// Member blocks, including blocks of nested sub-loops
    /// Uses BitVec for efficient membership testing
    pub blocks: BitVec<u32>,
    /// Directly nested sub-loops
    pub children: Vec<Loop>,
}

impl Loop {
    /// Membership test against the loop's block set.
    #[inline]
    pub fn contains(&self, block: u32) -> bool {
        let idx = block as usize;
        idx < self.blocks.len() && self.blocks[idx]
    }

    /// Number of member blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.count_ones()
    }
}

/// The set of top-level loops in one function.
#[derive(Debug, Clone, Default)]
pub struct LoopForest {
    /// Top-level loops; each owns its nested sub-loops
    pub roots: Vec<Loop>,
}

impl LoopForest {
    /// True if the function has no loops at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of loops, nested sub-loops included.
    pub fn loop_count(&self) -> usize {
        fn count(lp: &Loop) -> usize {
            1 + lp.children.iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

/// Builds a function's loop forest from its block graph.
///
/// This is the in-repo stand-in for a host compiler's loop analysis; hosts
/// that already have loop info can construct `LoopForest` values directly
/// and skip the builder.
pub struct ForestBuilder;

impl ForestBuilder {
    /// Build the loop forest of a function.
    ///
    /// Declarations and functions whose entry block is missing yield an
    /// empty forest. Blocks unreachable from the entry are not visited, so
    /// loops among dead blocks are not reported.
    pub fn build(function: &Function) -> LoopForest {
        let num_blocks = function.blocks.len();
        if num_blocks == 0 {
            return LoopForest::default();
        }

        // Pass 1: back edges via DFS from the entry block
        let mut visited: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        let mut in_stack: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        let mut back_edges: Vec<(u32, u32)> = Vec::new();
        Self::dfs_back_edges(function, 0u32, &mut visited, &mut in_stack, &mut back_edges);

        if back_edges.is_empty() {
            return LoopForest::default();
        }

        // Pass 2: natural loop body per back edge, merged by header.
        // Headers keep discovery order so forest traversal is deterministic.
        let mut header_order: Vec<u32> = Vec::new();
        let mut loops: Vec<Loop> = Vec::new();
        for (latch, header) in back_edges {
            let body = Self::natural_loop_body(function, header, latch);
            match header_order.iter().position(|&h| h == header) {
                Some(idx) => {
                    for bit in body.iter_ones() {
                        loops[idx].blocks.set(bit, true);
                    }
                    loops[idx].back_edges.push((latch, header));
                }
                None => {
                    header_order.push(header);
                    loops.push(Loop {
                        header,
                        depth: 1u32,
                        back_edges: SmallVec::from_slice(&[(latch, header)]),
                        blocks: body,
                        children: Vec::new(),
                    });
                }
            }
        }

        // Pass 3: nest by body containment
        Self::build_nest(loops)
    }

    /// Depth-first search collecting back edges (edges to a block on the
    /// current DFS path).
    fn dfs_back_edges(
        function: &Function,
        node: u32,
        visited: &mut BitVec<u32>,
        in_stack: &mut BitVec<u32>,
        back_edges: &mut Vec<(u32, u32)>,
    ) {
        let node_idx = node as usize;
        if node_idx >= visited.len() {
            return;
        }

        visited.set(node_idx, true);
        in_stack.set(node_idx, true);

        if let Some(block) = function.block(node) {
            for &succ in block.successors.iter() {
                let succ_idx = succ as usize;
                if succ_idx >= visited.len() {
                    continue;
                }
                if !visited[succ_idx] {
                    Self::dfs_back_edges(function, succ, visited, in_stack, back_edges);
                } else if in_stack[succ_idx] {
                    back_edges.push((node, succ));
                }
            }
        }

        in_stack.set(node_idx, false);
    }

    /// Natural loop body for one back edge: the header plus everything that
    /// reaches the latch backwards without passing through the header.
    fn natural_loop_body(function: &Function, header: u32, latch: u32) -> BitVec<u32> {
        let num_blocks = function.blocks.len();
        let mut body: BitVec<u32> = bitvec![u32, Lsb0; 0; num_blocks];
        if (header as usize) < num_blocks {
            body.set(header as usize, true);
        }
        if latch == header {
            return body;
        }

        let mut worklist: Vec<u32> = Vec::new();
        if (latch as usize) < num_blocks {
            body.set(latch as usize, true);
            worklist.push(latch);
        }
        while let Some(node) = worklist.pop() {
            if let Some(block) = function.block(node) {
                for &pred in block.predecessors.iter() {
                    let pred_idx = pred as usize;
                    if pred_idx >= num_blocks || body[pred_idx] {
                        continue;
                    }
                    body.set(pred_idx, true);
                    worklist.push(pred);
                }
            }
        }
        body
    }

    /// Arrange a flat loop list into a forest by body containment and
    /// assign nesting depths.
    fn build_nest(loops: Vec<Loop>) -> LoopForest {
        let n = loops.len();

        // Parent = smallest strictly-containing loop
        let mut parent: Vec<Option<usize>> = vec![None; n];
        for i in 0..n {
            let mut best: Option<usize> = None;
            for j in 0..n {
                if i == j || !Self::is_strict_subset(&loops[i].blocks, &loops[j].blocks) {
                    continue;
                }
                let better = match best {
                    Some(b) => loops[j].num_blocks() < loops[b].num_blocks(),
                    None => true,
                };
                if better {
                    best = Some(j);
                }
            }
            parent[i] = best;
        }

        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut root_indices: Vec<usize> = Vec::new();
        for (i, p) in parent.iter().enumerate() {
            match p {
                Some(j) => children_of[*j].push(i),
                None => root_indices.push(i),
            }
        }

        let mut slots: Vec<Option<Loop>> = loops.into_iter().map(Some).collect();
        let mut roots: Vec<Loop> = Vec::new();
        for idx in root_indices {
            if let Some(root) = Self::assemble(idx, &mut slots, &children_of, 1u32) {
                roots.push(root);
            }
        }
        LoopForest { roots }
    }

    /// Recursively move loops out of their slots into the forest, setting
    /// depths top-down. Recursion is bounded by realistic nesting depth.
    fn assemble(
        idx: usize,
        slots: &mut Vec<Option<Loop>>,
        children_of: &[Vec<usize>],
        depth: u32,
    ) -> Option<Loop> {
        let mut lp = slots.get_mut(idx)?.take()?;
        lp.depth = depth;
        for &child_idx in children_of[idx].iter() {
            if let Some(child) = Self::assemble(child_idx, slots, children_of, depth + 1) {
                lp.children.push(child);
            }
        }
        Some(lp)
    }

    /// True if `a` is a strict subset of `b`.
    fn is_strict_subset(a: &BitVec<u32>, b: &BitVec<u32>) -> bool {
        a.count_ones() < b.count_ones() && a.iter_ones().all(|i| i < b.len() && b[i])
    }
}
