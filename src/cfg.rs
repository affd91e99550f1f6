//! Control-flow graph queries: predecessors and loop-closing edges.

use std::collections::HashSet;

use crate::ir::Function;
use crate::types::{BlockId, Edge};

/// Predecessors of every block, each listed once, in layout order.
pub fn predecessors(func: &Function) -> Vec<Vec<BlockId>> {
    let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); func.blocks.len()];
    for (from, block) in func.blocks.iter().enumerate() {
        let from = BlockId::new(from);
        for succ in block.term.successors() {
            let list = &mut preds[succ.index()];
            if !list.contains(&from) {
                list.push(from);
            }
        }
    }
    preds
}

/// Edges closing a cycle in a depth-first walk from the entry block.
///
/// An edge `a -> b` is a back-edge when `b` is still on the DFS stack while
/// `a` is being expanded. Blocks unreachable from the entry contribute no
/// back-edges.
pub fn back_edges(func: &Function) -> HashSet<Edge> {
    let mut result = HashSet::new();
    if func.blocks.is_empty() {
        return result;
    }

    let mut visited = vec![false; func.blocks.len()];
    let mut on_stack = vec![false; func.blocks.len()];
    // (block, its successors, index of the next successor to visit)
    let mut stack: Vec<(BlockId, Vec<BlockId>, usize)> = Vec::new();

    visited[BlockId::ENTRY.index()] = true;
    on_stack[BlockId::ENTRY.index()] = true;
    stack.push((
        BlockId::ENTRY,
        func.blocks[BlockId::ENTRY.index()].term.successors(),
        0,
    ));

    while let Some((block, succs, next)) = stack.last_mut() {
        if *next < succs.len() {
            let succ = succs[*next];
            *next += 1;
            let block = *block;
            if on_stack[succ.index()] {
                result.insert(Edge::new(block, succ));
            } else if !visited[succ.index()] {
                visited[succ.index()] = true;
                on_stack[succ.index()] = true;
                stack.push((succ, func.blocks[succ.index()].term.successors(), 0));
            }
        } else {
            on_stack[block.index()] = false;
            stack.pop();
        }
    }

    result
}
