//! Per-block local facts.
//!
//! Within one function sweep, every block owns a map from values to their
//! ranges on entry to and throughout the block. Maps are rebuilt from scratch
//! for every sweep of a function.

use std::collections::HashMap;

use crate::ir::Value;
use crate::range::IntRange;
use crate::types::BlockId;

/// Ranges of values known in one block.
pub type ValueRanges = HashMap<Value, IntRange>;

#[derive(Debug, Default, Clone)]
pub struct BlockFacts {
    blocks: HashMap<BlockId, ValueRanges>,
}

impl BlockFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn get(&self, block: BlockId, value: &Value) -> Option<&IntRange> {
        self.blocks.get(&block).and_then(|m| m.get(value))
    }

    /// All facts of `block`, or `None` if nothing is known there yet.
    pub fn block(&self, block: BlockId) -> Option<&ValueRanges> {
        self.blocks.get(&block)
    }

    /// Sets the range of `value` in `block`, replacing any previous fact.
    pub fn insert(&mut self, block: BlockId, value: Value, range: IntRange) {
        self.blocks.entry(block).or_default().insert(value, range);
    }

    /// Unions `range` into the fact for `value` in `block`.
    ///
    /// Returns whether the fact grew. Empty ranges are ignored.
    pub fn union(&mut self, block: BlockId, value: Value, range: &IntRange) -> bool {
        if range.is_empty() {
            return false;
        }
        let ranges = self.blocks.entry(block).or_default();
        match ranges.get_mut(&value) {
            Some(existing) => existing.union_in_place(range),
            None => {
                ranges.insert(value, range.clone());
                true
            }
        }
    }

    /// Joins facts flowing in along one edge into `block`.
    ///
    /// Values already known are unioned with the incoming range. Values not
    /// yet known take the incoming range, even when it is empty (an
    /// infeasible edge). A value absent from `incoming` gains nothing from this
    /// edge, so callers must supply every value known along any edge.
    pub fn merge(&mut self, block: BlockId, incoming: ValueRanges) {
        let ranges = self.blocks.entry(block).or_default();
        for (value, range) in incoming {
            match ranges.get_mut(&value) {
                Some(existing) => {
                    existing.union_in_place(&range);
                }
                None => {
                    ranges.insert(value, range);
                }
            }
        }
    }
}
