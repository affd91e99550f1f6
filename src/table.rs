//! Interprocedural range table.
//!
//! [`RangeTable`] maps each [`SymbolId`] to the range of values stored at that
//! location anywhere in the program. Updates are unions, so every entry only
//! grows until the analysis reaches a fixpoint or [widens][RangeTable::widen_changed]
//! it. The table also records which ids changed during the current sweep,
//! which drives the widening decision.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::{debug, info};

use crate::range::IntRange;
use crate::types::SymbolId;

#[derive(Debug, Default, Clone)]
pub struct RangeTable {
    ranges: BTreeMap<SymbolId, IntRange>,
    changes: BTreeSet<SymbolId>,
    watch: Option<SymbolId>,
}

impl RangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Traces every update of `id` at `info` level.
    pub fn set_watch(&mut self, id: Option<SymbolId>) {
        self.watch = id;
    }

    fn is_watched(&self, id: &SymbolId) -> bool {
        self.watch.as_ref() == Some(id)
    }
}

impl RangeTable {
    pub fn get(&self, id: &str) -> Option<&IntRange> {
        self.ranges.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ranges.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymbolId, &IntRange)> {
        self.ranges.iter()
    }

    /// Ids changed since the last [`clear_changes`][Self::clear_changes].
    pub fn changes(&self) -> &BTreeSet<SymbolId> {
        &self.changes
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}

impl RangeTable {
    /// Unions `range` into the entry for `id`.
    ///
    /// Returns whether the entry grew. Empty ranges are ignored.
    pub fn union(&mut self, id: &SymbolId, range: &IntRange) -> bool {
        self.union_with_origin(id, range, String::new)
    }

    /// Like [`union`][Self::union], describing the triggering operation with
    /// `origin` when `id` is watched.
    pub fn union_with_origin(&mut self, id: &SymbolId, range: &IntRange, origin: impl FnOnce() -> String) -> bool {
        if range.is_empty() {
            return false;
        }

        let watched = self.is_watched(id);
        if watched {
            let origin = origin();
            if !origin.is_empty() {
                info!("{}", origin);
            }
        }

        let changed = match self.ranges.get_mut(id) {
            Some(existing) => {
                let changed = existing.union_in_place(range);
                if changed && watched {
                    info!("{} + {} = {}", id, range, existing);
                }
                changed
            }
            None => {
                if watched {
                    info!("{} = {}", id, range);
                }
                self.ranges.insert(id.clone(), range.clone());
                true
            }
        };

        if changed {
            self.changes.insert(id.clone());
        }
        changed
    }

    /// Replaces the range of every changed id with the full range of its width.
    ///
    /// Returns the number of widened ids.
    pub fn widen_changed(&mut self) -> usize {
        let mut widened = 0;
        for id in &self.changes {
            if let Some(range) = self.ranges.get_mut(id) {
                if !range.is_full() {
                    debug!("widening {} from {}", id, range);
                    *range = IntRange::full(range.width());
                    widened += 1;
                }
            }
        }
        widened
    }
}

/// One `id range` pair per line, in id order.
impl fmt::Display for RangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, range) in &self.ranges {
            writeln!(f, "{} {}", id, range)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn id(s: &str) -> SymbolId {
        SymbolId::from(s)
    }

    #[test]
    fn test_union_grows_and_records_change() {
        let mut table = RangeTable::new();
        assert!(table.union(&id("var.g"), &IntRange::constant(8, 3)));
        assert!(table.changes().contains("var.g"));

        table.clear_changes();
        assert!(!table.union(&id("var.g"), &IntRange::constant(8, 3)));
        assert!(table.changes().is_empty());

        assert!(table.union(&id("var.g"), &IntRange::constant(8, 5)));
        assert_eq!(table.get("var.g"), Some(&IntRange::inclusive(8, 3, 5)));
    }

    #[test]
    fn test_empty_union_is_noop() {
        let mut table = RangeTable::new();
        assert!(!table.union(&id("var.g"), &IntRange::empty(8)));
        assert!(!table.contains("var.g"));
        assert!(table.changes().is_empty());
    }

    #[test]
    fn test_union_normalizes_width() {
        let mut table = RangeTable::new();
        table.union(&id("x"), &IntRange::inclusive(16, 0, 300));
        table.union(&id("x"), &IntRange::inclusive(8, 250, 255));
        assert_eq!(table.get("x"), Some(&IntRange::inclusive(16, 0, 300)));
    }

    #[test]
    fn test_widen_changed() {
        let mut table = RangeTable::new();
        table.union(&id("a"), &IntRange::constant(8, 1));
        table.union(&id("b"), &IntRange::constant(32, 1));
        table.clear_changes();
        table.union(&id("b"), &IntRange::constant(32, 2));

        assert_eq!(table.widen_changed(), 1);
        assert_eq!(table.get("a"), Some(&IntRange::constant(8, 1)));
        assert!(table.get("b").unwrap().is_full());
        assert_eq!(table.get("b").unwrap().width(), 32);
    }

    #[test]
    fn test_watched_updates_do_not_change_results() {
        let mut table = RangeTable::new();
        table.set_watch(Some(id("w")));
        assert!(table.union_with_origin(&id("w"), &IntRange::constant(8, 1), || "f(): store".to_string()));
        assert!(table.union(&id("w"), &IntRange::constant(8, 2)));
        assert_eq!(table.get("w"), Some(&IntRange::inclusive(8, 1, 2)));
    }

    #[test]
    fn test_dump() {
        let mut table = RangeTable::new();
        table.union(&id("var.b"), &IntRange::full(8));
        table.union(&id("var.a"), &IntRange::inclusive(8, 1, 4));
        assert_eq!(table.to_string(), "var.a [1,5)\nvar.b full-set\n");
    }
}
