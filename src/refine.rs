//! Edge refinement.
//!
//! Facts flowing along an edge are narrowed by what the edge's terminator
//! proves: a conditional branch constrains both operands of its comparison,
//! and a switch constrains its condition to the case values leading to the
//! successor.

use std::cmp::Ordering;

use log::debug;

use crate::apint::ApInt;
use crate::error::Result;
use crate::facts::ValueRanges;
use crate::ir::{Def, Op, Terminator, Value};
use crate::pass::{RangePass, Scope};
use crate::range::IntRange;
use crate::types::BlockId;

impl<'a> RangePass<'a> {
    /// Narrows `facts`, copied from `pred`, for the edge `pred -> succ`.
    pub(crate) fn refine_edge(
        &mut self,
        cx: Scope<'a>,
        pred: BlockId,
        succ: BlockId,
        facts: &mut ValueRanges,
    ) -> Result<()> {
        match &cx.func.block(pred)?.term {
            Terminator::CondBr { cond, then_bb, else_bb } => {
                // Both edges lead to the same block: nothing is learned.
                if then_bb == else_bb {
                    return Ok(());
                }
                self.refine_branch(cx, cond, succ == *then_bb, facts)
            }
            Terminator::Switch { cond, default, cases } => {
                self.refine_switch(cx, pred, succ, cond, *default, cases, facts)
            }
            Terminator::Br(_) | Terminator::Ret(_) | Terminator::Unreachable => Ok(()),
        }
    }

    fn refine_branch(&mut self, cx: Scope<'a>, cond: &Value, taken: bool, facts: &mut ValueRanges) -> Result<()> {
        let Some(var) = cond.as_var() else {
            return Ok(());
        };
        let Some(inst) = cx.func.def_inst(var)? else {
            return Ok(());
        };
        let Op::ICmp { pred, lhs, rhs, .. } = &inst.op else {
            return Ok(());
        };
        if !self.is_int(cx, lhs)? || !self.is_int(cx, rhs)? {
            return Ok(());
        }
        let Def::Inst { block: cmp_block, .. } = cx.func.var(var)?.def else {
            return Ok(());
        };

        let l = self.range_of(cx, cmp_block, lhs)?;
        let r = l.conform(&self.range_of(cx, cmp_block, rhs)?);
        let pred = if taken { *pred } else { pred.inverse() };

        let lhs_region = IntRange::allowed_icmp_region(pred, &r);
        let rhs_region = IntRange::allowed_icmp_region(pred.swapped(), &l);
        debug!(
            "{}(): {} {} {} narrows lhs to {}, rhs to {}",
            cx.func.name, l, pred, r, lhs_region, rhs_region
        );
        narrow(facts, lhs, l, &lhs_region);
        narrow(facts, rhs, r, &rhs_region);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn refine_switch(
        &mut self,
        cx: Scope<'a>,
        pred: BlockId,
        succ: BlockId,
        cond: &Value,
        default: BlockId,
        cases: &[(ApInt, BlockId)],
        facts: &mut ValueRanges,
    ) -> Result<()> {
        if cond.is_const() || !self.is_int(cx, cond)? {
            return Ok(());
        }
        let computed = self.range_of(cx, pred, cond)?;
        let width = computed.width();

        let mut region = IntRange::empty(width);
        if succ == default {
            // Any value outside the largest run of other cases may reach the
            // default.
            let others: Vec<&ApInt> = cases.iter().filter(|(_, t)| *t != succ).map(|(v, _)| v).collect();
            region = match largest_run(&others) {
                Some(run) => run.inverse(),
                None => IntRange::full(width),
            };
        }
        for (value, _) in cases.iter().filter(|(_, t)| *t == succ) {
            region.union_in_place(&IntRange::single(value.clone()));
        }

        narrow(facts, cond, computed, &region);
        Ok(())
    }
}

/// Intersects the fact for `value` with `region`, starting from `computed`
/// when the edge carries no fact yet. Constants are left alone.
fn narrow(facts: &mut ValueRanges, value: &Value, computed: IntRange, region: &IntRange) {
    if value.is_const() {
        return;
    }
    let base = facts.get(value).cloned().unwrap_or(computed);
    let narrowed = base.intersect(&base.conform(region));
    facts.insert(value.clone(), narrowed);
}

/// The largest run of consecutive values, wrapping from the maximum value
/// back to zero, as a half-open range.
fn largest_run(values: &[&ApInt]) -> Option<IntRange> {
    let mut values: Vec<&ApInt> = values.to_vec();
    values.sort_by(|a, b| a.ucmp(b));
    values.dedup();
    let first = *values.first()?;
    let one = ApInt::one(first.width());

    let mut runs: Vec<(ApInt, ApInt)> = Vec::new();
    for value in values {
        match runs.last_mut() {
            Some((_, end)) if &end.wrapping_add(&one) == value => *end = value.clone(),
            _ => runs.push((value.clone(), value.clone())),
        }
    }

    if runs.len() > 1 {
        let wraps = runs[0].0.is_zero() && runs[runs.len() - 1].1.is_max_value();
        if wraps {
            let (_, end) = runs.remove(0);
            if let Some(last) = runs.last_mut() {
                last.1 = end;
            }
        }
    }

    let size = |(start, end): &(ApInt, ApInt)| end.wrapping_sub(start);
    let (start, end) = runs
        .into_iter()
        .max_by(|a, b| match size(a).ucmp(&size(b)) {
            // Prefer the earliest run on ties.
            Ordering::Equal => Ordering::Greater,
            ord => ord,
        })?;
    Some(IntRange::non_empty(start, end.wrapping_add(&one)))
}
