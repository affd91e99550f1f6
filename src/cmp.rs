//! Comparison soundness checker.
//!
//! For every integer comparison, asks a [`BoundOracle`] whether the
//! comparison, or its inverse, is implied by what is known about its operands.
//! Such comparisons are reported as [`CmpDiagnostic`]s. Comparisons of two
//! constants and comparisons involving an induction variable are not
//! reported.
//!
//! The checker only reads the program; [`TableBounds`] is a ready-made oracle
//! backed by the ranges of a converged [`RangePass`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;

use crate::apint::ApInt;
use crate::error::Result;
use crate::ir::{BinOp, DebugLoc, Def, Function, Op, Program, Value};
use crate::pass::RangePass;
use crate::predicate::Predicate;
use crate::range::IntRange;
use crate::types::{BlockId, Edge, FuncId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verdict {
    AlwaysTrue,
    AlwaysFalse,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::AlwaysTrue => write!(f, "comparison always true"),
            Verdict::AlwaysFalse => write!(f, "comparison always false"),
        }
    }
}

/// What an oracle knows about one comparison operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymExpr {
    Constant(ApInt),
    /// Induction variable of the loop headed by `header`.
    Recurrence { name: String, header: BlockId },
    /// A value bounded by `range`.
    Value { name: String, range: IntRange },
}

impl SymExpr {
    pub fn is_constant(&self) -> bool {
        matches!(self, SymExpr::Constant(_))
    }

    pub fn is_recurrence(&self) -> bool {
        matches!(self, SymExpr::Recurrence { .. })
    }

    /// The values the expression may take, unless it is a recurrence.
    pub fn range(&self) -> Option<IntRange> {
        match self {
            SymExpr::Constant(c) => Some(IntRange::single(c.clone())),
            SymExpr::Value { range, .. } => Some(range.clone()),
            SymExpr::Recurrence { .. } => None,
        }
    }
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymExpr::Constant(c) => write!(f, "{}", c),
            SymExpr::Recurrence { name, header } => write!(f, "{{{},+,1}}<{}>", name, header),
            SymExpr::Value { name, range } => write!(f, "{} in {}", name, range),
        }
    }
}

pub trait BoundOracle {
    /// Describes `value` as used in `block` of `func`, or `None` if nothing
    /// useful is known.
    fn bound(&self, func: FuncId, block: BlockId, value: &Value) -> Option<SymExpr>;

    /// Whether `lhs <pred> rhs` holds for every possible pair of values.
    fn is_known_predicate(&self, pred: Predicate, lhs: &SymExpr, rhs: &SymExpr) -> bool;
}

/// Bounds of comparison operands taken from converged range facts.
#[derive(Debug, Default, Clone)]
pub struct TableBounds {
    bounds: HashMap<(FuncId, BlockId, Value), SymExpr>,
}

impl TableBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, func: FuncId, block: BlockId, value: Value, expr: SymExpr) {
        self.bounds.insert((func, block, value), expr);
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }
}

impl BoundOracle for TableBounds {
    fn bound(&self, func: FuncId, block: BlockId, value: &Value) -> Option<SymExpr> {
        if let Value::Const(c) = value {
            return Some(SymExpr::Constant(c.clone()));
        }
        self.bounds.get(&(func, block, value.clone())).cloned()
    }

    fn is_known_predicate(&self, pred: Predicate, lhs: &SymExpr, rhs: &SymExpr) -> bool {
        match (lhs.range(), rhs.range()) {
            (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => l.icmp(pred, &l.conform(&r)),
            _ => false,
        }
    }
}

impl<'a> RangePass<'a> {
    /// Collects the ranges of every integer comparison operand.
    ///
    /// Re-sweeps each function, so it should be called after
    /// [`run`][Self::run] has converged.
    pub fn bounds(&mut self) -> Result<TableBounds> {
        let program = self.program;
        let mut bounds = TableBounds::new();
        for (id, func) in program.functions() {
            if func.is_declaration() {
                continue;
            }
            self.sweep_function(id)?;
            let cx = self.scope(id)?;
            for (block, body) in func.block_ids().zip(&func.blocks) {
                for inst in &body.insts {
                    let Op::ICmp { lhs, rhs, .. } = &inst.op else {
                        continue;
                    };
                    if !self.is_int(cx, lhs)? || !self.is_int(cx, rhs)? {
                        continue;
                    }
                    for value in [lhs, rhs] {
                        if value.is_const() {
                            continue;
                        }
                        let name = func.render_value(value);
                        let expr = match recurrence(func, &self.back_edges, value) {
                            Some(header) => SymExpr::Recurrence { name, header },
                            None => {
                                let range = self.range_of(cx, block, value)?;
                                if range.is_empty() {
                                    continue;
                                }
                                SymExpr::Value { name, range }
                            }
                        };
                        bounds.insert(id, block, value.clone(), expr);
                    }
                }
            }
        }
        debug!("Collected {} comparison operand bounds", bounds.len());
        Ok(bounds)
    }
}

/// The loop header of `value` if it is an induction variable: a header phi
/// whose back-edge operand adds to or subtracts from the phi itself, or such
/// a step.
fn recurrence(func: &Function, back_edges: &HashSet<Edge>, value: &Value) -> Option<BlockId> {
    if let Some(header) = header_phi(func, back_edges, value) {
        return Some(header);
    }
    let (lhs, rhs) = step(func, value)?;
    header_phi(func, back_edges, lhs).or_else(|| header_phi(func, back_edges, rhs))
}

fn header_phi(func: &Function, back_edges: &HashSet<Edge>, value: &Value) -> Option<BlockId> {
    let var = value.as_var()?;
    let Def::Inst { block, .. } = func.vars.get(var.index())?.def else {
        return None;
    };
    let Op::Phi { incoming, .. } = &func.def_inst(var).ok()??.op else {
        return None;
    };
    let steps = incoming.iter().any(|(pred, v)| {
        back_edges.contains(&Edge::new(*pred, block)) && step(func, v).is_some_and(|(l, r)| l == value || r == value)
    });
    steps.then_some(block)
}

/// Operands of an add or sub.
fn step<'f>(func: &'f Function, value: &Value) -> Option<(&'f Value, &'f Value)> {
    let var = value.as_var()?;
    match &func.def_inst(var).ok()??.op {
        Op::Binary {
            op: BinOp::Add | BinOp::Sub,
            lhs,
            rhs,
            ..
        } => Some((lhs, rhs)),
        _ => None,
    }
}

/// A comparison whose outcome is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmpDiagnostic {
    pub verdict: Verdict,
    pub lhs: SymExpr,
    pub rhs: SymExpr,
    pub function: String,
    pub location: Option<DebugLoc>,
}

impl CmpDiagnostic {
    /// Innermost frame first.
    pub fn backtrace(&self) -> Vec<String> {
        match &self.location {
            Some(loc) => loc
                .frames()
                .into_iter()
                .map(|frame| format!("{} in {}", frame, frame.scope))
                .collect(),
            None => vec![format!("<unknown> in {}", self.function)],
        }
    }
}

impl fmt::Display for CmpDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---")?;
        writeln!(f, "bug:   {}", self.verdict)?;
        writeln!(f, "lhs:   {}", self.lhs)?;
        writeln!(f, "rhs:   {}", self.rhs)?;
        writeln!(f, "stack:")?;
        for frame in self.backtrace() {
            writeln!(f, "  - {}", frame)?;
        }
        Ok(())
    }
}

pub struct CmpChecker<'a> {
    program: &'a Program,
    oracle: &'a dyn BoundOracle,
}

impl<'a> CmpChecker<'a> {
    pub fn new(program: &'a Program, oracle: &'a dyn BoundOracle) -> Self {
        Self { program, oracle }
    }

    /// Checks every defined function.
    pub fn check(&self) -> Vec<CmpDiagnostic> {
        let mut diagnostics = Vec::new();
        for (id, func) in self.program.functions() {
            if !func.is_declaration() {
                diagnostics.extend(self.check_function(id));
            }
        }
        diagnostics
    }

    pub fn check_function(&self, id: FuncId) -> Vec<CmpDiagnostic> {
        let Some(func) = self.program.function(id) else {
            return Vec::new();
        };

        let mut diagnostics = Vec::new();
        for (block, body) in func.block_ids().zip(&func.blocks) {
            for inst in &body.insts {
                let Op::ICmp { pred, lhs, rhs, .. } = &inst.op else {
                    continue;
                };
                let (Some(l), Some(r)) = (self.oracle.bound(id, block, lhs), self.oracle.bound(id, block, rhs)) else {
                    continue;
                };
                if (l.is_constant() && r.is_constant()) || l.is_recurrence() || r.is_recurrence() {
                    continue;
                }

                let verdict = if self.oracle.is_known_predicate(*pred, &l, &r) {
                    Verdict::AlwaysTrue
                } else if self.oracle.is_known_predicate(pred.inverse(), &l, &r) {
                    Verdict::AlwaysFalse
                } else {
                    continue;
                };
                debug!("{}(): {} ({})", func.name, func.render_inst(inst), verdict);
                diagnostics.push(CmpDiagnostic {
                    verdict,
                    lhs: l,
                    rhs: r,
                    function: func.name.clone(),
                    location: inst.loc.clone(),
                });
            }
        }
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::{Constant, GlobalVar};
    use crate::types::Ty;

    fn checked(program: &Program) -> Vec<CmpDiagnostic> {
        let mut pass = RangePass::new(program);
        pass.run().unwrap();
        let bounds = pass.bounds().unwrap();
        CmpChecker::new(program, &bounds).check()
    }

    #[test]
    fn test_fixed_comparisons_are_reported() {
        let mut program = Program::new();
        program.add_global(GlobalVar::new(
            "g",
            Ty::int(8),
            Some(Constant::Int(ApInt::from_u64(8, 3))),
        ));
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        b.set_loc(Some(DebugLoc::new("f.c", 4, 7, "f")));
        let v = b.load_global("g", Ty::int(8));
        b.icmp(Predicate::Ult, v.clone(), Value::int(8, 10));
        b.icmp(Predicate::Ugt, v.clone(), Value::int(8, 10));
        b.icmp(Predicate::Eq, v, b.param(0));
        b.icmp(Predicate::Eq, Value::int(8, 1), Value::int(8, 2));
        b.ret(None);
        program.add_function(b.finish());

        let diagnostics = checked(&program);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].verdict, Verdict::AlwaysTrue);
        assert_eq!(diagnostics[1].verdict, Verdict::AlwaysFalse);

        let expected = "\
---
bug:   comparison always true
lhs:   %1 in [3,4)
rhs:   10
stack:
  - f.c:4:7 in f
";
        assert_eq!(diagnostics[0].to_string(), expected);
    }

    #[test]
    fn test_induction_variables_are_skipped() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("count", &[], Ty::Void);
        let entry = b.block();
        let header = b.block();
        let body = b.block();
        let exit = b.block();
        b.switch_to(entry);
        b.br(header);
        b.switch_to(header);
        let i = b.phi(Ty::int(32));
        let c = b.icmp(Predicate::Ult, i.clone(), Value::int(32, 10));
        b.cond_br(c, body, exit);
        b.switch_to(body);
        let next = b.binary(BinOp::Add, i.clone(), Value::int(32, 1));
        b.br(header);
        b.switch_to(exit);
        b.ret(None);
        b.add_incoming(&i, entry, Value::int(32, 0));
        b.add_incoming(&i, body, next);
        let f = program.add_function(b.finish());

        let mut pass = RangePass::new(&program);
        pass.run().unwrap();
        let bounds = pass.bounds().unwrap();
        assert!(bounds.bound(f, header, &i).unwrap().is_recurrence());
        assert!(CmpChecker::new(&program, &bounds).check().is_empty());
    }

    struct Everything;

    impl BoundOracle for Everything {
        fn bound(&self, _: FuncId, _: BlockId, value: &Value) -> Option<SymExpr> {
            Some(SymExpr::Value {
                name: format!("{:?}", value),
                range: IntRange::full(8),
            })
        }

        fn is_known_predicate(&self, pred: Predicate, _: &SymExpr, _: &SymExpr) -> bool {
            pred == Predicate::Eq
        }
    }

    #[test]
    fn test_custom_oracle_and_inlined_backtrace() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        let loc = DebugLoc::new("util.h", 10, 3, "helper").inlined_at(DebugLoc::new("main.c", 20, 5, "f"));
        b.set_loc(Some(loc));
        b.icmp(Predicate::Ne, b.param(0), b.param(0));
        b.ret(None);
        program.add_function(b.finish());

        let diagnostics = CmpChecker::new(&program, &Everything).check();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].verdict, Verdict::AlwaysFalse);
        assert_eq!(
            diagnostics[0].backtrace(),
            vec!["util.h:10:3 in helper".to_string(), "main.c:20:5 in f".to_string()]
        );
    }
}
