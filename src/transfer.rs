//! Transfer functions, one per operation kind.
//!
//! Every operation with an integer result records that result's range as a
//! local fact of its block. Stores, calls and returns also publish ranges into
//! the interprocedural table; they report whether the table changed.

use crate::error::{RangeError, Result};
use crate::ir::{BinOp, Callee, CastOp, Function, Instruction, MemTarget, Op, Terminator, Value};
use crate::pass::{RangePass, Scope};
use crate::range::IntRange;
use crate::types::{BlockId, CallSite, Edge, VarId};

/// Describes an instruction for watch traces.
fn origin(func: &Function, inst: &Instruction) -> String {
    format!("{}(): {}", func.name, func.render_inst(inst))
}

impl<'a> RangePass<'a> {
    /// Runs instruction `index` of `block`.
    ///
    /// Returns whether the table changed.
    pub(crate) fn transfer(&mut self, cx: Scope<'a>, block: BlockId, index: usize) -> Result<bool> {
        let inst = &cx.func.block(block)?.insts[index];

        let mut changed = false;
        match &inst.op {
            Op::Store { value, ptr, target } => {
                changed |= self.visit_store(cx, block, inst, value, ptr, target.as_ref())?;
            }
            Op::Call { dest, callee, args } => {
                let site = CallSite::new(cx.id, block, index);
                changed |= self.visit_call(cx, site, inst, *dest, callee, args)?;
            }
            _ => {}
        }

        let Some(dest) = inst.op.dest() else {
            return Ok(changed);
        };
        let Some(width) = cx.func.var(dest)?.ty.int_width() else {
            return Ok(changed);
        };

        let range = match &inst.op {
            Op::Binary { op, lhs, rhs, .. } => self.visit_binary(cx, block, *op, lhs, rhs)?,
            Op::Cast { op, src, .. } => self.visit_cast(cx, block, inst, *op, src, width)?,
            Op::Select { on_true, on_false, .. } => {
                let mut range = self.range_of(cx, block, on_true)?;
                range.union_in_place(&self.range_of(cx, block, on_false)?);
                range
            }
            Op::Phi { incoming, .. } => self.visit_phi(cx, block, incoming, width)?,
            Op::Load { ptr, .. } => self.visit_load(cx, block, dest, ptr)?,
            Op::Call { .. } => self.range_of(cx, block, &Value::Var(dest))?,
            Op::ICmp { .. } | Op::Opaque { .. } => IntRange::full(width),
            Op::Store { .. } => return Ok(changed),
        };
        self.facts.union(block, Value::Var(dest), &range);
        Ok(changed)
    }

    /// Publishes the returned value of `block`, if it returns one.
    pub(crate) fn transfer_terminator(&mut self, cx: Scope<'a>, block: BlockId) -> Result<bool> {
        let term = &cx.func.block(block)?.term;
        let Terminator::Ret(Some(value)) = term else {
            return Ok(false);
        };
        if !self.is_int(cx, value)? {
            return Ok(false);
        }
        let Some(id) = self.naming.ret_id(cx.func) else {
            return Ok(false);
        };
        let range = self.range_of(cx, block, value)?;
        Ok(self.table.union_with_origin(&id, &range, || {
            format!("{}(): {}", cx.func.name, cx.func.render_terminator(term))
        }))
    }

    fn visit_binary(&mut self, cx: Scope<'a>, block: BlockId, op: BinOp, lhs: &Value, rhs: &Value) -> Result<IntRange> {
        let l = self.range_of(cx, block, lhs)?;
        let r = l.conform(&self.range_of(cx, block, rhs)?);
        Ok(match op {
            BinOp::Add => l.add(&r),
            BinOp::Sub => l.sub(&r),
            BinOp::Mul => l.multiply(&r),
            BinOp::UDiv => l.udiv(&r),
            BinOp::Shl => l.shl(&r),
            BinOp::LShr => l.lshr(&r),
            BinOp::And => l.binary_and(&r),
            BinOp::Or => l.binary_or(&r),
            // Placeholders: one operand passes through unchanged, which is not
            // a sound bound for these operators.
            BinOp::SDiv | BinOp::AShr | BinOp::Xor => l,
            BinOp::URem | BinOp::SRem => r,
        })
    }

    fn visit_cast(
        &mut self,
        cx: Scope<'a>,
        block: BlockId,
        inst: &Instruction,
        op: CastOp,
        src: &Value,
        width: u32,
    ) -> Result<IntRange> {
        let unmodeled = || RangeError::Unmodeled {
            function: cx.func.name.clone(),
            inst: cx.func.render_inst(inst),
        };

        // No provenance tracking for addresses.
        if op == CastOp::PtrToInt {
            return Ok(IntRange::full(width));
        }

        let range = self.range_of(cx, block, src)?;
        match op {
            CastOp::Trunc | CastOp::ZExt => Ok(range.zext_or_trunc(width)),
            CastOp::SExt if width > range.width() => Ok(range.sign_extend(width)),
            CastOp::SExt | CastOp::IntToPtr => Err(unmodeled()),
            CastOp::BitCast => Ok(range),
            CastOp::PtrToInt => Ok(IntRange::full(width)),
        }
    }

    /// Union over incoming edges, skipping back-edges.
    fn visit_phi(&mut self, cx: Scope<'a>, block: BlockId, incoming: &[(BlockId, Value)], width: u32) -> Result<IntRange> {
        let mut range = IntRange::empty(width);
        for (pred, value) in incoming {
            if self.back_edges.contains(&Edge::new(*pred, block)) {
                continue;
            }
            range.union_in_place(&self.range_of(cx, *pred, value)?);
        }
        Ok(range)
    }

    /// The loaded location's range, joined with values stored through the same
    /// pointer on the way here.
    fn visit_load(&mut self, cx: Scope<'a>, block: BlockId, dest: VarId, ptr: &Value) -> Result<IntRange> {
        let mut range = self.range_of(cx, block, &Value::Var(dest))?;
        if let Some(stored) = self.facts.get(block, ptr) {
            range.union_in_place(stored);
        }
        Ok(range)
    }

    fn visit_store(
        &mut self,
        cx: Scope<'a>,
        block: BlockId,
        inst: &Instruction,
        value: &Value,
        ptr: &Value,
        target: Option<&MemTarget>,
    ) -> Result<bool> {
        let Some(id) = target.and_then(|t| self.naming.mem_id(t)) else {
            return Ok(false);
        };
        if !self.is_int(cx, value)? {
            return Ok(false);
        }
        let range = self.range_of(cx, block, value)?;
        self.facts.union(block, ptr.clone(), &range);
        Ok(self.table.union_with_origin(&id, &range, || origin(cx.func, inst)))
    }

    fn visit_call(
        &mut self,
        cx: Scope<'a>,
        site: CallSite,
        inst: &Instruction,
        dest: Option<VarId>,
        callee: &Callee,
        args: &[Value],
    ) -> Result<bool> {
        if matches!(callee, Callee::InlineAsm) {
            return Ok(false);
        }

        let mut changed = false;
        for target in self.callees.callees(site) {
            let target = self.callee(cx, target)?;
            if target.is_var_arg || target.is_intrinsic() {
                continue;
            }
            for (index, arg) in args.iter().enumerate() {
                if !self.is_int(cx, arg)? {
                    continue;
                }
                let Some(id) = self.naming.arg_id(target, index) else {
                    continue;
                };
                let range = self.range_of(cx, site.block, arg)?;
                changed |= self.table.union_with_origin(&id, &range, || origin(cx.func, inst));
            }
        }

        if let Some(dest) = dest {
            if cx.func.var(dest)?.ty.is_int() {
                if let Some(id) = self.naming.call_ret_id(cx.func, site) {
                    let range = self.range_of(cx, site.block, &Value::Var(dest))?;
                    changed |= self.table.union_with_origin(&id, &range, || origin(cx.func, inst));
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::Program;
    use crate::oracle::TaintSet;
    use crate::types::Ty;

    /// Builds `f(i8 a, i8 b)` whose body is produced by `body`; the result is
    /// stored into global `out`. Both params are unconstrained.
    fn eval(body: impl FnOnce(&mut FunctionBuilder, Value, Value) -> Value, a: IntRange, b: IntRange) -> IntRange {
        let mut program = Program::new();
        let f = program.declare("f", &[Ty::int(8), Ty::int(8)], Ty::Void);
        let mut fb = FunctionBuilder::new("f", &[Ty::int(8), Ty::int(8)], Ty::Void);
        let entry = fb.block();
        fb.switch_to(entry);
        let (x, y) = (fb.param(0), fb.param(1));
        let out = body(&mut fb, x, y);
        fb.store_global(out, "out");
        fb.ret(None);
        program.define(f, fb.finish());

        let mut table = crate::table::RangeTable::new();
        table.union(&"arg.f.0".into(), &a);
        table.union(&"arg.f.1".into(), &b);
        let mut pass = RangePass::new(&program).with_table(table);
        pass.run().unwrap();
        pass.table().get("var.out").cloned().unwrap_or(IntRange::empty(8))
    }

    #[test]
    fn test_binary_add() {
        let r = eval(
            |b, x, y| b.binary(BinOp::Add, x, y),
            IntRange::inclusive(8, 0, 10),
            IntRange::inclusive(8, 5, 5),
        );
        assert_eq!(r, IntRange::inclusive(8, 5, 15));
    }

    #[test]
    fn test_placeholders_pass_operand_through() {
        let a = IntRange::inclusive(8, 10, 20);
        let b = IntRange::inclusive(8, 1, 3);
        assert_eq!(eval(|f, x, y| f.binary(BinOp::Xor, x, y), a.clone(), b.clone()), a);
        assert_eq!(eval(|f, x, y| f.binary(BinOp::SDiv, x, y), a.clone(), b.clone()), a);
        assert_eq!(eval(|f, x, y| f.binary(BinOp::URem, x, y), a.clone(), b.clone()), b);
    }

    #[test]
    fn test_select_unions_operands() {
        let r = eval(
            |b, x, y| {
                let c = b.icmp(crate::predicate::Predicate::Ult, x.clone(), y.clone());
                b.select(c, x, y)
            },
            IntRange::inclusive(8, 0, 3),
            IntRange::inclusive(8, 10, 12),
        );
        assert_eq!(r, IntRange::inclusive(8, 0, 12));
    }

    #[test]
    fn test_casts() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        let x = b.param(0);
        let z = b.cast(CastOp::ZExt, x.clone(), Ty::int(16));
        let s = b.cast(CastOp::SExt, x.clone(), Ty::int(16));
        let p = b.cast(CastOp::PtrToInt, Value::global("g"), Ty::int(64));
        let t = b.cast(CastOp::Trunc, z.clone(), Ty::int(4));
        b.ret(None);
        let f = program.add_function(b.finish());

        let taint: TaintSet = ["arg.f.0"].into_iter().collect();
        let mut pass = RangePass::new(&program).with_taint(taint);
        pass.run().unwrap();

        assert_eq!(pass.range_at(f, entry, &z).unwrap(), IntRange::inclusive(16, 0, 255));
        assert_eq!(pass.range_at(f, entry, &s).unwrap(), IntRange::inclusive(16, 0xFF80, 0x7F));
        assert!(pass.range_at(f, entry, &p).unwrap().is_full());
        assert!(pass.range_at(f, entry, &t).unwrap().is_full());
    }

    #[test]
    fn test_sext_that_narrows_is_unmodeled() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[Ty::int(16)], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        b.cast(CastOp::SExt, b.param(0), Ty::int(8));
        b.ret(None);
        program.add_function(b.finish());

        let taint: TaintSet = ["arg.f.0"].into_iter().collect();
        let mut pass = RangePass::new(&program).with_taint(taint);
        assert!(matches!(pass.run(), Err(RangeError::Unmodeled { .. })));
    }

    #[test]
    fn test_store_then_load_in_same_block() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        b.store_global(Value::int(32, 42), "g");
        let v = b.load_global("g", Ty::int(32));
        b.ret(None);
        let f = program.add_function(b.finish());

        let mut pass = RangePass::new(&program);
        pass.run().unwrap();
        assert_eq!(pass.table().get("var.g"), Some(&IntRange::constant(32, 42)));
        assert_eq!(pass.range_at(f, entry, &v).unwrap(), IntRange::constant(32, 42));
    }
}
