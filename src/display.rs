//! Textual rendering of the program model.
//!
//! The format loosely follows LLVM assembly and is used for diagnostics,
//! watch traces, and DOT labels.

use std::fmt;
use std::fmt::Write;

use crate::ir::{BinOp, Callee, CastOp, DebugLoc, Function, Instruction, MemTarget, Op, Terminator, Value};
use crate::types::VarId;

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::UDiv => "udiv",
            BinOp::SDiv => "sdiv",
            BinOp::URem => "urem",
            BinOp::SRem => "srem",
            BinOp::Shl => "shl",
            BinOp::LShr => "lshr",
            BinOp::AShr => "ashr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::BitCast => "bitcast",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for MemTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemTarget::Global(name) => write!(f, "@{}", name),
            MemTarget::Field { aggregate, index } => write!(f, "{}.{}", aggregate, index),
        }
    }
}

/// `file:line:col`
impl fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl Function {
    /// Renders an operand: `%name` (or `%N`) for variables, `@name` for
    /// globals, decimal for constants.
    pub fn render_value(&self, value: &Value) -> String {
        match value {
            Value::Const(c) => c.to_string(),
            Value::Global(name) => format!("@{}", name),
            Value::Var(var) => match self.vars.get(var.index()).and_then(|v| v.name.as_deref()) {
                Some(name) => format!("%{}", name),
                None => var.to_string(),
            },
        }
    }

    fn render_values(&self, values: &[Value]) -> String {
        values.iter().map(|v| self.render_value(v)).collect::<Vec<_>>().join(", ")
    }

    fn render_dest(&self, dest: VarId) -> String {
        self.render_value(&Value::Var(dest))
    }

    pub fn render_inst(&self, inst: &Instruction) -> String {
        match &inst.op {
            Op::Binary { dest, op, lhs, rhs } => format!(
                "{} = {} {}, {}",
                self.render_dest(*dest),
                op,
                self.render_value(lhs),
                self.render_value(rhs)
            ),
            Op::ICmp { dest, pred, lhs, rhs } => format!(
                "{} = icmp {} {}, {}",
                self.render_dest(*dest),
                pred,
                self.render_value(lhs),
                self.render_value(rhs)
            ),
            Op::Cast { dest, op, src } => {
                let ty = self.vars.get(dest.index()).map(|v| v.ty.to_string()).unwrap_or_default();
                format!("{} = {} {} to {}", self.render_dest(*dest), op, self.render_value(src), ty)
            }
            Op::Select {
                dest,
                cond,
                on_true,
                on_false,
            } => format!(
                "{} = select {}, {}, {}",
                self.render_dest(*dest),
                self.render_value(cond),
                self.render_value(on_true),
                self.render_value(on_false)
            ),
            Op::Phi { dest, incoming } => {
                let incoming: Vec<String> = incoming
                    .iter()
                    .map(|(bb, v)| format!("[{}, {}]", self.render_value(v), bb))
                    .collect();
                format!("{} = phi {}", self.render_dest(*dest), incoming.join(", "))
            }
            Op::Load { dest, ptr, .. } => format!("{} = load {}", self.render_dest(*dest), self.render_value(ptr)),
            Op::Store { value, ptr, .. } => {
                format!("store {}, {}", self.render_value(value), self.render_value(ptr))
            }
            Op::Call { dest, callee, args } => {
                let callee = match callee {
                    Callee::Direct(id) => id.to_string(),
                    Callee::Indirect(target) => self.render_value(target),
                    Callee::InlineAsm => "asm".to_string(),
                };
                let call = format!("call {}({})", callee, self.render_values(args));
                match dest {
                    Some(dest) => format!("{} = {}", self.render_dest(*dest), call),
                    None => call,
                }
            }
            Op::Opaque { dest, name, args } => {
                let op = format!("{} {}", name, self.render_values(args));
                match dest {
                    Some(dest) => format!("{} = {}", self.render_dest(*dest), op.trim_end()),
                    None => op.trim_end().to_string(),
                }
            }
        }
    }

    pub fn render_terminator(&self, term: &Terminator) -> String {
        match term {
            Terminator::Br(target) => format!("br {}", target),
            Terminator::CondBr { cond, then_bb, else_bb } => {
                format!("br {}, {}, {}", self.render_value(cond), then_bb, else_bb)
            }
            Terminator::Switch { cond, default, cases } => {
                let mut s = format!("switch {}, {} [", self.render_value(cond), default);
                for (value, bb) in cases {
                    let _ = write!(s, " {}: {}", value, bb);
                }
                s.push_str(" ]");
                s
            }
            Terminator::Ret(Some(value)) => format!("ret {}", self.render_value(value)),
            Terminator::Ret(None) => "ret void".to_string(),
            Terminator::Unreachable => "unreachable".to_string(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let ty = self.vars.get(p.index()).map(|v| v.ty.to_string()).unwrap_or_default();
                format!("{} {}", ty, self.render_value(&Value::Var(*p)))
            })
            .collect();
        let mut params = params.join(", ");
        if self.is_var_arg {
            params.push_str(if self.params.is_empty() { "..." } else { ", ..." });
        }

        if self.is_declaration() {
            return writeln!(f, "declare {} @{}({})", self.ret_ty, self.name, params);
        }
        writeln!(f, "define {} @{}({}) {{", self.ret_ty, self.name, params)?;
        for (id, block) in self.block_ids().zip(&self.blocks) {
            writeln!(f, "{}:", id)?;
            for inst in &block.insts {
                writeln!(f, "  {}", self.render_inst(inst))?;
            }
            writeln!(f, "  {}", self.render_terminator(&block.term))?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::predicate::Predicate;
    use crate::types::Ty;

    #[test]
    fn test_render_function() {
        let mut b = FunctionBuilder::new("abs", &[Ty::int(32)], Ty::int(32));
        let entry = b.block();
        let neg = b.block();
        let done = b.block();
        b.switch_to(entry);
        let x = b.param(0);
        b.name(&x, "x");
        let c = b.icmp(Predicate::Slt, x.clone(), Value::int(32, 0));
        b.cond_br(c, neg, done);
        b.switch_to(neg);
        let y = b.binary(BinOp::Sub, Value::int(32, 0), x.clone());
        b.br(done);
        b.switch_to(done);
        let r = b.phi(Ty::int(32));
        b.add_incoming(&r, entry, x);
        b.add_incoming(&r, neg, y);
        b.ret(Some(r));
        let f = b.finish();

        let expected = "\
define i32 @abs(i32 %x) {
bb0:
  %1 = icmp slt %x, 0
  br %1, bb1, bb2
bb1:
  %2 = sub 0, %x
  br bb2
bb2:
  %3 = phi [%x, bb0], [%2, bb1]
  ret %3
}
";
        assert_eq!(f.to_string(), expected);
    }

    #[test]
    fn test_render_switch_and_store() {
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::Void);
        let entry = b.block();
        let other = b.block();
        b.switch_to(entry);
        b.store_global(b.param(0), "g");
        b.switch(b.param(0), other, &[(1, other), (7, entry)]);
        b.switch_to(other);
        b.ret(None);
        let f = b.finish();

        let block = &f.blocks[0];
        assert_eq!(f.render_inst(&block.insts[0]), "store %0, @g");
        assert_eq!(f.render_terminator(&block.term), "switch %0, bb1 [ 1: bb1 7: bb0 ]");
        assert_eq!(DebugLoc::new("a.c", 3, 9, "f").to_string(), "a.c:3:9");
    }
}
