//! Incremental construction of functions in SSA form.
//!
//! # Examples
//!
//! ```
//! use range_rs::builder::FunctionBuilder;
//! use range_rs::ir::{BinOp, Value};
//! use range_rs::types::Ty;
//!
//! // i8 inc(i8 x) { return x + 1; }
//! let mut b = FunctionBuilder::new("inc", &[Ty::int(8)], Ty::int(8));
//! let entry = b.block();
//! b.switch_to(entry);
//! let x = b.param(0);
//! let y = b.binary(BinOp::Add, x, Value::int(8, 1));
//! b.ret(Some(y));
//! let f = b.finish();
//! assert_eq!(f.blocks.len(), 1);
//! ```

use crate::apint::ApInt;
use crate::ir::{BinOp, Block, Callee, CastOp, DebugLoc, Def, Function, Instruction, MemTarget, Op, Terminator, Value, VarInfo};
use crate::predicate::Predicate;
use crate::types::{BlockId, Ty, VarId};

pub struct FunctionBuilder {
    func: Function,
    current: Option<BlockId>,
    loc: Option<DebugLoc>,
}

// Constructors
impl FunctionBuilder {
    pub fn new(name: impl Into<String>, params: &[Ty], ret_ty: Ty) -> Self {
        Self {
            func: Function::declare(name, params, ret_ty),
            current: None,
            loc: None,
        }
    }

    pub fn var_arg(mut self) -> Self {
        self.func.is_var_arg = true;
        self
    }

    pub fn finish(self) -> Function {
        self.func
    }
}

// Blocks and positions
impl FunctionBuilder {
    /// Appends a new block, terminated by `unreachable` until set otherwise.
    pub fn block(&mut self) -> BlockId {
        self.func.blocks.push(Block {
            insts: Vec::new(),
            term: Terminator::Unreachable,
        });
        BlockId::new(self.func.blocks.len() - 1)
    }

    /// Directs subsequent instructions into `block`.
    pub fn switch_to(&mut self, block: BlockId) {
        assert!(block.index() < self.func.blocks.len(), "No such block: {}", block);
        self.current = Some(block);
    }

    pub fn current(&self) -> BlockId {
        self.current.expect("No current block")
    }

    /// Attaches `loc` to every instruction built from now on.
    pub fn set_loc(&mut self, loc: Option<DebugLoc>) {
        self.loc = loc;
    }

    pub fn param(&self, index: usize) -> Value {
        Value::Var(self.func.params[index])
    }

    /// Gives a variable a human-readable name.
    pub fn name(&mut self, value: &Value, name: impl Into<String>) {
        if let Value::Var(v) = value {
            self.func.vars[v.index()].name = Some(name.into());
        }
    }

    pub fn ty_of(&self, value: &Value) -> Ty {
        match value {
            Value::Const(c) => Ty::Int(c.width()),
            Value::Var(v) => self.func.vars[v.index()].ty.clone(),
            Value::Global(_) => Ty::ptr(Ty::Other),
        }
    }

    fn new_var(&mut self, ty: Ty) -> VarId {
        let block = self.current();
        let index = self.func.blocks[block.index()].insts.len();
        self.func.vars.push(VarInfo {
            name: None,
            ty,
            def: Def::Inst { block, index },
        });
        VarId::new(self.func.vars.len() - 1)
    }

    fn push(&mut self, op: Op) {
        let block = self.current();
        let loc = self.loc.clone();
        self.func.blocks[block.index()].insts.push(Instruction { op, loc });
    }

    fn terminate(&mut self, term: Terminator) {
        let block = self.current();
        self.func.blocks[block.index()].term = term;
    }
}

// Instructions
impl FunctionBuilder {
    pub fn binary(&mut self, op: BinOp, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_var(self.ty_of(&lhs));
        self.push(Op::Binary { dest, op, lhs, rhs });
        Value::Var(dest)
    }

    pub fn icmp(&mut self, pred: Predicate, lhs: Value, rhs: Value) -> Value {
        let dest = self.new_var(Ty::int(1));
        self.push(Op::ICmp { dest, pred, lhs, rhs });
        Value::Var(dest)
    }

    pub fn cast(&mut self, op: CastOp, src: Value, to: Ty) -> Value {
        let dest = self.new_var(to);
        self.push(Op::Cast { dest, op, src });
        Value::Var(dest)
    }

    pub fn select(&mut self, cond: Value, on_true: Value, on_false: Value) -> Value {
        let dest = self.new_var(self.ty_of(&on_true));
        self.push(Op::Select {
            dest,
            cond,
            on_true,
            on_false,
        });
        Value::Var(dest)
    }

    /// A phi without incoming values; see [`add_incoming`][Self::add_incoming].
    pub fn phi(&mut self, ty: Ty) -> Value {
        let dest = self.new_var(ty);
        self.push(Op::Phi {
            dest,
            incoming: Vec::new(),
        });
        Value::Var(dest)
    }

    pub fn add_incoming(&mut self, phi: &Value, pred: BlockId, value: Value) {
        let var = phi.as_var().expect("Phi must be a variable");
        let Def::Inst { block, index } = self.func.vars[var.index()].def else {
            panic!("{} is not a phi", var);
        };
        match &mut self.func.blocks[block.index()].insts[index].op {
            Op::Phi { incoming, .. } => incoming.push((pred, value)),
            _ => panic!("{} is not a phi", var),
        }
    }

    pub fn load(&mut self, ty: Ty, ptr: Value, target: Option<MemTarget>) -> Value {
        let dest = self.new_var(ty);
        self.push(Op::Load { dest, ptr, target });
        Value::Var(dest)
    }

    pub fn load_global(&mut self, name: &str, ty: Ty) -> Value {
        self.load(ty, Value::global(name), Some(MemTarget::Global(name.to_string())))
    }

    pub fn store(&mut self, value: Value, ptr: Value, target: Option<MemTarget>) {
        self.push(Op::Store { value, ptr, target });
    }

    pub fn store_global(&mut self, value: Value, name: &str) {
        self.store(value, Value::global(name), Some(MemTarget::Global(name.to_string())));
    }

    pub fn call(&mut self, callee: Callee, args: Vec<Value>, ret_ty: Ty) -> Value {
        let dest = self.new_var(ret_ty);
        self.push(Op::Call {
            dest: Some(dest),
            callee,
            args,
        });
        Value::Var(dest)
    }

    pub fn call_void(&mut self, callee: Callee, args: Vec<Value>) {
        self.push(Op::Call {
            dest: None,
            callee,
            args,
        });
    }

    /// An operation the analysis does not model.
    pub fn opaque(&mut self, name: impl Into<String>, ty: Ty, args: Vec<Value>) -> Value {
        let dest = self.new_var(ty);
        self.push(Op::Opaque {
            dest: Some(dest),
            name: name.into(),
            args,
        });
        Value::Var(dest)
    }
}

// Terminators
impl FunctionBuilder {
    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br(target));
    }

    pub fn cond_br(&mut self, cond: Value, then_bb: BlockId, else_bb: BlockId) {
        self.terminate(Terminator::CondBr { cond, then_bb, else_bb });
    }

    /// A switch whose case values take the width of `cond`.
    pub fn switch(&mut self, cond: Value, default: BlockId, cases: &[(u64, BlockId)]) {
        let width = self.ty_of(&cond).int_width().expect("Switch on a non-integer");
        let cases = cases
            .iter()
            .map(|&(v, bb)| (ApInt::from_u64(width, v), bb))
            .collect();
        self.terminate(Terminator::Switch { cond, default, cases });
    }

    pub fn ret(&mut self, value: Option<Value>) {
        self.terminate(Terminator::Ret(value));
    }

    pub fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_defs_point_back_to_instructions() {
        let mut b = FunctionBuilder::new("f", &[Ty::int(32)], Ty::int(32));
        let entry = b.block();
        b.switch_to(entry);
        let x = b.param(0);
        let y = b.binary(BinOp::Mul, x.clone(), Value::int(32, 3));
        let c = b.icmp(Predicate::Slt, y.clone(), x);
        b.ret(Some(y.clone()));
        let f = b.finish();

        let y = y.as_var().unwrap();
        assert_eq!(f.var(y).unwrap().def, Def::Inst { block: entry, index: 0 });
        assert_eq!(f.var(c.as_var().unwrap()).unwrap().ty, Ty::int(1));
        assert_eq!(f.def_inst(y).unwrap().unwrap().op.dest(), Some(y));
        assert_eq!(f.blocks[0].term, Terminator::Ret(Some(Value::Var(y))));
    }

    #[test]
    fn test_phi_incoming() {
        let mut b = FunctionBuilder::new("f", &[], Ty::Void);
        let entry = b.block();
        let head = b.block();
        b.switch_to(entry);
        b.br(head);
        b.switch_to(head);
        let i = b.phi(Ty::int(8));
        b.add_incoming(&i, entry, Value::int(8, 0));
        b.add_incoming(&i, head, i.clone());
        b.br(head);
        let f = b.finish();

        match &f.blocks[1].insts[0].op {
            Op::Phi { incoming, .. } => assert_eq!(incoming.len(), 2),
            op => panic!("unexpected {:?}", op),
        }
    }

    #[test]
    fn test_switch_case_width() {
        let mut b = FunctionBuilder::new("f", &[Ty::int(16)], Ty::Void);
        let entry = b.block();
        let other = b.block();
        b.switch_to(entry);
        let x = b.param(0);
        b.switch(x, other, &[(7, other)]);
        let f = b.finish();
        match &f.blocks[0].term {
            Terminator::Switch { cases, .. } => assert_eq!(cases[0].0, ApInt::from_u64(16, 7)),
            t => panic!("unexpected {:?}", t),
        }
    }
}
