//! In-memory program model.
//!
//! A [`Program`] is a set of functions and global variables. Each defined
//! function is a list of basic blocks in layout order; block 0 is the entry.
//! Every block holds straight-line [`Instruction`]s followed by exactly one
//! [`Terminator`]. Values are in SSA form: each [`VarId`] is defined once,
//! either as a parameter or by one instruction.
//!
//! The model is intentionally small. Operations the range analysis has no rule
//! for are represented by [`Op::Opaque`], whose integer result is treated as
//! unconstrained.

use crate::apint::ApInt;
use crate::error::{RangeError, Result};
use crate::predicate::Predicate;
use crate::types::{BlockId, FuncId, Ty, VarId};

/// An operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer constant.
    Const(ApInt),
    /// SSA variable of the enclosing function.
    Var(VarId),
    /// Address of a global variable.
    Global(String),
}

impl Value {
    pub fn int(width: u32, value: u64) -> Value {
        Value::Const(ApInt::from_u64(width, value))
    }

    pub fn global(name: impl Into<String>) -> Value {
        Value::Global(name.into())
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Value::Var(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Value::Const(_))
    }
}

impl From<VarId> for Value {
    fn from(var: VarId) -> Self {
        Value::Var(var)
    }
}

/// Where a variable is defined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Def {
    /// Formal parameter at the given position.
    Param(usize),
    /// Result of instruction `index` of `block`.
    Inst { block: BlockId, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    pub name: Option<String>,
    pub ty: Ty,
    pub def: Def,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    PtrToInt,
    IntToPtr,
    BitCast,
}

/// Target of a call instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    Direct(FuncId),
    /// Call through a function pointer; targets come from the callee resolver.
    Indirect(Value),
    InlineAsm,
}

/// Memory location accessed by a load or store, as far as it is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemTarget {
    /// The whole of a global variable.
    Global(String),
    /// Field `index` of any value of the aggregate type `aggregate`.
    Field { aggregate: String, index: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Binary {
        dest: VarId,
        op: BinOp,
        lhs: Value,
        rhs: Value,
    },
    ICmp {
        dest: VarId,
        pred: Predicate,
        lhs: Value,
        rhs: Value,
    },
    Cast {
        dest: VarId,
        op: CastOp,
        src: Value,
    },
    Select {
        dest: VarId,
        cond: Value,
        on_true: Value,
        on_false: Value,
    },
    Phi {
        dest: VarId,
        incoming: Vec<(BlockId, Value)>,
    },
    Load {
        dest: VarId,
        ptr: Value,
        target: Option<MemTarget>,
    },
    Store {
        value: Value,
        ptr: Value,
        target: Option<MemTarget>,
    },
    Call {
        dest: Option<VarId>,
        callee: Callee,
        args: Vec<Value>,
    },
    /// Any other operation (float arithmetic, address computation, ...).
    Opaque {
        dest: Option<VarId>,
        name: String,
        args: Vec<Value>,
    },
}

impl Op {
    /// The variable defined by this operation, if any.
    pub fn dest(&self) -> Option<VarId> {
        match self {
            Op::Binary { dest, .. }
            | Op::ICmp { dest, .. }
            | Op::Cast { dest, .. }
            | Op::Select { dest, .. }
            | Op::Phi { dest, .. }
            | Op::Load { dest, .. } => Some(*dest),
            Op::Call { dest, .. } | Op::Opaque { dest, .. } => *dest,
            Op::Store { .. } => None,
        }
    }

    /// All value operands, in order.
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Op::Binary { lhs, rhs, .. } | Op::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            Op::Cast { src, .. } => vec![src],
            Op::Select {
                cond,
                on_true,
                on_false,
                ..
            } => vec![cond, on_true, on_false],
            Op::Phi { incoming, .. } => incoming.iter().map(|(_, v)| v).collect(),
            Op::Load { ptr, .. } => vec![ptr],
            Op::Store { value, ptr, .. } => vec![value, ptr],
            Op::Call { callee, args, .. } => {
                let mut ops: Vec<&Value> = args.iter().collect();
                if let Callee::Indirect(target) = callee {
                    ops.push(target);
                }
                ops
            }
            Op::Opaque { args, .. } => args.iter().collect(),
        }
    }
}

/// Source position, with the chain of call sites it was inlined through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLoc {
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// Name of the function the code was written in.
    pub scope: String,
    pub inlined_at: Option<Box<DebugLoc>>,
}

impl DebugLoc {
    pub fn new(file: impl Into<String>, line: u32, column: u32, scope: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            scope: scope.into(),
            inlined_at: None,
        }
    }

    pub fn inlined_at(mut self, site: DebugLoc) -> Self {
        self.inlined_at = Some(Box::new(site));
        self
    }

    /// This location followed by every enclosing inlined call site.
    pub fn frames(&self) -> Vec<&DebugLoc> {
        let mut frames = vec![self];
        let mut cur = self;
        while let Some(next) = cur.inlined_at.as_deref() {
            frames.push(next);
            cur = next;
        }
        frames
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub loc: Option<DebugLoc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: Value,
        then_bb: BlockId,
        else_bb: BlockId,
    },
    Switch {
        cond: Value,
        default: BlockId,
        cases: Vec<(ApInt, BlockId)>,
    },
    Ret(Option<Value>),
    Unreachable,
}

impl Terminator {
    /// Successor blocks, in order, possibly with repetitions.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr { then_bb, else_bb, .. } => vec![*then_bb, *else_bb],
            Terminator::Switch { default, cases, .. } => {
                let mut succs = vec![*default];
                succs.extend(cases.iter().map(|(_, bb)| *bb));
                succs
            }
            Terminator::Ret(_) | Terminator::Unreachable => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub insts: Vec<Instruction>,
    pub term: Terminator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<VarId>,
    pub ret_ty: Ty,
    pub is_var_arg: bool,
    pub blocks: Vec<Block>,
    pub vars: Vec<VarInfo>,
}

impl Function {
    /// A function with the given signature and no body.
    pub fn declare(name: impl Into<String>, params: &[Ty], ret_ty: Ty) -> Self {
        let vars: Vec<VarInfo> = params
            .iter()
            .enumerate()
            .map(|(i, ty)| VarInfo {
                name: None,
                ty: ty.clone(),
                def: Def::Param(i),
            })
            .collect();
        Self {
            name: name.into(),
            params: (0..vars.len()).map(VarId::new).collect(),
            ret_ty,
            is_var_arg: false,
            blocks: Vec::new(),
            vars,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Compiler intrinsics carry a `.` in their name (`llvm.memcpy.p0.p0.i64`).
    pub fn is_intrinsic(&self) -> bool {
        self.name.contains('.')
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId::new)
    }

    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(id.index()).ok_or_else(|| RangeError::InvalidBlock {
            function: self.name.clone(),
            block: id,
        })
    }

    pub fn var(&self, id: VarId) -> Result<&VarInfo> {
        self.vars.get(id.index()).ok_or_else(|| RangeError::InvalidVar {
            function: self.name.clone(),
            var: id,
        })
    }

    /// The instruction defining `var`, or `None` for parameters.
    pub fn def_inst(&self, var: VarId) -> Result<Option<&Instruction>> {
        match self.var(var)?.def {
            Def::Param(_) => Ok(None),
            Def::Inst { block, index } => {
                let inst = self.block(block)?.insts.get(index).ok_or_else(|| RangeError::InvalidVar {
                    function: self.name.clone(),
                    var,
                })?;
                Ok(Some(inst))
            }
        }
    }
}

/// Constant initializer of a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(ApInt),
    /// Struct value; `ty_name` is `None` for literal (unnamed) struct types.
    Struct {
        ty_name: Option<String>,
        fields: Vec<Constant>,
    },
    Array(Vec<Constant>),
    /// Floats, pointers, strings, and anything else without an integer value.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVar {
    pub name: String,
    pub ty: Ty,
    pub init: Option<Constant>,
}

impl GlobalVar {
    pub fn new(name: impl Into<String>, ty: Ty, init: Option<Constant>) -> Self {
        Self {
            name: name.into(),
            ty,
            init,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: Vec<Function>,
    globals: Vec<GlobalVar>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function without a body, to be defined later.
    pub fn declare(&mut self, name: impl Into<String>, params: &[Ty], ret_ty: Ty) -> FuncId {
        self.add_function(Function::declare(name, params, ret_ty))
    }

    pub fn add_function(&mut self, func: Function) -> FuncId {
        self.functions.push(func);
        FuncId::new(self.functions.len() - 1)
    }

    /// Replaces a declaration with its definition.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not exist or the names differ.
    pub fn define(&mut self, id: FuncId, func: Function) {
        let slot = &mut self.functions[id.index()];
        assert_eq!(slot.name, func.name, "Definition does not match declaration");
        *slot = func;
    }

    pub fn add_global(&mut self, global: GlobalVar) {
        self.globals.push(global);
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.functions.iter().position(|f| f.name == name).map(FuncId::new)
    }

    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions.iter().enumerate().map(|(i, f)| (FuncId::new(i), f))
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVar> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn globals(&self) -> &[GlobalVar] {
        &self.globals
    }

    /// Type of an operand of `func`.
    ///
    /// A global is a pointer to its contents; an unknown global points to an
    /// opaque value.
    pub fn value_ty(&self, func: &Function, value: &Value) -> Result<Ty> {
        Ok(match value {
            Value::Const(c) => Ty::Int(c.width()),
            Value::Var(v) => func.var(*v)?.ty.clone(),
            Value::Global(name) => match self.global(name) {
                Some(g) => Ty::ptr(g.ty.clone()),
                None => Ty::ptr(Ty::Other),
            },
        })
    }

    /// Checks that every block, variable and direct callee referenced by a
    /// function exists, and that every variable is defined where it says.
    pub fn validate(&self) -> Result<()> {
        for (_, func) in self.functions() {
            self.validate_function(func)?;
        }
        Ok(())
    }

    fn validate_function(&self, func: &Function) -> Result<()> {
        let check_value = |value: &Value| -> Result<()> {
            if let Value::Var(v) = value {
                func.var(*v)?;
            }
            Ok(())
        };

        for &param in &func.params {
            func.var(param)?;
        }
        for (var, info) in func.vars.iter().enumerate() {
            let var = VarId::new(var);
            match info.def {
                Def::Param(i) => {
                    if func.params.get(i) != Some(&var) {
                        return Err(RangeError::InvalidVar {
                            function: func.name.clone(),
                            var,
                        });
                    }
                }
                Def::Inst { .. } => {
                    let defined = func.def_inst(var)?.and_then(|inst| inst.op.dest());
                    if defined != Some(var) {
                        return Err(RangeError::InvalidVar {
                            function: func.name.clone(),
                            var,
                        });
                    }
                }
            }
        }

        for block in &func.blocks {
            for inst in &block.insts {
                if let Some(dest) = inst.op.dest() {
                    func.var(dest)?;
                }
                for value in inst.op.operands() {
                    check_value(value)?;
                }
                match &inst.op {
                    Op::Phi { incoming, .. } => {
                        for (pred, _) in incoming {
                            func.block(*pred)?;
                        }
                    }
                    Op::Call {
                        callee: Callee::Direct(callee),
                        ..
                    } => {
                        if self.function(*callee).is_none() {
                            return Err(RangeError::InvalidCallee {
                                function: func.name.clone(),
                                callee: *callee,
                            });
                        }
                    }
                    _ => {}
                }
            }
            match &block.term {
                Terminator::CondBr { cond, .. } | Terminator::Switch { cond, .. } => check_value(cond)?,
                Terminator::Ret(Some(value)) => check_value(value)?,
                Terminator::Br(_) | Terminator::Ret(None) | Terminator::Unreachable => {}
            }
            for succ in block.term.successors() {
                func.block(succ)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_declare_creates_params() {
        let f = Function::declare("f", &[Ty::int(8), Ty::int(32)], Ty::Void);
        assert!(f.is_declaration());
        assert_eq!(f.params, vec![VarId::new(0), VarId::new(1)]);
        assert_eq!(f.var(VarId::new(1)).unwrap().ty, Ty::int(32));
        assert_eq!(f.var(VarId::new(1)).unwrap().def, Def::Param(1));
        assert!(f.var(VarId::new(2)).is_err());
    }

    #[test]
    fn test_intrinsic_names() {
        assert!(Function::declare("llvm.memcpy.p0.p0.i64", &[], Ty::Void).is_intrinsic());
        assert!(!Function::declare("memcpy", &[], Ty::Void).is_intrinsic());
    }

    #[test]
    fn test_debug_loc_frames() {
        let loc = DebugLoc::new("a.c", 3, 5, "inner").inlined_at(DebugLoc::new("b.c", 10, 1, "outer"));
        let frames = loc.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].scope, "outer");
    }

    #[test]
    fn test_validate_rejects_bad_successor() {
        let mut f = Function::declare("f", &[], Ty::Void);
        f.blocks.push(Block {
            insts: vec![],
            term: Terminator::Br(BlockId::new(4)),
        });
        let mut program = Program::new();
        program.add_function(f);
        assert!(matches!(
            program.validate(),
            Err(RangeError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_value_ty_of_global() {
        let mut program = Program::new();
        program.add_global(GlobalVar::new("g", Ty::int(16), None));
        let f = Function::declare("f", &[], Ty::Void);
        assert_eq!(
            program.value_ty(&f, &Value::global("g")).unwrap(),
            Ty::ptr(Ty::int(16))
        );
        assert_eq!(
            program.value_ty(&f, &Value::global("missing")).unwrap().range_width(),
            None
        );
    }
}
