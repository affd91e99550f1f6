//! Whole-program range propagation.
//!
//! [`RangePass`] computes, for every integer location named by a
//! [`SymbolId`], a range that over-approximates the values stored there. It is
//! a chaotic iteration over all functions:
//!
//! 1. Global initializers seed the [`RangeTable`].
//! 2. Each round sweeps every defined function. A sweep discovers the
//!    function's back-edges, then visits blocks in layout order. A block
//!    starts from the union of its predecessors' facts (each refined by the
//!    predecessor's terminator, back-edges excluded), then runs the transfer
//!    function of every instruction. Stores, calls and returns publish ranges
//!    into the table.
//! 3. Rounds repeat until one publishes no change. Once the round counter
//!    exceeds [`RangeConfig::max_iterations`], every id that changed in the
//!    previous round is widened to the full range before the next round.
//!
//! # Examples
//!
//! ```
//! use range_rs::builder::FunctionBuilder;
//! use range_rs::ir::{Constant, GlobalVar, Program, Value};
//! use range_rs::apint::ApInt;
//! use range_rs::pass::RangePass;
//! use range_rs::range::IntRange;
//! use range_rs::types::Ty;
//!
//! let mut program = Program::new();
//! program.add_global(GlobalVar::new("g", Ty::int(8), Some(Constant::Int(ApInt::from_u64(8, 4)))));
//!
//! // void set() { g = 10; }
//! let mut b = FunctionBuilder::new("set", &[], Ty::Void);
//! let entry = b.block();
//! b.switch_to(entry);
//! b.store_global(Value::int(8, 10), "g");
//! b.ret(None);
//! program.add_function(b.finish());
//!
//! let mut pass = RangePass::new(&program);
//! pass.run().unwrap();
//! assert_eq!(pass.table().get("var.g"), Some(&IntRange::inclusive(8, 4, 10)));
//! ```

use std::collections::HashSet;

use log::{debug, info};

use crate::cfg;
use crate::config::RangeConfig;
use crate::error::{RangeError, Result};
use crate::facts::{BlockFacts, ValueRanges};
use crate::ir::{Callee, Constant, Def, Function, GlobalVar, Instruction, Op, Program, Value};
use crate::oracle::{CallGraph, CalleeResolver, DefaultNaming, SymbolNaming, TaintOracle, TaintSet};
use crate::range::IntRange;
use crate::table::RangeTable;
use crate::types::{BlockId, CallSite, Edge, FuncId, SymbolId};

/// Summary of a [`RangePass::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Rounds executed, including the final one that changed nothing.
    pub rounds: usize,
    /// Whether any round changed the table.
    pub changed: bool,
    /// Number of ids forcibly widened to the full range.
    pub widened: usize,
}

/// The function being swept.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub(crate) id: FuncId,
    pub(crate) func: &'a Function,
}

pub struct RangePass<'a> {
    pub(crate) program: &'a Program,
    pub(crate) naming: Box<dyn SymbolNaming + 'a>,
    pub(crate) callees: Box<dyn CalleeResolver + 'a>,
    pub(crate) taint: Box<dyn TaintOracle + 'a>,
    config: RangeConfig,
    pub(crate) table: RangeTable,

    validated: bool,

    // State of the current function sweep.
    swept: Option<FuncId>,
    pub(crate) back_edges: HashSet<Edge>,
    pub(crate) facts: BlockFacts,
}

// Constructors
impl<'a> RangePass<'a> {
    /// A pass over `program` with default naming, direct calls resolved, and
    /// no taint sources.
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            naming: Box::new(DefaultNaming),
            callees: Box::new(CallGraph::from_program(program)),
            taint: Box::new(TaintSet::new()),
            config: RangeConfig::default(),
            table: RangeTable::new(),
            validated: false,
            swept: None,
            back_edges: HashSet::new(),
            facts: BlockFacts::new(),
        }
    }

    pub fn with_naming(mut self, naming: impl SymbolNaming + 'a) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn with_callees(mut self, callees: impl CalleeResolver + 'a) -> Self {
        self.callees = Box::new(callees);
        self
    }

    pub fn with_taint(mut self, taint: impl TaintOracle + 'a) -> Self {
        self.taint = Box::new(taint);
        self
    }

    pub fn with_config(mut self, config: RangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts from previously computed facts instead of an empty table.
    pub fn with_table(mut self, table: RangeTable) -> Self {
        self.table = table;
        self
    }
}

// Getters
impl<'a> RangePass<'a> {
    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    pub fn into_table(self) -> RangeTable {
        self.table
    }

    pub fn naming(&self) -> &dyn SymbolNaming {
        self.naming.as_ref()
    }

    /// Facts of the most recently swept function.
    pub fn facts(&self) -> &BlockFacts {
        &self.facts
    }

    /// Logs every `id range` pair of the table.
    pub fn dump(&self) {
        for (id, range) in self.table.iter() {
            info!("{} {}", id, range);
        }
    }

    pub(crate) fn scope(&self, id: FuncId) -> Result<Scope<'a>> {
        let program = self.program;
        let func = program.function(id).ok_or_else(|| RangeError::InvalidCallee {
            function: String::from("<program>"),
            callee: id,
        })?;
        Ok(Scope { id, func })
    }

    /// A possible callee of a call made in `cx`.
    pub(crate) fn callee(&self, cx: Scope<'a>, id: FuncId) -> Result<&'a Function> {
        let program = self.program;
        program.function(id).ok_or_else(|| RangeError::InvalidCallee {
            function: cx.func.name.clone(),
            callee: id,
        })
    }
}

// Initializers
impl<'a> RangePass<'a> {
    /// Publishes the integer values found in global initializers.
    ///
    /// Scalars go to the global's id, integer fields of named structs to their
    /// field ids, and array elements to the id of the enclosing global or
    /// field. Globals whose name starts with `.` (string literals) are skipped.
    pub fn seed_initializers(&mut self) {
        let program = self.program;
        for global in program.globals() {
            if global.name.starts_with('.') {
                continue;
            }
            if let Some(init) = &global.init {
                self.collect_initializer(global, init);
            }
        }
    }

    fn collect_initializer(&mut self, global: &GlobalVar, init: &Constant) {
        match init {
            Constant::Int(value) => {
                if let Some(id) = self.naming.global_id(&global.name) {
                    self.union_initializer(global, &id, &IntRange::single(value.clone()));
                }
            }
            Constant::Struct { ty_name, fields } => {
                let Some(ty_name) = ty_name.as_deref() else {
                    return;
                };
                if !self.naming.is_named_aggregate(Some(ty_name)) {
                    return;
                }
                for (index, field) in fields.iter().enumerate() {
                    match field {
                        Constant::Struct { .. } => self.collect_initializer(global, field),
                        Constant::Int(_) | Constant::Array(_) => {
                            if let Some(id) = self.naming.field_id(ty_name, index as u32) {
                                self.collect_field(global, &id, field);
                            }
                        }
                        Constant::Other => {}
                    }
                }
            }
            Constant::Array(elements) => {
                for element in elements {
                    self.collect_initializer(global, element);
                }
            }
            Constant::Other => {}
        }
    }

    /// Integer contents of a struct field, possibly an array of integers.
    /// Structs nested in an array field seed their own fields.
    fn collect_field(&mut self, global: &GlobalVar, id: &SymbolId, field: &Constant) {
        match field {
            Constant::Int(value) => self.union_initializer(global, id, &IntRange::single(value.clone())),
            Constant::Array(elements) => {
                for element in elements {
                    self.collect_field(global, id, element);
                }
            }
            Constant::Struct { .. } => self.collect_initializer(global, field),
            Constant::Other => {}
        }
    }

    fn union_initializer(&mut self, global: &GlobalVar, id: &SymbolId, range: &IntRange) {
        self.table
            .union_with_origin(id, range, || format!("@{} initializer", global.name));
    }
}

// Fixpoint
impl<'a> RangePass<'a> {
    /// Seeds initializers and iterates until the table stops changing.
    pub fn run(&mut self) -> Result<RunStats> {
        self.validate()?;
        self.table.set_watch(self.config.watch.clone());
        self.seed_initializers();

        let program = self.program;
        let mut stats = RunStats::default();
        let mut changed = true;

        while changed {
            stats.rounds += 1;
            if stats.rounds > self.config.max_iterations {
                let widened = self.table.widen_changed();
                if widened > 0 {
                    info!("Round {}: widened {} slowly converging ids", stats.rounds, widened);
                }
                stats.widened += widened;
            }

            self.table.clear_changes();
            changed = false;
            for (id, func) in program.functions() {
                if !func.is_declaration() {
                    changed |= self.sweep_function(id)?;
                }
            }

            debug!("Round {}: {} ids changed", stats.rounds, self.table.changes().len());
            stats.changed |= changed;
        }

        debug!(
            "Converged after {} rounds with {} ids ({} widened)",
            stats.rounds,
            self.table.len(),
            stats.widened
        );
        Ok(stats)
    }

    /// Sweeps one function from fresh local facts.
    ///
    /// Returns whether the table changed.
    pub fn sweep_function(&mut self, id: FuncId) -> Result<bool> {
        self.validate()?;
        let cx = self.scope(id)?;
        self.facts.clear();
        self.back_edges = cfg::back_edges(cx.func);
        self.swept = Some(id);
        let preds = cfg::predecessors(cx.func);

        let mut changed = false;
        for block in cx.func.block_ids() {
            changed |= self.sweep_block(cx, block, &preds[block.index()])?;
        }
        debug!(
            "{}(): swept {} blocks, {} back-edges, changed = {}",
            cx.func.name,
            cx.func.blocks.len(),
            self.back_edges.len(),
            changed
        );
        Ok(changed)
    }

    /// Checks the program once, before its CFGs are walked.
    fn validate(&mut self) -> Result<()> {
        if !self.validated {
            self.program.validate()?;
            self.validated = true;
        }
        Ok(())
    }

    fn sweep_block(&mut self, cx: Scope<'a>, block: BlockId, preds: &[BlockId]) -> Result<bool> {
        let mut incoming = Vec::with_capacity(preds.len());
        for &pred in preds {
            if self.back_edges.contains(&Edge::new(pred, block)) {
                continue;
            }
            let mut ranges = self.facts.block(pred).cloned().unwrap_or_default();
            self.refine_edge(cx, pred, block, &mut ranges)?;
            incoming.push((pred, ranges));
        }
        self.complete_edges(cx, &mut incoming)?;
        for (_, ranges) in incoming {
            self.facts.merge(block, ranges);
        }

        let mut changed = false;
        for index in 0..cx.func.block(block)?.insts.len() {
            changed |= self.transfer(cx, block, index)?;
        }
        changed |= self.transfer_terminator(cx, block)?;
        Ok(changed)
    }

    /// Makes every value known along one incoming edge known along all of
    /// them, so the merge joins over every path into the block.
    ///
    /// An edge lacking a fact contributes the value's range at the end of its
    /// source block. Facts about memory behind a pointer whose pointee width
    /// is unknown are dropped instead; loads then read the table.
    fn complete_edges(&mut self, cx: Scope<'a>, incoming: &mut [(BlockId, ValueRanges)]) -> Result<()> {
        if incoming.len() < 2 {
            return Ok(());
        }
        let values: HashSet<Value> = incoming.iter().flat_map(|(_, r)| r.keys().cloned()).collect();
        for value in values {
            if incoming.iter().all(|(_, r)| r.contains_key(&value)) {
                continue;
            }
            if self.program.value_ty(cx.func, &value)?.range_width().is_none() {
                for (_, ranges) in incoming.iter_mut() {
                    ranges.remove(&value);
                }
                continue;
            }
            for (pred, ranges) in incoming.iter_mut() {
                if !ranges.contains_key(&value) {
                    let range = self.range_of(cx, *pred, &value)?;
                    ranges.insert(value.clone(), range);
                }
            }
        }
        Ok(())
    }

    /// The range of `value` in `block` of `func`.
    ///
    /// Sweeps `func` first unless it was the last function swept. After
    /// [`run`][Self::run] has converged this does not change the table.
    pub fn range_at(&mut self, func: FuncId, block: BlockId, value: &Value) -> Result<IntRange> {
        if self.swept != Some(func) {
            self.sweep_function(func)?;
        }
        let cx = self.scope(func)?;
        self.range_of(cx, block, value)
    }
}

// Value resolution
impl<'a> RangePass<'a> {
    /// Resolves the current range of `value` in `block`.
    ///
    /// In order: constants are exact; a local fact wins; a call result is the
    /// union of its callees' return ranges; a parameter or load reads its id
    /// from the table; otherwise the range is empty. Non-empty results are
    /// memoized as local facts of `block`.
    pub(crate) fn range_of(&mut self, cx: Scope<'a>, block: BlockId, value: &Value) -> Result<IntRange> {
        if let Value::Const(c) = value {
            return Ok(IntRange::single(c.clone()));
        }
        if let Some(range) = self.facts.get(block, value) {
            return Ok(range.clone());
        }

        let width = self.width_of(cx, value)?;
        let range = match call_site(cx, value)? {
            Some((site, callee)) => self.call_returns(cx, site, callee, width)?,
            None => {
                let mut range = IntRange::empty(width);
                if let Some(id) = self.value_id(cx, value)? {
                    if self.taint.is_taint_source(&id) {
                        range = IntRange::full(width);
                    } else if let Some(stored) = self.table.get(id.as_str()) {
                        range = stored.clone();
                    }
                }
                // A load may read part of a wider field.
                range.zext_or_trunc(width)
            }
        };

        if !range.is_empty() {
            self.facts.insert(block, value.clone(), range.clone());
        }
        Ok(range)
    }

    /// Union of the return ranges of every possible callee of `site`.
    fn call_returns(&self, cx: Scope<'a>, site: CallSite, callee: &Callee, width: u32) -> Result<IntRange> {
        let mut range = IntRange::empty(width);
        if matches!(callee, Callee::InlineAsm) {
            return Ok(range);
        }
        for target in self.callees.callees(site) {
            let target = self.callee(cx, target)?;
            let Some(id) = self.naming.ret_id(target) else {
                continue;
            };
            if self.taint.is_taint_source(&id) {
                return Ok(IntRange::full(width));
            }
            if let Some(ret) = self.table.get(id.as_str()) {
                range.union_in_place(ret);
            }
        }
        Ok(range)
    }

    /// Bit width of an integer value, or of the integer a pointer points to.
    pub(crate) fn width_of(&self, cx: Scope<'a>, value: &Value) -> Result<u32> {
        self.program
            .value_ty(cx.func, value)?
            .range_width()
            .ok_or_else(|| RangeError::NotInteger {
                function: cx.func.name.clone(),
                value: cx.func.render_value(value),
            })
    }

    pub(crate) fn is_int(&self, cx: Scope<'a>, value: &Value) -> Result<bool> {
        Ok(self.program.value_ty(cx.func, value)?.is_int())
    }

    /// The id a value reads from: a global, a parameter, or a load target.
    fn value_id(&self, cx: Scope<'a>, value: &Value) -> Result<Option<SymbolId>> {
        Ok(match value {
            Value::Const(_) => None,
            Value::Global(name) => self.naming.global_id(name),
            Value::Var(var) => match cx.func.var(*var)?.def {
                Def::Param(index) => self.naming.arg_id(cx.func, index),
                Def::Inst { .. } => match cx.func.def_inst(*var)? {
                    Some(Instruction {
                        op: Op::Load {
                            target: Some(target), ..
                        },
                        ..
                    }) => self.naming.mem_id(target),
                    _ => None,
                },
            },
        })
    }
}

/// The call site and callee, if `value` is the result of a call.
fn call_site<'a>(cx: Scope<'a>, value: &Value) -> Result<Option<(CallSite, &'a Callee)>> {
    let Value::Var(var) = value else {
        return Ok(None);
    };
    let Def::Inst { block, index } = cx.func.var(*var)?.def else {
        return Ok(None);
    };
    Ok(match cx.func.def_inst(*var)? {
        Some(Instruction {
            op: Op::Call { callee, .. },
            ..
        }) => Some((CallSite::new(cx.id, block, index), callee)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::apint::ApInt;
    use crate::builder::FunctionBuilder;
    use crate::ir::{Block, CastOp, MemTarget, Terminator};
    use crate::types::Ty;

    fn int_global(name: &str, width: u32, value: u64) -> GlobalVar {
        GlobalVar::new(
            name,
            Ty::int(width),
            Some(Constant::Int(ApInt::from_u64(width, value))),
        )
    }

    #[test]
    fn test_seed_scalars_skip_string_literals() {
        let mut program = Program::new();
        program.add_global(int_global("g", 32, 7));
        program.add_global(int_global(".str", 8, 1));
        let mut pass = RangePass::new(&program);
        pass.seed_initializers();
        assert_eq!(pass.table().get("var.g"), Some(&IntRange::constant(32, 7)));
        assert_eq!(pass.table().get("var..str"), None);
        assert_eq!(pass.table().len(), 1);
    }

    #[test]
    fn test_seed_struct_fields_and_arrays() {
        let int = |v| Constant::Int(ApInt::from_u64(16, v));
        let point = |x, y| Constant::Struct {
            ty_name: Some("struct.point".to_string()),
            fields: vec![int(x), int(y), Constant::Array(vec![int(1), int(9)])],
        };
        let anon = Constant::Struct {
            ty_name: Some("struct.anon".to_string()),
            fields: vec![int(100)],
        };
        let literal = Constant::Struct {
            ty_name: None,
            fields: vec![int(100)],
        };

        let mut program = Program::new();
        program.add_global(GlobalVar::new(
            "points",
            Ty::Other,
            Some(Constant::Array(vec![point(1, 2), point(5, 3)])),
        ));
        program.add_global(GlobalVar::new("a", Ty::Other, Some(anon)));
        program.add_global(GlobalVar::new("l", Ty::Other, Some(literal)));
        program.add_global(GlobalVar::new(
            "table",
            Ty::Other,
            Some(Constant::Array(vec![int(3), int(8)])),
        ));

        let mut pass = RangePass::new(&program);
        pass.seed_initializers();
        let table = pass.table();
        assert_eq!(table.get("struct.point.0"), Some(&IntRange::inclusive(16, 1, 5)));
        assert_eq!(table.get("struct.point.1"), Some(&IntRange::inclusive(16, 2, 3)));
        assert_eq!(table.get("struct.point.2"), Some(&IntRange::inclusive(16, 1, 9)));
        assert_eq!(table.get("var.table"), Some(&IntRange::inclusive(16, 3, 8)));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_seed_structs_inside_array_field() {
        let int = |v| Constant::Int(ApInt::from_u64(8, v));
        let pair = |a, b| Constant::Struct {
            ty_name: Some("struct.pair".to_string()),
            fields: vec![int(a), int(b)],
        };
        let list = Constant::Struct {
            ty_name: Some("struct.list".to_string()),
            fields: vec![int(2), Constant::Array(vec![pair(1, 40), pair(6, 30)])],
        };

        let mut program = Program::new();
        program.add_global(GlobalVar::new("list", Ty::Other, Some(list)));
        let mut pass = RangePass::new(&program);
        pass.seed_initializers();
        let table = pass.table();
        assert_eq!(table.get("struct.list.0"), Some(&IntRange::constant(8, 2)));
        assert_eq!(table.get("struct.pair.0"), Some(&IntRange::inclusive(8, 1, 6)));
        assert_eq!(table.get("struct.pair.1"), Some(&IntRange::inclusive(8, 30, 40)));
        assert_eq!(table.get("struct.list.1"), None);
    }

    #[test]
    fn test_direct_sweep_rejects_bad_successor() {
        let mut f = Function::declare("f", &[], Ty::Void);
        f.blocks.push(Block {
            insts: vec![],
            term: Terminator::Br(BlockId::new(4)),
        });
        let mut program = Program::new();
        let id = program.add_function(f);

        let mut pass = RangePass::new(&program);
        assert!(matches!(
            pass.sweep_function(id),
            Err(RangeError::InvalidBlock { .. })
        ));
        let mut pass = RangePass::new(&program);
        assert!(matches!(
            pass.range_at(id, BlockId::ENTRY, &Value::int(8, 1)),
            Err(RangeError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_param_without_callers_is_empty() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::int(8));
        let entry = b.block();
        b.switch_to(entry);
        b.ret(Some(b.param(0)));
        let f = program.add_function(b.finish());

        let mut pass = RangePass::new(&program);
        let stats = pass.run().unwrap();
        assert!(!stats.changed);
        assert_eq!(stats.rounds, 1);
        let x = Value::Var(program.function(f).unwrap().params[0]);
        assert!(pass.range_at(f, entry, &x).unwrap().is_empty());
        assert!(pass.table().get("ret.f").is_none());
    }

    #[test]
    fn test_load_truncates_wider_field() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        let target = MemTarget::Field {
            aggregate: "struct.s".to_string(),
            index: 0,
        };
        let v = b.load(Ty::int(8), Value::global("p"), Some(target));
        b.ret(None);
        let f = program.add_function(b.finish());

        let mut table = RangeTable::new();
        table.union(&SymbolId::from("struct.s.0"), &IntRange::inclusive(32, 0x100, 0x105));
        let mut pass = RangePass::new(&program).with_table(table);
        pass.run().unwrap();
        assert_eq!(pass.range_at(f, entry, &v).unwrap(), IntRange::inclusive(8, 0, 5));
    }

    #[test]
    fn test_not_integer_is_an_error() {
        let mut program = Program::new();
        let mut b = FunctionBuilder::new("f", &[Ty::Other], Ty::Void);
        let entry = b.block();
        b.switch_to(entry);
        b.cast(CastOp::ZExt, b.param(0), Ty::int(8));
        b.ret(None);
        program.add_function(b.finish());

        let mut pass = RangePass::new(&program);
        assert!(matches!(pass.run(), Err(RangeError::NotInteger { .. })));
    }
}
