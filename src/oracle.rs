//! Collaborators consulted by the range analysis.
//!
//! The analysis itself does not decide how storage locations are named, which
//! functions a call may reach, or which locations hold untrusted input. Those
//! answers come from three traits:
//!
//! - [`SymbolNaming`] maps globals, aggregate fields, arguments and return
//!   slots to stable [`SymbolId`]s,
//! - [`CalleeResolver`] lists the possible targets of a call site,
//! - [`TaintOracle`] marks ids whose value must be treated as unconstrained.
//!
//! Each trait has a simple default implementation here.

use std::collections::{HashMap, HashSet};

use crate::ir::{Callee, Function, MemTarget, Op, Program};
use crate::types::{BlockId, CallSite, FuncId, SymbolId};

pub trait SymbolNaming {
    fn global_id(&self, global: &str) -> Option<SymbolId>;

    /// Id of field `index` of the named aggregate type `aggregate`.
    fn field_id(&self, aggregate: &str, index: u32) -> Option<SymbolId>;

    /// Id of the formal argument at position `index` of `func`.
    fn arg_id(&self, func: &Function, index: usize) -> Option<SymbolId>;

    /// Id of the return slot of `func`.
    fn ret_id(&self, func: &Function) -> Option<SymbolId>;

    /// Id of the value returned at one particular call site.
    fn call_ret_id(&self, caller: &Function, site: CallSite) -> Option<SymbolId>;

    /// Id of the location a load or store accesses.
    fn mem_id(&self, target: &MemTarget) -> Option<SymbolId> {
        match target {
            MemTarget::Global(name) => self.global_id(name),
            MemTarget::Field { aggregate, index } => {
                if self.is_named_aggregate(Some(aggregate)) {
                    self.field_id(aggregate, *index)
                } else {
                    None
                }
            }
        }
    }

    /// Whether fields of this aggregate type can be given stable ids.
    ///
    /// Literal and anonymous struct types cannot.
    fn is_named_aggregate(&self, name: Option<&str>) -> bool {
        match name {
            None | Some("") | Some("struct.anon") => false,
            Some(name) => !name.starts_with("struct.anon."),
        }
    }
}

/// Dotted ids: `var.g`, `struct.point.0`, `arg.f.1`, `ret.f`, `call.f.bb2.3`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNaming;

impl SymbolNaming for DefaultNaming {
    fn global_id(&self, global: &str) -> Option<SymbolId> {
        Some(SymbolId::new(format!("var.{}", global)))
    }

    fn field_id(&self, aggregate: &str, index: u32) -> Option<SymbolId> {
        if !self.is_named_aggregate(Some(aggregate)) {
            return None;
        }
        Some(SymbolId::new(format!("{}.{}", aggregate, index)))
    }

    fn arg_id(&self, func: &Function, index: usize) -> Option<SymbolId> {
        Some(SymbolId::new(format!("arg.{}.{}", func.name, index)))
    }

    fn ret_id(&self, func: &Function) -> Option<SymbolId> {
        Some(SymbolId::new(format!("ret.{}", func.name)))
    }

    fn call_ret_id(&self, caller: &Function, site: CallSite) -> Option<SymbolId> {
        Some(SymbolId::new(format!(
            "call.{}.{}.{}",
            caller.name, site.block, site.index
        )))
    }
}

/// Possible targets of a call site. An empty list means "unknown": the call
/// contributes no facts.
pub trait CalleeResolver {
    fn callees(&self, site: CallSite) -> Vec<FuncId>;
}

/// Explicit call-site to callee mapping.
#[derive(Debug, Default, Clone)]
pub struct CallGraph {
    edges: HashMap<CallSite, Vec<FuncId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A call graph with every direct call of `program` resolved.
    ///
    /// Indirect calls stay unresolved until [`add`][Self::add]ed.
    pub fn from_program(program: &Program) -> Self {
        let mut graph = Self::new();
        for (fid, func) in program.functions() {
            for (b, block) in func.blocks.iter().enumerate() {
                for (i, inst) in block.insts.iter().enumerate() {
                    if let Op::Call {
                        callee: Callee::Direct(callee),
                        ..
                    } = &inst.op
                    {
                        graph.add(CallSite::new(fid, BlockId::new(b), i), *callee);
                    }
                }
            }
        }
        graph
    }

    pub fn add(&mut self, site: CallSite, callee: FuncId) {
        let targets = self.edges.entry(site).or_default();
        if !targets.contains(&callee) {
            targets.push(callee);
        }
    }
}

impl CalleeResolver for CallGraph {
    fn callees(&self, site: CallSite) -> Vec<FuncId> {
        self.edges.get(&site).cloned().unwrap_or_default()
    }
}

pub trait TaintOracle {
    fn is_taint_source(&self, id: &SymbolId) -> bool;
}

/// A fixed set of taint sources.
#[derive(Debug, Default, Clone)]
pub struct TaintSet {
    sources: HashSet<SymbolId>,
}

impl TaintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<SymbolId>) {
        self.sources.insert(id.into());
    }
}

impl<S: Into<SymbolId>> FromIterator<S> for TaintSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl TaintOracle for TaintSet {
    fn is_taint_source(&self, id: &SymbolId) -> bool {
        self.sources.contains(id)
    }
}
