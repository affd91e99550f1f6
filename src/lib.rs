//! # range-rs: interprocedural integer range analysis
//!
//! **`range-rs`** computes, for every integer storage location of a program
//! (globals, struct fields, parameters, return values), a range of values that
//! over-approximates everything the program may store there.
//!
//! ## The domain
//!
//! Ranges are [`IntRange`][crate::range::IntRange]s: half-open intervals
//! `[lower, upper)` over fixed-width machine integers that may wrap around the
//! maximum value, with the same semantics as LLVM's `ConstantRange`. Every
//! arithmetic, bitwise and comparison operator is a sound over-approximation
//! of its concrete counterpart.
//!
//! ## The analysis
//!
//! [`RangePass`][crate::pass::RangePass] runs a chaotic iteration over the
//! whole [`Program`][crate::ir::Program]. Inside a function, facts flow along
//! forward edges and are narrowed by branch and switch conditions. Between
//! functions, facts flow through a shared [`RangeTable`][crate::table::RangeTable]
//! keyed by [`SymbolId`][crate::types::SymbolId]s. Ids that keep changing
//! after a configurable number of rounds are widened to the full range, so
//! the analysis always terminates.
//!
//! ## Basic Usage
//!
//! ```rust
//! use range_rs::builder::FunctionBuilder;
//! use range_rs::ir::{Callee, Program, Value};
//! use range_rs::pass::RangePass;
//! use range_rs::predicate::Predicate;
//! use range_rs::range::IntRange;
//! use range_rs::types::Ty;
//!
//! let mut program = Program::new();
//!
//! // void clamp(i8 x) { if (x < 10) small = x; else big = x; }
//! let clamp = program.declare("clamp", &[Ty::int(8)], Ty::Void);
//! let mut b = FunctionBuilder::new("clamp", &[Ty::int(8)], Ty::Void);
//! let (entry, then_bb, else_bb) = (b.block(), b.block(), b.block());
//! b.switch_to(entry);
//! let x = b.param(0);
//! let c = b.icmp(Predicate::Ult, x.clone(), Value::int(8, 10));
//! b.cond_br(c, then_bb, else_bb);
//! b.switch_to(then_bb);
//! b.store_global(x.clone(), "small");
//! b.ret(None);
//! b.switch_to(else_bb);
//! b.store_global(x, "big");
//! b.ret(None);
//! program.define(clamp, b.finish());
//!
//! // void main() { clamp(3); clamp(42); }
//! let mut b = FunctionBuilder::new("main", &[], Ty::Void);
//! let entry = b.block();
//! b.switch_to(entry);
//! b.call_void(Callee::Direct(clamp), vec![Value::int(8, 3)]);
//! b.call_void(Callee::Direct(clamp), vec![Value::int(8, 42)]);
//! b.ret(None);
//! program.add_function(b.finish());
//!
//! let mut pass = RangePass::new(&program);
//! pass.run()?;
//! assert_eq!(pass.table().get("arg.clamp.0"), Some(&IntRange::inclusive(8, 3, 42)));
//! assert_eq!(pass.table().get("var.small"), Some(&IntRange::inclusive(8, 3, 9)));
//! assert_eq!(pass.table().get("var.big"), Some(&IntRange::inclusive(8, 10, 42)));
//! # Ok::<(), range_rs::error::RangeError>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`range`]**: the interval domain.
//! - **[`pass`]**: the fixpoint driver; transfer functions live in `transfer`,
//!   edge refinement in `refine`.
//! - **[`oracle`]**: how locations are named, calls resolved, and taint
//!   sources marked.
//! - **[`cmp`]**: a checker reporting comparisons whose outcome is fixed.
//! - **[`dot`]**: Graphviz rendering of control-flow graphs.

pub mod apint;
pub mod builder;
pub mod cfg;
pub mod cmp;
pub mod config;
pub mod display;
pub mod dot;
pub mod error;
pub mod facts;
pub mod ir;
pub mod oracle;
pub mod pass;
pub mod predicate;
pub mod range;
mod refine;
pub mod table;
mod transfer;
pub mod types;
