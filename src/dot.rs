//! Control-flow graph to DOT (Graphviz) conversion.
//!
//! Each block becomes a node and each successor edge an arrow. Branch edges
//! are labeled `T`/`F`, switch edges with their case value (or `default`).
//! Back-edges, whose facts are not propagated by the analysis, are drawn
//! dashed.
//!
//! # Examples
//!
//! ```
//! use range_rs::builder::FunctionBuilder;
//! use range_rs::types::Ty;
//!
//! let mut b = FunctionBuilder::new("spin", &[], Ty::Void);
//! let entry = b.block();
//! b.switch_to(entry);
//! b.br(entry);
//! let f = b.finish();
//!
//! let dot = f.to_dot().unwrap();
//! assert!(dot.contains("bb0 -> bb0 [style=dashed]"));
//! // Render with: dot -Tpng cfg.dot -o cfg.png
//! ```

use std::fmt::Write as _;

use crate::cfg;
use crate::ir::{Function, Terminator};
use crate::types::{BlockId, Edge};

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for blocks (default: "box")
    pub block_shape: &'static str,
    /// Shape for the entry block (default: "doubleoctagon")
    pub entry_shape: &'static str,
    /// Style for forward edges (default: "solid")
    pub edge_style: &'static str,
    /// Style for back-edges (default: "dashed")
    pub back_edge_style: &'static str,
    /// Whether to list instructions inside block nodes (default: true)
    pub show_instructions: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            block_shape: "box",
            entry_shape: "doubleoctagon",
            edge_style: "solid",
            back_edge_style: "dashed",
            show_instructions: true,
        }
    }
}

impl Function {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let back_edges = cfg::back_edges(self);

        let mut dot = String::new();
        writeln!(dot, "digraph \"{}\" {{", escape(&self.name))?;
        writeln!(dot, "node [shape={}, fontname=monospace];", config.block_shape)?;

        for (id, block) in self.block_ids().zip(&self.blocks) {
            let mut label = format!("{}:\\l", id);
            if config.show_instructions {
                for inst in &block.insts {
                    write!(label, "  {}\\l", escape(&self.render_inst(inst)))?;
                }
                write!(label, "  {}\\l", escape(&self.render_terminator(&block.term)))?;
            }
            write!(dot, "{} [label=\"{}\"", id, label)?;
            if id == BlockId::ENTRY {
                write!(dot, ", shape={}", config.entry_shape)?;
            }
            writeln!(dot, "];")?;
        }

        for (id, block) in self.block_ids().zip(&self.blocks) {
            for (succ, label) in edge_labels(&block.term) {
                let style = if back_edges.contains(&Edge::new(id, succ)) {
                    config.back_edge_style
                } else {
                    config.edge_style
                };
                write!(dot, "{} -> {} [style={}", id, succ, style)?;
                if let Some(label) = label {
                    write!(dot, ", label=\"{}\"", label)?;
                }
                writeln!(dot, "];")?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn edge_labels(term: &Terminator) -> Vec<(BlockId, Option<String>)> {
    match term {
        Terminator::Br(target) => vec![(*target, None)],
        Terminator::CondBr { then_bb, else_bb, .. } => {
            vec![(*then_bb, Some("T".to_string())), (*else_bb, Some("F".to_string()))]
        }
        Terminator::Switch { default, cases, .. } => {
            let mut edges = vec![(*default, Some("default".to_string()))];
            edges.extend(cases.iter().map(|(value, bb)| (*bb, Some(value.to_string()))));
            edges
        }
        Terminator::Ret(_) | Terminator::Unreachable => vec![],
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::ir::{BinOp, Value};
    use crate::predicate::Predicate;
    use crate::types::Ty;

    #[test]
    fn test_loop_to_dot() {
        let mut b = FunctionBuilder::new("count", &[], Ty::Void);
        let entry = b.block();
        let header = b.block();
        let body = b.block();
        let exit = b.block();
        b.switch_to(entry);
        b.br(header);
        b.switch_to(header);
        let i = b.phi(Ty::int(8));
        let c = b.icmp(Predicate::Ult, i.clone(), Value::int(8, 3));
        b.cond_br(c, body, exit);
        b.switch_to(body);
        let next = b.binary(BinOp::Add, i.clone(), Value::int(8, 1));
        b.br(header);
        b.switch_to(exit);
        b.ret(None);
        b.add_incoming(&i, entry, Value::int(8, 0));
        b.add_incoming(&i, body, next);
        let f = b.finish();

        let dot = f.to_dot().unwrap();
        assert!(dot.starts_with("digraph \"count\" {\n"));
        assert!(dot.contains("bb0 [label=\"bb0:\\l  br bb1\\l\", shape=doubleoctagon];"));
        assert!(dot.contains("bb0 -> bb1 [style=solid];"));
        assert!(dot.contains("bb1 -> bb2 [style=solid, label=\"T\"];"));
        assert!(dot.contains("bb1 -> bb3 [style=solid, label=\"F\"];"));
        assert!(dot.contains("bb2 -> bb1 [style=dashed];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_switch_labels_without_instructions() {
        let mut b = FunctionBuilder::new("f", &[Ty::int(8)], Ty::Void);
        let entry = b.block();
        let one = b.block();
        let other = b.block();
        b.switch_to(entry);
        b.switch(b.param(0), other, &[(1, one)]);
        b.switch_to(one);
        b.ret(None);
        b.switch_to(other);
        b.ret(None);
        let f = b.finish();

        let config = DotConfig {
            show_instructions: false,
            ..DotConfig::default()
        };
        let dot = f.to_dot_with_config(&config).unwrap();
        assert!(dot.contains("bb1 [label=\"bb1:\\l\"];"));
        assert!(dot.contains("bb0 -> bb2 [style=solid, label=\"default\"];"));
        assert!(dot.contains("bb0 -> bb1 [style=solid, label=\"1\"];"));
    }
}
