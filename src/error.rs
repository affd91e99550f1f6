//! Errors raised by the range analysis.
//!
//! Only structural problems are errors. Width mismatches between ranges are
//! normalized and logged, and missing ids or callees simply contribute no fact.

use std::fmt;

use crate::types::{BlockId, FuncId, VarId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A range was requested for a value that is neither an integer nor a
    /// pointer to one.
    NotInteger { function: String, value: String },
    /// An operation whose operands make its transfer rule inapplicable.
    Unmodeled { function: String, inst: String },
    /// A reference to a block that does not exist.
    InvalidBlock { function: String, block: BlockId },
    /// A reference to a variable that does not exist.
    InvalidVar { function: String, var: VarId },
    /// A call resolved to a function that does not exist.
    InvalidCallee { function: String, callee: FuncId },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::NotInteger { function, value } => {
                write!(f, "{}(): value {} is not an integer", function, value)
            }
            RangeError::Unmodeled { function, inst } => {
                write!(f, "{}(): no transfer rule for `{}`", function, inst)
            }
            RangeError::InvalidBlock { function, block } => {
                write!(f, "{}(): invalid block {}", function, block)
            }
            RangeError::InvalidVar { function, var } => {
                write!(f, "{}(): invalid variable {}", function, var)
            }
            RangeError::InvalidCallee { function, callee } => {
                write!(f, "{}(): invalid callee {}", function, callee)
            }
        }
    }
}

impl std::error::Error for RangeError {}

pub type Result<T> = std::result::Result<T, RangeError>;
