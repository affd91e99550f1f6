//! Type-safe identifiers for program entities and analysis keys.
//!
//! Functions, blocks and SSA variables are addressed by dense indices into
//! their owning containers. The newtypes keep them apart at compile time, so a
//! block index can never be used where a variable is expected.
use std::borrow::Borrow;
use std::fmt;

/// Index of a function in a [`Program`][crate::ir::Program].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FuncId(usize);

impl FuncId {
    pub fn new(index: usize) -> Self {
        FuncId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Index of a basic block within its function (0-indexed, layout order).
///
/// # Invariants
///
/// - Block 0 is the entry block
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub const ENTRY: BlockId = BlockId(0);

    pub fn new(index: usize) -> Self {
        BlockId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Index of an SSA variable within its function.
///
/// Every variable is defined exactly once, either as a formal parameter or as
/// the result of one instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn new(index: usize) -> Self {
        VarId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Stable key of a storage location whose range persists across functions.
///
/// Symbolic ids name globals, fields of named aggregates, formal arguments,
/// and return slots of functions and call sites. They are opaque to the
/// analysis; only the [naming oracle][crate::oracle::SymbolNaming] gives them
/// meaning.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SymbolId(String);

impl SymbolId {
    pub fn new(id: impl Into<String>) -> Self {
        SymbolId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolId {
    fn from(id: &str) -> Self {
        SymbolId(id.to_string())
    }
}

impl From<String> for SymbolId {
    fn from(id: String) -> Self {
        SymbolId(id)
    }
}

impl Borrow<str> for SymbolId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Position of a call instruction: function, block and index within the block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CallSite {
    pub func: FuncId,
    pub block: BlockId,
    pub index: usize,
}

impl CallSite {
    pub fn new(func: FuncId, block: BlockId, index: usize) -> Self {
        Self { func, block, index }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.func, self.block, self.index)
    }
}

/// A control-flow edge `from -> to` within one function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
}

impl Edge {
    pub fn new(from: BlockId, to: BlockId) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Value types, as far as the range analysis cares about them.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Ty {
    /// Integer of the given bit width.
    Int(u32),
    /// Pointer to a value of the given type.
    Ptr(Box<Ty>),
    /// No value (functions returning nothing).
    Void,
    /// Anything else: floats, aggregates, vectors, labels.
    Other,
}

impl Ty {
    pub fn int(width: u32) -> Ty {
        assert!(width > 0, "Integer width must be positive");
        Ty::Int(width)
    }

    pub fn ptr(pointee: Ty) -> Ty {
        Ty::Ptr(Box::new(pointee))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Ty::Int(_))
    }

    pub fn int_width(&self) -> Option<u32> {
        match self {
            Ty::Int(w) => Some(*w),
            _ => None,
        }
    }

    /// Width of an integer, or of the integer a pointer points to.
    pub fn range_width(&self) -> Option<u32> {
        match self {
            Ty::Int(w) => Some(*w),
            Ty::Ptr(pointee) => pointee.int_width(),
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int(w) => write!(f, "i{}", w),
            Ty::Ptr(pointee) => write!(f, "{}*", pointee),
            Ty::Void => write!(f, "void"),
            Ty::Other => write!(f, "opaque"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BlockId::new(3).to_string(), "bb3");
        assert_eq!(VarId::new(7).to_string(), "%7");
        assert_eq!(SymbolId::from("var.g").to_string(), "var.g");
        assert_eq!(Ty::ptr(Ty::int(32)).to_string(), "i32*");
        assert_eq!(Edge::new(BlockId::new(2), BlockId::ENTRY).to_string(), "bb2 -> bb0");
    }

    #[test]
    fn test_range_width() {
        assert_eq!(Ty::int(8).range_width(), Some(8));
        assert_eq!(Ty::ptr(Ty::int(16)).range_width(), Some(16));
        assert_eq!(Ty::ptr(Ty::ptr(Ty::int(16))).range_width(), None);
        assert_eq!(Ty::Other.range_width(), None);
        assert_eq!(Ty::ptr(Ty::int(16)).int_width(), None);
    }

    #[test]
    fn test_symbol_lookup_by_str() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(SymbolId::from("arg.f.0"), 1);
        assert_eq!(map.get("arg.f.0"), Some(&1));
    }
}
