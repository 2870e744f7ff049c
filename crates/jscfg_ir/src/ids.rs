use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index as u32)
            }

            /// Position of this entity in its owning arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A basic block owned by a builder or a finished graph.
    BlockId,
    "bb"
);
define_id!(
    /// An opaque instruction.
    StepId,
    "s"
);
define_id!(
    /// An SSA merge.
    PhiId,
    "phi"
);
define_id!(
    /// A deduplicated literal in the constant pool.
    ConstantId,
    "c"
);
define_id!(
    /// A syntax node visited by the tree walk.
    NodeId,
    "n"
);

/// A reference to a value producer. Blocks hold these in order, and steps use
/// them as operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    Step(StepId),
    Constant(ConstantId),
    Phi(PhiId),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Step(id) => write!(f, "{id}"),
            Value::Constant(id) => write!(f, "{id}"),
            Value::Phi(id) => write!(f, "{id}"),
        }
    }
}

/// The producer at position `index` of block `block`.
///
/// Phi arguments are expressed as locations: "the value this edge brings in
/// was produced at `index` in `block`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub block: BlockId,
    pub index: usize,
}

impl Location {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}
