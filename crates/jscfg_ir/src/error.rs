use thiserror::Error;

use crate::ids::{BlockId, Location, NodeId, PhiId};

pub type Result<T> = std::result::Result<T, CfgError>;

// ---------------------------------------------------------------------------
// Construction errors
// ---------------------------------------------------------------------------

/// A structural error raised while building a graph.
///
/// Any of these aborts construction of the current unit. Source constructs the
/// builder cannot translate are not errors; they are collected with
/// [`CfgBuilder::set_unhandled`](crate::CfgBuilder::set_unhandled).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CfgError {
    /// A non-primitive value was offered to the constant pool.
    #[error("value {value} of type `{ty}` is not a primitive")]
    InvalidConstant { ty: String, value: String },
    /// A label name or a labeled node is already bound.
    #[error(transparent)]
    LabelConflict(#[from] LabelConflict),
    /// The construction sequence broke a block/graph invariant.
    #[error("construction invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelConflict {
    #[error("label `{name}` is already bound")]
    Name { name: String },
    #[error("node {node} already carries label `{existing}`")]
    Node { node: NodeId, existing: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("block {0} is already sealed")]
    AlreadySealed(BlockId),
    #[error("cannot append to sealed block {0}")]
    AppendToSealed(BlockId),
    #[error("the exit block cannot be sealed")]
    SealExit,
    #[error("branch out of block {0} requires its test to be the last step")]
    BranchTestNotLast(BlockId),
    #[error("unknown phi {0}")]
    UnknownPhi(PhiId),
    #[error("no producer at {0}")]
    UnknownLocation(Location),
    #[error("unexpected exit from graph at block {0}")]
    UnexpectedExit(BlockId),
}

impl CfgError {
    /// Returns `true` for errors that point at a broken construction sequence.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, CfgError::Invariant(_))
    }
}
