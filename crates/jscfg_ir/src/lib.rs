//! Control-flow-graph IR in SSA style.
//!
//! A [`CfgBuilder`] is driven by an external tree walk. The walk appends
//! producers ([`Step`]s, [`Constant`]s and [`Phi`]s) to the current
//! [`Block`], seals blocks with a [`Completion`] that names their successors,
//! and registers label/loop scopes so `break` and `continue` can be resolved.
//! [`CfgBuilder::finish`] hands back the immutable [`Cfg`].

pub mod block;
pub mod builder;
pub mod constant;
pub mod dot;
pub mod error;
pub mod graph;
pub mod ids;
pub mod scope;
pub mod tree;
pub mod value;

pub use block::{Block, Completion};
pub use builder::CfgBuilder;
pub use constant::{Constant, ConstantPool, ConstantValue, Literal};
pub use error::{CfgError, InvariantViolation, LabelConflict, Result};
pub use graph::{Cfg, Edge};
pub use ids::{BlockId, ConstantId, Location, NodeId, PhiId, StepId, Value};
pub use scope::JumpTargets;
pub use tree::{NodePath, NodeTree, SyntaxNode};
pub use value::{Phi, Step};
