use crate::ids::{BlockId, Location, Value};

/// An opaque instruction: a name and its ordered operands.
///
/// Steps never change after creation; other producers refer to them by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    name: String,
    args: Vec<Value>,
}

impl Step {
    pub(crate) fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// An SSA merge living in `block`.
///
/// There is one argument per control-flow edge into `block`, in the order the
/// edges were added. Each argument locates the producer that supplies the
/// value along that edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Phi {
    block: BlockId,
    args: Vec<Location>,
}

impl Phi {
    pub(crate) fn new(block: BlockId, args: Vec<Location>) -> Self {
        Self { block, args }
    }

    /// The block hosting this phi.
    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn args(&self) -> &[Location] {
        &self.args
    }

    pub(crate) fn push_arg(&mut self, arg: Location) {
        self.args.push(arg);
    }
}
