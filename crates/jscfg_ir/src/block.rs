use crate::ids::{BlockId, Value};

// ---------------------------------------------------------------------------
// Completions
// ---------------------------------------------------------------------------

/// How control leaves a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Falls through to `join`.
    Normal { join: BlockId },
    /// Two-way exit on the block's last step.
    Branch {
        consequent: BlockId,
        alternate: BlockId,
    },
    /// Unwinds to the target of a `break`.
    Break { join: BlockId },
    /// Unwinds to the target of a `continue`.
    Continue { join: BlockId },
    /// Structural edge with no branch semantics. Not a predecessor edge for
    /// phi purposes.
    Marker { next: BlockId },
}

impl Completion {
    /// Successor blocks in edge order (consequent before alternate).
    pub fn successors(&self) -> impl Iterator<Item = BlockId> + use<> {
        let (first, second) = match *self {
            Completion::Normal { join }
            | Completion::Break { join }
            | Completion::Continue { join } => (join, None),
            Completion::Branch {
                consequent,
                alternate,
            } => (consequent, Some(alternate)),
            Completion::Marker { next } => (next, None),
        };
        std::iter::once(first).chain(second)
    }

    /// Short label used in logs and rendered edges.
    pub fn kind(&self) -> &'static str {
        match self {
            Completion::Normal { .. } => "normal",
            Completion::Branch { .. } => "branch",
            Completion::Break { .. } => "break",
            Completion::Continue { .. } => "continue",
            Completion::Marker { .. } => "mark",
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Completion::Marker { .. })
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A basic block: an ordered run of producers and at most one completion.
///
/// A block without a completion is either still being appended to or is the
/// graph's exit block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    name: String,
    steps: Vec<Value>,
    completion: Option<Completion>,
}

impl Block {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            completion: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Value] {
        &self.steps
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn is_sealed(&self) -> bool {
        self.completion.is_some()
    }

    /// Appends a producer, returning its index.
    pub(crate) fn push(&mut self, value: Value) -> usize {
        self.steps.push(value);
        self.steps.len() - 1
    }

    pub(crate) fn set_completion(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }
}
