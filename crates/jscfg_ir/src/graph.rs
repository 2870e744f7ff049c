use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::block::{Block, Completion};
use crate::constant::ConstantPool;
use crate::error::{InvariantViolation, Result};
use crate::ids::{BlockId, Location, NodeId, PhiId, StepId, Value};
use crate::value::{Phi, Step};

/// One control edge, labelled with the completion that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub completion: Completion,
}

/// The finished graph of one unit, produced by [`CfgBuilder::finish`].
///
/// [`CfgBuilder::finish`]: crate::CfgBuilder::finish
#[derive(Debug)]
pub struct Cfg {
    pub(crate) blocks: Vec<Block>,
    pub(crate) steps: Vec<Step>,
    pub(crate) phis: Vec<Phi>,
    pub(crate) constants: ConstantPool,
    pub(crate) root: BlockId,
    pub(crate) exit: BlockId,
    pub(crate) edges: Vec<Edge>,
    pub(crate) labels: HashMap<NodeId, String>,
    pub(crate) unhandled: BTreeSet<NodeId>,
    pub(crate) unreachable: BTreeMap<BlockId, BlockId>,
}

impl Cfg {
    pub fn root(&self) -> BlockId {
        self.root
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (BlockId::new(index), block))
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub fn phi(&self, id: PhiId) -> &Phi {
        &self.phis[id.index()]
    }

    pub fn phis(&self) -> impl Iterator<Item = (PhiId, &Phi)> {
        self.phis
            .iter()
            .enumerate()
            .map(|(index, phi)| (PhiId::new(index), phi))
    }

    pub fn value_at(&self, location: Location) -> Option<Value> {
        self.blocks
            .get(location.block.index())?
            .steps()
            .get(location.index)
            .copied()
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn unhandled(&self) -> &BTreeSet<NodeId> {
        &self.unhandled
    }

    pub fn unreachable(&self) -> &BTreeMap<BlockId, BlockId> {
        &self.unreachable
    }

    /// The label text recorded for `node`, whether or not it is still bound.
    pub fn label_of(&self, node: NodeId) -> Option<&str> {
        self.labels.get(&node).map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Successors of `block` in edge order; empty for the exit block.
    ///
    /// # Errors
    ///
    /// Fails with `UnexpectedExit` if any other block has no completion.
    pub fn successors(&self, block: BlockId) -> Result<Vec<BlockId>> {
        if block == self.exit {
            return Ok(Vec::new());
        }
        match self.block(block).completion() {
            Some(completion) => Ok(completion.successors().collect()),
            None => Err(InvariantViolation::UnexpectedExit(block).into()),
        }
    }

    /// Blocks reachable from the root, depth-first preorder, consequent
    /// before alternate.
    pub fn traverse(&self) -> Result<Vec<BlockId>> {
        let mut visited = HashSet::new();
        self.traverse_from(self.root, &mut visited)
    }

    /// Preorder walk from `start` that skips anything already in `visited`.
    pub fn traverse_from(
        &self,
        start: BlockId,
        visited: &mut HashSet<BlockId>,
    ) -> Result<Vec<BlockId>> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(block) = stack.pop() {
            if !visited.insert(block) {
                continue;
            }
            order.push(block);
            // Reverse so the first successor is popped first.
            stack.extend(self.successors(block)?.into_iter().rev());
        }
        Ok(order)
    }

    /// Each recorded unreachable region as `(completed, blocks)`, walked after
    /// the reachable part so blocks shared with it are not repeated.
    pub fn traverse_unreachable(&self) -> Result<Vec<(BlockId, Vec<BlockId>)>> {
        let mut visited = HashSet::new();
        self.traverse_from(self.root, &mut visited)?;
        let mut regions = Vec::with_capacity(self.unreachable.len());
        for (&completed, &start) in &self.unreachable {
            regions.push((completed, self.traverse_from(start, &mut visited)?));
        }
        Ok(regions)
    }

    /// Incoming control edges of `block` in the order they were sealed.
    ///
    /// Only edges out of blocks reachable from the root count; dead code and
    /// its `Marker` edges never feed a phi.
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        let live = self.reachable();
        self.edges
            .iter()
            .filter(|edge| edge.to == block && !edge.completion.is_marker())
            .filter(|edge| live.contains(&edge.from))
            .map(|edge| edge.from)
            .collect()
    }

    /// Blocks reachable from the root. Unlike [`Self::traverse`] this never
    /// fails; open blocks simply end the walk.
    fn reachable(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(block) = stack.pop() {
            if !seen.insert(block) {
                continue;
            }
            if let Some(completion) = self.block(block).completion() {
                stack.extend(completion.successors());
            }
        }
        seen
    }
}
