use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, trace};

use crate::block::{Block, Completion};
use crate::constant::{ConstantPool, Literal};
use crate::error::{InvariantViolation, Result};
use crate::graph::{Cfg, Edge};
use crate::ids::{BlockId, ConstantId, Location, NodeId, PhiId, StepId, Value};
use crate::scope::{JumpTargets, ScopeRegistry};
use crate::tree::NodePath;
use crate::value::{Phi, Step};

/// Incrementally builds one control-flow graph while a tree walk visits a
/// single source unit.
///
/// The builder starts with two blocks: `root`, which is current, and `exit`,
/// which is never sealed. Every other block must end up sealed with exactly
/// one [`Completion`].
///
/// ```ignore
/// let mut builder = CfgBuilder::new();
/// let test = builder.push_step("test", vec![])?;
/// let then_bb = builder.new_block("then");
/// let merge_bb = builder.new_block("merge");
/// builder.branch(test, then_bb, merge_bb)?;
/// ```
#[derive(Debug)]
pub struct CfgBuilder {
    blocks: Vec<Block>,
    steps: Vec<Step>,
    phis: Vec<Phi>,
    constants: ConstantPool,
    root: BlockId,
    exit: BlockId,
    current: BlockId,
    /// Control edges in the order blocks were sealed.
    edges: Vec<Edge>,
    scopes: ScopeRegistry,
    handled: HashSet<NodeId>,
    unhandled: BTreeSet<NodeId>,
    unreachable: BTreeMap<BlockId, BlockId>,
}

impl Default for CfgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::with_names("entry", "exit")
    }

    /// Create a builder whose root and exit blocks carry the given names.
    pub fn with_names(root: &str, exit: &str) -> Self {
        let blocks = vec![Block::new(root), Block::new(exit)];
        Self {
            blocks,
            steps: Vec::new(),
            phis: Vec::new(),
            constants: ConstantPool::new(),
            root: BlockId::new(0),
            exit: BlockId::new(1),
            current: BlockId::new(0),
            edges: Vec::new(),
            scopes: ScopeRegistry::default(),
            handled: HashSet::new(),
            unhandled: BTreeSet::new(),
            unreachable: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> BlockId {
        self.root
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    // -----------------------------------------------------------------------
    // Blocks
    // -----------------------------------------------------------------------

    pub fn new_block(&mut self, name: &str) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(Block::new(name));
        debug!(%id, name, "new block");
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    /// Make `block` the block that steps are appended to.
    pub fn switch_to(&mut self, block: BlockId) {
        trace!(from = %self.current, to = %block, "switch block");
        self.current = block;
    }

    pub fn is_sealed(&self, block: BlockId) -> bool {
        self.blocks[block.index()].is_sealed()
    }

    /// Attach `completion` to `block`.
    ///
    /// # Errors
    ///
    /// Fails if `block` is the exit block or already sealed, or if a `Branch`
    /// is requested for a block without a test step.
    pub fn seal(&mut self, block: BlockId, completion: Completion) -> Result<()> {
        if block == self.exit {
            return Err(InvariantViolation::SealExit.into());
        }
        let target = &mut self.blocks[block.index()];
        if target.is_sealed() {
            return Err(InvariantViolation::AlreadySealed(block).into());
        }
        if matches!(completion, Completion::Branch { .. }) && target.steps().is_empty() {
            return Err(InvariantViolation::BranchTestNotLast(block).into());
        }

        debug!(%block, kind = completion.kind(), "seal block");
        target.set_completion(completion);
        self.edges.extend(completion.successors().map(|to| Edge {
            from: block,
            to,
            completion,
        }));
        Ok(())
    }

    pub fn seal_current(&mut self, completion: Completion) -> Result<()> {
        self.seal(self.current, completion)
    }

    /// Seal the current block with a two-way exit on `test`, which must be the
    /// most recently appended producer of the current block.
    pub fn branch(
        &mut self,
        test: Location,
        consequent: BlockId,
        alternate: BlockId,
    ) -> Result<()> {
        let current = self.current;
        if !self.is_last_in_current(test) {
            return Err(InvariantViolation::BranchTestNotLast(current).into());
        }
        self.seal(
            current,
            Completion::Branch {
                consequent,
                alternate,
            },
        )
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    fn append(&mut self, block: BlockId, value: Value) -> Result<Location> {
        let target = &mut self.blocks[block.index()];
        if target.is_sealed() {
            return Err(InvariantViolation::AppendToSealed(block).into());
        }
        let index = target.push(value);
        trace!(%block, index, %value, "append");
        Ok(Location::new(block, index))
    }

    /// Append a new step to the current block.
    pub fn push_step(&mut self, name: &str, args: Vec<Value>) -> Result<Location> {
        let block = self.current;
        if self.is_sealed(block) {
            return Err(InvariantViolation::AppendToSealed(block).into());
        }
        let id = StepId::new(self.steps.len());
        self.steps.push(Step::new(name, args));
        self.append(block, Value::Step(id))
    }

    /// Intern a constant and append a reference to it to the current block.
    pub fn push_constant(&mut self, ty: &str, literal: Literal) -> Result<Location> {
        let block = self.current;
        if self.is_sealed(block) {
            return Err(InvariantViolation::AppendToSealed(block).into());
        }
        let id = self.get_constant(ty, literal)?;
        self.append(block, Value::Constant(id))
    }

    /// Append a phi with its initial arguments to `block`.
    pub fn push_phi(&mut self, block: BlockId, args: Vec<Location>) -> Result<Location> {
        if self.is_sealed(block) {
            return Err(InvariantViolation::AppendToSealed(block).into());
        }
        let id = PhiId::new(self.phis.len());
        self.phis.push(Phi::new(block, args));
        self.append(block, Value::Phi(id))
    }

    /// Append the argument for a newly discovered incoming edge.
    ///
    /// Loop headers are sealed before their back edges are known, so this is
    /// allowed on a phi whose block is already sealed.
    pub fn add_phi_arg(&mut self, phi: PhiId, arg: Location) -> Result<()> {
        let target = self
            .phis
            .get_mut(phi.index())
            .ok_or(InvariantViolation::UnknownPhi(phi))?;
        trace!(%phi, %arg, "phi arg");
        target.push_arg(arg);
        Ok(())
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub fn phi(&self, id: PhiId) -> &Phi {
        &self.phis[id.index()]
    }

    /// The producer found at `location`, if any.
    pub fn value_at(&self, location: Location) -> Option<Value> {
        self.blocks
            .get(location.block.index())?
            .steps()
            .get(location.index)
            .copied()
    }

    /// Like [`Self::value_at`], for locations the caller obtained from this
    /// builder.
    pub fn operand(&self, location: Location) -> Result<Value> {
        self.value_at(location)
            .ok_or_else(|| InvariantViolation::UnknownLocation(location).into())
    }

    /// Whether `location` is the most recent producer of the current block.
    pub fn is_last_in_current(&self, location: Location) -> bool {
        let len = self.blocks[self.current.index()].steps().len();
        location.block == self.current && len.checked_sub(1) == Some(location.index)
    }

    // -----------------------------------------------------------------------
    // Constants
    // -----------------------------------------------------------------------

    /// Return the canonical constant for `(ty, literal)`.
    pub fn get_constant(&mut self, ty: &str, literal: Literal) -> Result<ConstantId> {
        self.constants.get_or_insert(ty, literal)
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    // -----------------------------------------------------------------------
    // Labels and loops
    // -----------------------------------------------------------------------

    /// Bind `name` to `targets` for the statement at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`LabelConflict`](crate::LabelConflict) if `name` is already
    /// bound, or if the node already carries an active label.
    pub fn set_label(
        &mut self,
        name: &str,
        path: NodePath<'_>,
        targets: JumpTargets,
    ) -> Result<()> {
        self.scopes.set_label(name, path.node(), targets)
    }

    /// The label text attached to a node. Survives [`Self::dispose_label`].
    pub fn get_label(&self, path: NodePath<'_>) -> Option<&str> {
        self.scopes.get_label(path.node())
    }

    pub fn get_label_completion(&self, name: &str) -> Option<JumpTargets> {
        self.scopes.get_label_completion(name)
    }

    /// Free the label name bound at `path`; the node -> name record is kept.
    pub fn dispose_label(&mut self, path: NodePath<'_>) {
        self.scopes.dispose_label(path.node());
    }

    pub fn set_loop(&mut self, path: NodePath<'_>, targets: JumpTargets) {
        self.scopes.set_loop(path.node(), targets);
    }

    /// Targets of the nearest enclosing loop, walking up from `path` itself.
    pub fn get_parent_loop_completion(&self, path: NodePath<'_>) -> Option<JumpTargets> {
        self.scopes.get_parent_loop_completion(path)
    }

    pub fn dispose_loop(&mut self, path: NodePath<'_>) {
        self.scopes.dispose_loop(path.node());
    }

    /// Release every binding `path` may hold. Called when the walk leaves a node.
    pub fn dispose_path(&mut self, path: NodePath<'_>) {
        self.dispose_loop(path);
        self.dispose_label(path);
    }

    // -----------------------------------------------------------------------
    // Diagnostics
    // -----------------------------------------------------------------------

    pub fn set_handled(&mut self, path: NodePath<'_>) {
        let node = path.node();
        self.handled.insert(node);
        self.unhandled.remove(&node);
    }

    pub fn set_unhandled(&mut self, path: NodePath<'_>) {
        let node = path.node();
        if !self.handled.contains(&node) {
            debug!(%node, kind = path.syntax().kind, "unhandled node");
            self.unhandled.insert(node);
        }
    }

    pub fn unhandled(&self) -> &BTreeSet<NodeId> {
        &self.unhandled
    }

    /// Record that `unreachable` was built after `completed` closed off every
    /// path into it.
    pub fn add_unreachable(&mut self, completed: BlockId, unreachable: BlockId) {
        debug!(%completed, %unreachable, "unreachable region");
        self.unreachable.insert(completed, unreachable);
    }

    pub fn unreachable(&self) -> &BTreeMap<BlockId, BlockId> {
        &self.unreachable
    }

    /// Freeze the builder into a [`Cfg`].
    pub fn finish(self) -> Cfg {
        Cfg {
            blocks: self.blocks,
            steps: self.steps,
            phis: self.phis,
            constants: self.constants,
            root: self.root,
            exit: self.exit,
            edges: self.edges,
            labels: self.scopes.labels().clone(),
            unhandled: self.unhandled,
            unreachable: self.unreachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CfgError, LabelConflict};
    use crate::tree::NodeTree;

    #[test]
    fn test_new_builder_starts_at_root() {
        let builder = CfgBuilder::new();
        assert_eq!(builder.current_block(), builder.root());
        assert_ne!(builder.root(), builder.exit());
        assert_eq!(builder.block(builder.root()).name(), "entry");
        assert_eq!(builder.block(builder.exit()).name(), "exit");
    }

    #[test]
    fn test_sealed_block_rejects_steps_and_second_seal() {
        let mut builder = CfgBuilder::new();
        let exit = builder.exit();
        builder.push_step("call", vec![]).unwrap();
        builder.seal_current(Completion::Normal { join: exit }).unwrap();

        let err = builder.push_step("call", vec![]).unwrap_err();
        assert_eq!(
            err,
            CfgError::Invariant(InvariantViolation::AppendToSealed(builder.root()))
        );
        assert!(builder.push_constant("number", Literal::Number(1.0)).is_err());

        let err = builder
            .seal_current(Completion::Normal { join: exit })
            .unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(
            builder.block(builder.root()).completion(),
            Some(&Completion::Normal { join: exit })
        );
    }

    #[test]
    fn test_exit_is_never_sealed() {
        let mut builder = CfgBuilder::new();
        let exit = builder.exit();
        let root = builder.root();
        let err = builder.seal(exit, Completion::Normal { join: root }).unwrap_err();
        assert_eq!(err, CfgError::Invariant(InvariantViolation::SealExit));
    }

    #[test]
    fn test_branch_requires_test_as_last_step() {
        let mut builder = CfgBuilder::new();
        let then_bb = builder.new_block("then");
        let else_bb = builder.new_block("else");

        let test = builder.push_step("x", vec![]).unwrap();
        builder.push_step("y", vec![]).unwrap();
        let err = builder.branch(test, then_bb, else_bb).unwrap_err();
        assert_eq!(
            err,
            CfgError::Invariant(InvariantViolation::BranchTestNotLast(builder.root()))
        );

        let test = builder.push_step("z", vec![]).unwrap();
        builder.branch(test, then_bb, else_bb).unwrap();
        assert_eq!(
            builder.block(builder.root()).completion(),
            Some(&Completion::Branch {
                consequent: then_bb,
                alternate: else_bb
            })
        );
    }

    #[test]
    fn test_branch_on_empty_block_fails() {
        let mut builder = CfgBuilder::new();
        let a = builder.new_block("a");
        let b = builder.new_block("b");
        let err = builder
            .seal_current(Completion::Branch {
                consequent: a,
                alternate: b,
            })
            .unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_step_operands_reference_producers() {
        let mut builder = CfgBuilder::new();
        let one = builder.push_constant("number", Literal::Number(1.0)).unwrap();
        let one_value = builder.value_at(one).unwrap();
        let sum = builder.push_step("+", vec![one_value, one_value]).unwrap();

        let Some(Value::Step(id)) = builder.value_at(sum) else {
            panic!("expected a step");
        };
        assert_eq!(builder.step(id).name(), "+");
        assert_eq!(builder.step(id).args(), &[one_value, one_value]);
        assert_eq!(builder.block(builder.root()).steps().len(), 2);
        assert_eq!(builder.constants().len(), 1);
    }

    #[test]
    fn test_phi_args_can_grow_after_seal() {
        let mut builder = CfgBuilder::new();
        let header = builder.new_block("while_cond");
        let init = builder.push_constant("number", Literal::Number(0.0)).unwrap();
        builder.seal_current(Completion::Normal { join: header }).unwrap();

        builder.switch_to(header);
        let phi = builder.push_phi(header, vec![init]).unwrap();
        let test = builder.push_step("<", vec![]).unwrap();
        let exit = builder.exit();
        builder.branch(test, header, exit).unwrap();

        let Some(Value::Phi(id)) = builder.value_at(phi) else {
            panic!("expected a phi");
        };
        builder.add_phi_arg(id, test).unwrap();
        assert_eq!(builder.phi(id).args(), &[init, test]);
        assert_eq!(builder.phi(id).block(), header);

        let bogus = PhiId::new(99);
        assert_eq!(
            builder.add_phi_arg(bogus, test).unwrap_err(),
            CfgError::Invariant(InvariantViolation::UnknownPhi(bogus))
        );
    }

    #[test]
    fn test_label_name_conflict_and_reuse_after_dispose() {
        let mut tree = NodeTree::new();
        let first = tree.push(None, "LabeledStatement", 0, 10);
        let second = tree.push(None, "LabeledStatement", 11, 20);

        let mut builder = CfgBuilder::new();
        let end = builder.new_block("label_end");
        let targets = JumpTargets::for_statement(end);

        builder.set_label("outer", tree.path(first), targets).unwrap();
        let err = builder
            .set_label("outer", tree.path(second), targets)
            .unwrap_err();
        assert_eq!(
            err,
            CfgError::LabelConflict(LabelConflict::Name {
                name: "outer".into()
            })
        );
        assert_eq!(builder.get_label_completion("outer"), Some(targets));

        builder.dispose_label(tree.path(first));
        assert_eq!(builder.get_label_completion("outer"), None);
        assert_eq!(builder.get_label(tree.path(first)), Some("outer"));

        builder.set_label("outer", tree.path(second), targets).unwrap();
        assert_eq!(builder.get_label(tree.path(second)), Some("outer"));
        assert_eq!(builder.get_label(tree.path(first)), Some("outer"));
    }

    #[test]
    fn test_label_node_conflict_while_active() {
        let mut tree = NodeTree::new();
        let node = tree.push(None, "LabeledStatement", 0, 10);

        let mut builder = CfgBuilder::new();
        let end = builder.new_block("label_end");
        let targets = JumpTargets::for_statement(end);
        builder.set_label("a", tree.path(node), targets).unwrap();

        let err = builder.set_label("b", tree.path(node), targets).unwrap_err();
        assert_eq!(
            err,
            CfgError::LabelConflict(LabelConflict::Node {
                node,
                existing: "a".into()
            })
        );
        assert_eq!(builder.get_label_completion("b"), None);
    }

    #[test]
    fn test_nested_loops_resolve_innermost_then_outer() {
        let mut tree = NodeTree::new();
        let loop_a = tree.push(None, "ForStatement", 0, 100);
        let loop_b = tree.push(Some(loop_a), "WhileStatement", 10, 90);
        let inner = tree.push(Some(loop_b), "BreakStatement", 20, 26);
        let sibling = tree.push(Some(loop_a), "ContinueStatement", 91, 99);

        let mut builder = CfgBuilder::new();
        let a_end = builder.new_block("for_end");
        let a_update = builder.new_block("for_update");
        let b_end = builder.new_block("while_end");
        let b_cond = builder.new_block("while_cond");
        let a_targets = JumpTargets::for_loop(a_end, a_update);
        let b_targets = JumpTargets::for_loop(b_end, b_cond);

        builder.set_loop(tree.path(loop_a), a_targets);
        builder.set_loop(tree.path(loop_b), b_targets);
        assert_eq!(builder.get_parent_loop_completion(tree.path(inner)), Some(b_targets));

        builder.dispose_path(tree.path(loop_b));
        assert_eq!(builder.get_parent_loop_completion(tree.path(inner)), Some(a_targets));
        assert_eq!(builder.get_parent_loop_completion(tree.path(sibling)), Some(a_targets));

        builder.dispose_loop(tree.path(loop_a));
        assert_eq!(builder.get_parent_loop_completion(tree.path(sibling)), None);
        assert_eq!(
            a_targets.continue_completion(),
            Some(Completion::Continue { join: a_update })
        );
        assert_eq!(a_targets.break_completion(), Completion::Break { join: a_end });
    }

    #[test]
    fn test_statement_labels_have_no_continue_target() {
        let mut builder = CfgBuilder::new();
        let end = builder.new_block("label_end");
        let targets = JumpTargets::for_statement(end);
        assert!(!targets.decorates_loop());
        assert_eq!(targets.continue_completion(), None);
    }

    #[test]
    fn test_handled_clears_unhandled() {
        let mut tree = NodeTree::new();
        let switch = tree.push(None, "SwitchStatement", 0, 10);
        let with = tree.push(None, "WithStatement", 11, 20);

        let mut builder = CfgBuilder::new();
        builder.set_unhandled(tree.path(switch));
        builder.set_unhandled(tree.path(with));
        builder.set_handled(tree.path(switch));
        builder.set_unhandled(tree.path(switch));

        assert_eq!(builder.unhandled().iter().copied().collect::<Vec<_>>(), vec![with]);
    }

    #[test]
    fn test_unreachable_registry() {
        let mut builder = CfgBuilder::new();
        let root = builder.root();
        let dead = builder.new_block("unreachable");
        builder.add_unreachable(root, dead);
        assert_eq!(builder.unreachable().get(&root), Some(&dead));
    }
}
