use std::collections::{BTreeMap, BTreeSet, HashMap};

use jscfg_ir::{
    BlockId, Cfg, CfgBuilder, Completion, Literal, Location, NodeId, NodeTree, PhiId, Value,
};
use oxc_semantic::{ScopeId, Scoping, SymbolId};
use oxc_span::Span;
use tracing::trace;

use super::Unit;
use super::compile::BuildError;

pub(crate) type LowerResult<T> = Result<T, BuildError>;

/// What an environment entry holds the value of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Slot {
    /// A variable, as resolved by the semantic pass. Shadowing declarations
    /// are distinct symbols.
    Symbol(SymbolId),
    /// The value of a `?:`, `&&`, `||` or `??` expression on its way into the
    /// merge block.
    Value,
}

/// Slot -> the producer currently holding its value.
pub(crate) type Env = BTreeMap<Slot, Location>;

/// One live edge into a block that has not been entered yet.
#[derive(Debug, Clone)]
struct Incoming {
    from: BlockId,
    env: Env,
}

/// A loop header's phis, completed by [`LowerCtx::close_loop`] once every
/// back edge is known.
#[derive(Debug)]
pub(crate) struct LoopHeader {
    block: BlockId,
    phis: Vec<(Slot, PhiId, Location)>,
}

/// Lowering state for one unit (the module body or one function body).
///
/// The builder only knows about blocks and completions; this context adds
/// the SSA environment, the pending incoming edges of blocks not yet
/// entered, and whether the current block is reachable at all.
pub(crate) struct LowerCtx<'s> {
    pub(crate) builder: CfgBuilder,
    pub(crate) tree: &'s mut NodeTree,
    /// Finished function units, shared with nested contexts.
    pub(crate) units: &'s mut Vec<Unit>,
    pub(crate) source: &'s str,
    pub(crate) scoping: &'s Scoping,
    /// Var scope of the function (or program) this unit was built from.
    unit_scope: Option<ScopeId>,
    pub(crate) env: Env,
    /// Innermost visited node; parent of the next node pushed.
    pub(crate) parent: Option<NodeId>,
    /// Labels waiting for the loop they decorate.
    pub(crate) pending_labels: Vec<(String, NodeId)>,
    incoming: HashMap<BlockId, Vec<Incoming>>,
    /// The current block exists and is not sealed yet.
    open: bool,
    /// The current block has at least one live predecessor (or is the root).
    live: bool,
    /// A dead region starting after `last_completed` was already recorded.
    reported_dead: bool,
    last_completed: BlockId,
}

impl<'s> LowerCtx<'s> {
    pub(crate) fn new(
        tree: &'s mut NodeTree,
        units: &'s mut Vec<Unit>,
        source: &'s str,
        scoping: &'s Scoping,
        unit_scope: Option<ScopeId>,
        parent: Option<NodeId>,
    ) -> Self {
        let builder = CfgBuilder::new();
        let root = builder.root();
        Self {
            builder,
            tree,
            units,
            source,
            scoping,
            unit_scope,
            env: Env::new(),
            parent,
            pending_labels: Vec::new(),
            incoming: HashMap::new(),
            open: true,
            live: true,
            reported_dead: false,
            last_completed: root,
        }
    }

    /// Seal whatever is still open into `exit` and hand back the graph.
    pub(crate) fn finish(mut self) -> LowerResult<Cfg> {
        let exit = self.builder.exit();
        self.terminate(Completion::Normal { join: exit })?;
        Ok(self.builder.finish())
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Push a node for the construct at `span`, lower it, then classify and
    /// dispose it.
    pub(crate) fn visit<T>(
        &mut self,
        kind: &'static str,
        span: Span,
        lower: impl FnOnce(&mut Self, NodeId) -> LowerResult<T>,
    ) -> LowerResult<T> {
        let node = self.tree.push(self.parent, kind, span.start, span.end);
        let enclosing = self.parent.replace(node);
        let result = lower(self, node);
        self.parent = enclosing;

        let path = self.tree.path(node);
        if !self.builder.unhandled().contains(&node) {
            self.builder.set_handled(path);
        }
        self.builder.dispose_path(path);
        result
    }

    pub(crate) fn mark_unhandled(&mut self, node: NodeId) {
        self.builder.set_unhandled(self.tree.path(node));
    }

    /// Record `node` as unhandled and stand an opaque step in for its value.
    pub(crate) fn unsupported(&mut self, node: NodeId) -> LowerResult<Location> {
        self.mark_unhandled(node);
        self.step("unsupported", &[])
    }

    /// Source text covered by `span`.
    pub(crate) fn text(&self, span: Span) -> &'s str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Producers
    // -----------------------------------------------------------------------

    pub(crate) fn step(&mut self, name: &str, args: &[Location]) -> LowerResult<Location> {
        self.ensure_open()?;
        let args = args
            .iter()
            .map(|&arg| self.builder.operand(arg))
            .collect::<Result<Vec<Value>, _>>()?;
        Ok(self.builder.push_step(name, args)?)
    }

    pub(crate) fn constant(&mut self, ty: &str, literal: Literal) -> LowerResult<Location> {
        self.ensure_open()?;
        Ok(self.builder.push_constant(ty, literal)?)
    }

    pub(crate) fn string(&mut self, text: &str) -> LowerResult<Location> {
        self.constant("string", Literal::String(text.to_string()))
    }

    pub(crate) fn undefined(&mut self) -> LowerResult<Location> {
        self.constant("undefined", Literal::Undefined)
    }

    /// Current value of the variable `name` resolves to, read at `node`.
    ///
    /// Unresolved names are globals and symbols of an enclosing unit are
    /// captures, as is a function expression's own name. Any other local of
    /// this unit with no value on the current path (a read before its `let`,
    /// or a binding the walker could not lower) is recorded as unhandled.
    pub(crate) fn read(
        &mut self,
        name: &str,
        symbol: Option<SymbolId>,
        node: NodeId,
    ) -> LowerResult<Location> {
        let Some(symbol) = symbol else {
            if name == "undefined" {
                return self.undefined();
            }
            let key = self.string(name)?;
            return self.step("global", &[key]);
        };
        if let Some(&location) = self.env.get(&Slot::Symbol(symbol)) {
            return Ok(location);
        }
        if self.owns(symbol) && !self.scoping.symbol_flags(symbol).is_function() {
            return self.unsupported(node);
        }
        let key = self.string(name)?;
        self.step("capture", &[key])
    }

    /// Whether `symbol` was declared in this unit rather than an enclosing one.
    fn owns(&self, symbol: SymbolId) -> bool {
        let scope = self.scoping.symbol_scope_id(symbol);
        let var_scope = self
            .scoping
            .scope_ancestors(scope)
            .find(|&ancestor| self.scoping.scope_flags(ancestor).is_var());
        var_scope == self.unit_scope
    }

    pub(crate) fn bind(&mut self, slot: Slot, value: Location) {
        self.env.insert(slot, value);
    }

    /// Assign `value` to the variable `name` resolves to. Assignments to
    /// unresolved names become a `set_global` step.
    pub(crate) fn write(
        &mut self,
        name: &str,
        symbol: Option<SymbolId>,
        value: Location,
    ) -> LowerResult<()> {
        match symbol {
            Some(symbol) => self.bind(Slot::Symbol(symbol), value),
            None => {
                let key = self.string(name)?;
                self.step("set_global", &[key, value])?;
            }
        }
        Ok(())
    }

    /// Remove and return the value carried through [`Slot::Value`].
    pub(crate) fn take_value(&mut self) -> LowerResult<Location> {
        match self.env.remove(&Slot::Value) {
            Some(location) => Ok(location),
            None => self.undefined(),
        }
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    /// Make sure there is an unsealed block to append to. Code following an
    /// unconditional jump lands in a fresh, unreachable block.
    pub(crate) fn ensure_open(&mut self) -> LowerResult<()> {
        if !self.open {
            let block = self.builder.new_block("unreachable");
            self.enter(block)?;
        }
        Ok(())
    }

    /// Seal the current block, if any. Live blocks feed their environment to
    /// each successor; dead blocks only get a `Marker` so the graph stays
    /// closed.
    pub(crate) fn terminate(&mut self, completion: Completion) -> LowerResult<()> {
        if !self.open {
            return Ok(());
        }
        let block = self.builder.current_block();
        if self.live {
            self.builder.seal(block, completion)?;
            for target in completion.successors() {
                self.record_incoming(block, target);
            }
        } else {
            let completion = match completion {
                Completion::Normal { join }
                | Completion::Break { join }
                | Completion::Continue { join } => Completion::Marker { next: join },
                other => other,
            };
            self.builder.seal(block, completion)?;
        }
        self.open = false;
        self.last_completed = block;
        Ok(())
    }

    /// Two-way exit on `test`. A step is added when `test` is not already
    /// the last producer of the current block.
    pub(crate) fn branch_on(
        &mut self,
        test: Location,
        consequent: BlockId,
        alternate: BlockId,
    ) -> LowerResult<()> {
        self.ensure_open()?;
        let test = if self.builder.is_last_in_current(test) {
            test
        } else {
            self.step("test", &[test])?
        };
        let block = self.builder.current_block();
        self.builder.branch(test, consequent, alternate)?;
        if self.live {
            self.record_incoming(block, consequent);
            self.record_incoming(block, alternate);
        }
        self.open = false;
        self.last_completed = block;
        Ok(())
    }

    fn record_incoming(&mut self, from: BlockId, to: BlockId) {
        if to == self.builder.exit() {
            return;
        }
        trace!(%from, %to, "incoming edge");
        self.incoming.entry(to).or_default().push(Incoming {
            from,
            env: self.env.clone(),
        });
    }

    /// Start appending to `block`, falling through from an open block. The
    /// environment becomes the merge of every live incoming edge.
    pub(crate) fn enter(&mut self, block: BlockId) -> LowerResult<()> {
        let entries = self.switch_into(block)?;
        if !entries.is_empty() {
            self.env = self.merge(block, &entries, &BTreeSet::new())?;
        }
        Ok(())
    }

    /// Enter a loop header. Symbols in `assigned` that are live on entry get
    /// a phi whose back-edge arguments are added by [`Self::close_loop`].
    pub(crate) fn enter_loop_header(
        &mut self,
        block: BlockId,
        assigned: &BTreeSet<SymbolId>,
    ) -> LowerResult<LoopHeader> {
        let entries = self.switch_into(block)?;
        let mut header = LoopHeader {
            block,
            phis: Vec::new(),
        };
        let Some(first) = entries.first() else {
            return Ok(header);
        };

        let carried: BTreeSet<Slot> = first
            .env
            .keys()
            .filter(|slot| matches!(slot, Slot::Symbol(symbol) if assigned.contains(symbol)))
            .filter(|slot| entries.iter().all(|entry| entry.env.contains_key(*slot)))
            .copied()
            .collect();
        let mut env = self.merge(block, &entries, &carried)?;
        for &slot in &carried {
            let args: Vec<Location> = entries
                .iter()
                .filter_map(|entry| entry.env.get(&slot).copied())
                .collect();
            let location = self.builder.push_phi(block, args)?;
            if let Value::Phi(phi) = self.builder.operand(location)? {
                header.phis.push((slot, phi, location));
            }
            env.insert(slot, location);
        }
        self.env = env;
        Ok(header)
    }

    /// Feed every back edge recorded for the header into its phis.
    pub(crate) fn close_loop(&mut self, header: LoopHeader) -> LowerResult<()> {
        let back_edges = self.incoming.remove(&header.block).unwrap_or_default();
        for edge in &back_edges {
            trace!(from = %edge.from, header = %header.block, "back edge");
            for (slot, phi, location) in &header.phis {
                let arg = edge.env.get(slot).copied().unwrap_or(*location);
                self.builder.add_phi_arg(*phi, arg)?;
            }
        }
        Ok(())
    }

    fn switch_into(&mut self, block: BlockId) -> LowerResult<Vec<Incoming>> {
        if self.open {
            self.terminate(Completion::Normal { join: block })?;
        }
        self.builder.switch_to(block);
        self.open = true;

        let entries = self.incoming.remove(&block).unwrap_or_default();
        if entries.is_empty() {
            self.live = false;
            if !self.reported_dead {
                self.builder.add_unreachable(self.last_completed, block);
                self.reported_dead = true;
            }
        } else {
            self.live = true;
            self.reported_dead = false;
        }
        Ok(entries)
    }

    /// Slots bound on every incoming edge survive; a phi is placed for each
    /// one whose value differs between edges. Slots in `skip` are left to
    /// the caller.
    ///
    /// A slot missing on some edge is a block-scoped binding whose block has
    /// ended; hoisting binds every `var` and function up front.
    fn merge(
        &mut self,
        block: BlockId,
        entries: &[Incoming],
        skip: &BTreeSet<Slot>,
    ) -> LowerResult<Env> {
        let Some((first, rest)) = entries.split_first() else {
            return Ok(Env::new());
        };
        if rest.is_empty() {
            return Ok(first.env.clone());
        }

        let mut env = Env::new();
        'slots: for (slot, &location) in &first.env {
            if skip.contains(slot) {
                continue;
            }
            let mut args = vec![location];
            for entry in rest {
                match entry.env.get(slot) {
                    Some(&other) => args.push(other),
                    None => continue 'slots,
                }
            }
            let merged = if args.iter().all(|&arg| arg == location) {
                location
            } else {
                self.builder.push_phi(block, args)?
            };
            env.insert(*slot, merged);
        }
        Ok(env)
    }
}
