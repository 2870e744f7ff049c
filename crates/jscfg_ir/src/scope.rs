use std::collections::HashMap;

use tracing::debug;

use crate::block::Completion;
use crate::error::{LabelConflict, Result};
use crate::ids::{BlockId, NodeId};
use crate::tree::NodePath;

/// The completion pair a label or loop offers to `break` and `continue`.
///
/// `continue_to` is only present when the binding decorates a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTargets {
    pub break_to: BlockId,
    pub continue_to: Option<BlockId>,
}

impl JumpTargets {
    pub fn for_loop(break_to: BlockId, continue_to: BlockId) -> Self {
        Self {
            break_to,
            continue_to: Some(continue_to),
        }
    }

    /// Targets of a labeled non-loop statement: only `break` resolves.
    pub fn for_statement(break_to: BlockId) -> Self {
        Self {
            break_to,
            continue_to: None,
        }
    }

    pub fn break_completion(&self) -> Completion {
        Completion::Break {
            join: self.break_to,
        }
    }

    pub fn continue_completion(&self) -> Option<Completion> {
        self.continue_to.map(|join| Completion::Continue { join })
    }

    pub fn decorates_loop(&self) -> bool {
        self.continue_to.is_some()
    }
}

// ---------------------------------------------------------------------------
// Scope registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct LabelBinding {
    node: NodeId,
    targets: JumpTargets,
}

/// Label and loop bindings for one walk.
///
/// Labels resolve by name through a flat map; loops resolve by walking a path's
/// ancestors until a bound node is found. The node -> name record of a label
/// outlives its scope so the original label text stays recoverable.
#[derive(Debug, Default)]
pub(crate) struct ScopeRegistry {
    node_labels: HashMap<NodeId, String>,
    label_bindings: HashMap<String, LabelBinding>,
    loop_bindings: HashMap<NodeId, JumpTargets>,
}

impl ScopeRegistry {
    pub(crate) fn set_label(
        &mut self,
        name: &str,
        node: NodeId,
        targets: JumpTargets,
    ) -> Result<()> {
        if self.label_bindings.contains_key(name) {
            return Err(LabelConflict::Name {
                name: name.to_string(),
            }
            .into());
        }
        // A retained record only conflicts while its binding is still active.
        if let Some(existing) = self.node_labels.get(&node) {
            let active = self
                .label_bindings
                .get(existing)
                .is_some_and(|binding| binding.node == node);
            if active {
                return Err(LabelConflict::Node {
                    node,
                    existing: existing.clone(),
                }
                .into());
            }
        }

        debug!(label = name, %node, break_to = %targets.break_to, "bind label");
        self.label_bindings
            .insert(name.to_string(), LabelBinding { node, targets });
        self.node_labels.insert(node, name.to_string());
        Ok(())
    }

    pub(crate) fn get_label(&self, node: NodeId) -> Option<&str> {
        self.node_labels.get(&node).map(String::as_str)
    }

    pub(crate) fn get_label_completion(&self, name: &str) -> Option<JumpTargets> {
        self.label_bindings.get(name).map(|binding| binding.targets)
    }

    pub(crate) fn dispose_label(&mut self, node: NodeId) {
        let Some(name) = self.node_labels.get(&node) else {
            return;
        };
        if self
            .label_bindings
            .get(name)
            .is_some_and(|binding| binding.node == node)
        {
            debug!(label = name.as_str(), %node, "release label");
            self.label_bindings.remove(name);
        }
    }

    pub(crate) fn set_loop(&mut self, node: NodeId, targets: JumpTargets) {
        debug!(%node, break_to = %targets.break_to, "bind loop");
        self.loop_bindings.insert(node, targets);
    }

    pub(crate) fn get_parent_loop_completion(&self, path: NodePath<'_>) -> Option<JumpTargets> {
        path.ancestors()
            .find_map(|ancestor| self.loop_bindings.get(&ancestor.node()).copied())
    }

    pub(crate) fn dispose_loop(&mut self, node: NodeId) {
        if self.loop_bindings.remove(&node).is_some() {
            debug!(%node, "release loop");
        }
    }

    pub(crate) fn labels(&self) -> &HashMap<NodeId, String> {
        &self.node_labels
    }
}
