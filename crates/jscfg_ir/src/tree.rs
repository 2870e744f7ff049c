use crate::ids::NodeId;

/// One visited syntax node: its kind, its byte range in the source and the
/// enclosing visited node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: &'static str,
    pub start: u32,
    pub end: u32,
    pub parent: Option<NodeId>,
}

/// Arena of syntax nodes with upward parent links.
///
/// The tree walk assigns every node it visits a stable [`NodeId`]; all of the
/// builder's node-keyed tables use these ids rather than AST references.
#[derive(Debug, Default, Clone)]
pub struct NodeTree {
    nodes: Vec<SyntaxNode>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        parent: Option<NodeId>,
        kind: &'static str,
        start: u32,
        end: u32,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(SyntaxNode {
            kind,
            start,
            end,
            parent,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn path(&self, id: NodeId) -> NodePath<'_> {
        NodePath { tree: self, node: id }
    }

    /// Every node in visiting order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId::new(index), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A node together with its chain of ancestors.
#[derive(Debug, Clone, Copy)]
pub struct NodePath<'t> {
    tree: &'t NodeTree,
    node: NodeId,
}

impl<'t> NodePath<'t> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn syntax(&self) -> &'t SyntaxNode {
        self.tree.get(self.node)
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent_path(&self) -> Option<NodePath<'t>> {
        self.syntax().parent.map(|parent| self.tree.path(parent))
    }

    /// This path followed by each enclosing path up to the root.
    pub fn ancestors(self) -> impl Iterator<Item = NodePath<'t>> {
        std::iter::successors(Some(self), |path| path.parent_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_walk_to_root() {
        let mut tree = NodeTree::new();
        let program = tree.push(None, "Program", 0, 30);
        let body = tree.push(Some(program), "ForStatement", 0, 30);
        let stmt = tree.push(Some(body), "BreakStatement", 10, 16);

        let chain: Vec<_> = tree.path(stmt).ancestors().map(|p| p.node()).collect();
        assert_eq!(chain, vec![stmt, body, program]);
        assert!(tree.path(program).parent_path().is_none());
        assert_eq!(tree.path(stmt).syntax().kind, "BreakStatement");
    }
}
